use serde::{Deserialize, Serialize};
use std::fmt;

/// The kernel / initrd / rootfs path triple a node boots from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootImages {
    pub kernel: String,
    pub initrd: String,
    pub rootfs: String,
}

impl fmt::Display for BootImages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{initrd: {}, kernel: {}, rootfs: {}}}",
            self.initrd, self.kernel, self.rootfs
        )
    }
}
