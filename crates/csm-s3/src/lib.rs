//! Object-storage helpers for the Ceph radosgw behind the cluster.
//!
//! Credentials are never configured by hand: the owner of an object is looked
//! up with `radosgw-admin`, that user's keys are read the same way, and the
//! object is then fetched over the S3 API.

pub mod error;
pub mod images;
pub mod object;
pub mod radosgw;

pub use error::{Result, S3Error};
pub use images::{get_s3_image_info, Artifact, ImageManifest, IMAGE_TYPES};
pub use object::S3Object;
pub use radosgw::{Radosgw, S3Credentials};
