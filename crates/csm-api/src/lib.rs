//! REST clients for the CSM API gateway.
//!
//! [`auth::Auth`] exchanges the admin client credentials stored in Kubernetes
//! for a bearer token, [`session::ApiSession`] binds that token to the gateway,
//! and the per-service clients borrow the session.

pub mod auth;
pub mod bss;
pub mod error;
pub mod hsm;
pub mod session;
pub mod sls;

pub use auth::{Auth, AuthError, ClientCredentials, KubeSecretStore, SecretStore};
pub use bss::{BootParams, BssClient, ImageUpdate};
pub use error::{ApiError, Result};
pub use hsm::{Component, HsmClient, RoleSubrole};
pub use session::ApiSession;
pub use sls::{SlsClient, SlsHardware};
