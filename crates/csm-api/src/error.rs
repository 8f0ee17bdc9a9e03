//! Error type shared by the gateway clients.

use crate::auth::AuthError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Token acquisition failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The request never produced a response.
    #[error("ERROR exception: {source} when trying to {op}")]
    Request {
        op: String,
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with something other than 200 OK.
    #[error("ERROR Failed to {op}: HTTP {status}")]
    Status { op: String, status: StatusCode },
    /// The body was not the JSON shape we expected.
    #[error("ERROR could not decode the response when trying to {op}: {source}")]
    Decode {
        op: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("ERROR {field} was not in the response from {service}. These fields are expected in the json response.")]
    MissingField {
        service: &'static str,
        field: String,
    },
    #[error("ERROR {0}")]
    NotFound(String),
    #[error("ERROR {0} is not a valid role_subrole. Valid options are Management_Master, Management_Worker, or Management_Storage")]
    InvalidRoleSubrole(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
