//! Integration tests for the CSM admin crates.
//!
//! The gateway, token endpoint and radosgw S3 endpoint are served by
//! `wiremock`; `radosgw-admin`, `podman` and `ceph` are replaced by a
//! [`harness::ScriptedRunner`].

pub mod harness;

#[cfg(test)]
mod api_integration;
#[cfg(test)]
mod ceph_integration;
#[cfg(test)]
mod s3_integration;

pub use harness::{Gateway, Reply, ScriptedRunner, StaticSecrets};
