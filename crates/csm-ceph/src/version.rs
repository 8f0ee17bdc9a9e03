//! Ceph release versions as given on the command line and as reported by the cluster.

use crate::error::{CephError, Result};
use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

fn strict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^v?([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("valid regex"))
}

fn leading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^v?([0-9]+)\.([0-9]+)\.([0-9]+)").expect("valid regex"))
}

/// A Ceph release. `text` is what daemons report (no leading `v`); ordering is semantic.
#[derive(Debug, Clone)]
pub struct CephVersion {
    text: String,
    semver: Version,
}

impl CephVersion {
    /// Components are bounded by `u64`; wider ones are well-formed but unsupported.
    fn from_captures(text: String, caps: regex::Captures<'_>) -> Result<Self> {
        let num = |i: usize| {
            let digits = caps.get(i).map_or("", |m| m.as_str());
            digits
                .parse::<u64>()
                .map_err(|_| CephError::VersionOutOfRange(text.clone()))
        };
        let semver = Version::new(num(1)?, num(2)?, num(3)?);
        Ok(Self { text, semver })
    }

    /// Accepts exactly `X.Y.Z` or `vX.Y.Z` with integer components; strips the `v`.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || CephError::InvalidVersion(input.to_string());
        let caps = strict_pattern().captures(input).ok_or_else(invalid)?;
        let text = input.strip_prefix('v').unwrap_or(input).to_string();
        Self::from_captures(text, caps)
    }

    /// Parses a version reported by the cluster, which may carry a build suffix
    /// (`17.2.6-1.el8`). Only the leading `X.Y.Z` takes part in ordering.
    pub fn parse_reported(input: &str) -> Result<Self> {
        let invalid = || CephError::InvalidVersion(input.to_string());
        let caps = leading_pattern().captures(input).ok_or_else(invalid)?;
        let text = input.strip_prefix('v').unwrap_or(input).to_string();
        Self::from_captures(text, caps)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn semver(&self) -> &Version {
        &self.semver
    }
}

impl fmt::Display for CephVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for CephVersion {
    fn eq(&self, other: &Self) -> bool {
        self.semver == other.semver
    }
}

impl Eq for CephVersion {}

impl PartialOrd for CephVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CephVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.semver.cmp(&other.semver)
    }
}
