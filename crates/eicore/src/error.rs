//
// error.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use std::fmt;
use std::path::PathBuf;

use log::warn;

/// Errors raised by the discovery engine.
///
/// Most of these are recovered close to where they occur (a malformed spec
/// file is skipped, a failed interpreter lookup degrades to "no
/// interpreter"); only `WriteFailure` routinely reaches callers.
#[derive(Debug)]
pub enum DiscoveryError {
    /// A kernel spec file could not be parsed
    ParseError(PathBuf, String),

    /// An interpreter detail lookup failed
    LookupFailure(String),

    /// Fetching activated environment variables failed
    ActivationFailure(String),

    /// A kernel spec file could not be written back
    WriteFailure(PathBuf, String),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiscoveryError::ParseError(path, detail) => {
                write!(f, "Failed to parse kernel spec {}: {}", path.display(), detail)
            }
            DiscoveryError::LookupFailure(detail) => {
                write!(f, "Interpreter lookup failed: {}", detail)
            }
            DiscoveryError::ActivationFailure(detail) => {
                write!(f, "Environment activation failed: {}", detail)
            }
            DiscoveryError::WriteFailure(path, detail) => {
                write!(f, "Failed to write kernel spec {}: {}", path.display(), detail)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl DiscoveryError {
    /// Log this error at warning level. Used at the sites where an error is
    /// recovered rather than propagated.
    pub fn log(&self) {
        warn!("{}", self);
    }
}
