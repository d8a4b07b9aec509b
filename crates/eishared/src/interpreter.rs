//
// interpreter.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The version of an installed interpreter.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// An installed language runtime, as reported by the interpreter provider.
///
/// The `path` is the interpreter's identity on a given machine; two
/// descriptors with the same path refer to the same interpreter even if
/// the other fields differ (e.g. one was enumerated before an upgrade).
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Absolute path to the interpreter binary; the unique identity key
    pub path: PathBuf,

    /// The interpreter's display name, e.g. "Python 3.11.4 ('.venv')"
    pub display_name: String,

    /// The interpreter version, if known
    pub version: Option<InterpreterVersion>,

    /// The environment root (sys.prefix); used to derive the
    /// per-interpreter kernel specification search path
    pub sys_prefix: PathBuf,
}

impl Interpreter {
    /// Compute the one-way fingerprint of this interpreter's path.
    ///
    /// Notebooks store this fingerprint (rather than the raw path) so that
    /// a notebook can be re-associated with the same interpreter later
    /// without leaking the path into a shareable file.
    pub fn fingerprint(&self) -> String {
        fingerprint_path(&self.path)
    }
}

/// Fingerprint an arbitrary interpreter path: lowercase hex SHA-256 of the
/// path string.
pub fn fingerprint_path(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two filesystem paths for identity.
///
/// Windows paths are compared case-insensitively; everywhere else the
/// comparison is exact.
#[cfg(target_os = "windows")]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Compare two filesystem paths for identity.
#[cfg(not(target_os = "windows"))]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    a == b
}
