//
// mod.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//

//! Shared fixtures for the engine's integration tests.

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod mocks;

use std::path::{Path, PathBuf};

use eishared::interpreter::{Interpreter, InterpreterVersion};

/// Build an interpreter descriptor rooted at the given path.
pub fn make_interpreter(path: &str, display_name: &str, major: u32, minor: u32) -> Interpreter {
    let path = PathBuf::from(path);
    let sys_prefix = path
        .parent()
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/"));
    Interpreter {
        path,
        display_name: display_name.to_string(),
        version: Some(InterpreterVersion {
            major,
            minor,
            patch: 0,
        }),
        sys_prefix,
    }
}

/// Write a kernel spec fixture under `root/<name>/kernel.json` and return
/// the spec file path.
pub fn write_spec_fixture(root: &Path, name: &str, contents: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).expect("Failed to create kernel directory");
    let file = dir.join("kernel.json");
    std::fs::write(&file, contents).expect("Failed to write kernel spec fixture");
    file
}
