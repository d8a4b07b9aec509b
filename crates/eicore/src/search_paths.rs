//
// search_paths.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

// This file computes the directories searched for kernel specifications:
// the per-interpreter root derived from sys.prefix, and the per-platform
// global roots, with JUPYTER_PATH entries taking precedence over both.

use std::path::PathBuf;

use eishared::interpreter::Interpreter;

/// The fixed suffix appended to an interpreter's sys.prefix to find the
/// kernels registered inside that environment.
const INTERPRETER_KERNELS_SUFFIX: &str = "share/jupyter/kernels";

/// The kernel specification search root inside an interpreter's
/// environment.
pub fn interpreter_kernel_root(interpreter: &Interpreter) -> PathBuf {
    interpreter.sys_prefix.join(INTERPRETER_KERNELS_SUFFIX)
}

/// All global kernel specification search roots, in precedence order:
/// `JUPYTER_PATH` entries first, then the per-user root, then the
/// system-wide roots for the platform.
pub fn global_kernel_roots() -> Vec<PathBuf> {
    let mut roots = jupyter_path_roots();
    if let Some(user) = user_kernel_root() {
        roots.push(user);
    }
    roots.extend(system_kernel_roots());
    roots
}

/// Kernel roots contributed by the JUPYTER_PATH environment variable. Each
/// entry is a Jupyter data directory; kernels live under its `kernels`
/// subdirectory.
fn jupyter_path_roots() -> Vec<PathBuf> {
    match std::env::var("JUPYTER_PATH") {
        Ok(value) => std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.join("kernels"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// The per-user kernel root.
///
/// On Linux this follows the XDG data directory convention.
#[cfg(target_os = "linux")]
fn user_kernel_root() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("jupyter").join("kernels"))
}

/// The per-user kernel root (`~/Library/Jupyter/kernels` on macOS).
#[cfg(target_os = "macos")]
fn user_kernel_root() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join("Library").join("Jupyter").join("kernels"))
}

/// The per-user kernel root (`%APPDATA%\jupyter\kernels` on Windows).
#[cfg(target_os = "windows")]
fn user_kernel_root() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("jupyter").join("kernels"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn user_kernel_root() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("jupyter").join("kernels"))
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn system_kernel_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/share/jupyter/kernels"),
        PathBuf::from("/usr/share/jupyter/kernels"),
    ]
}

#[cfg(target_os = "windows")]
fn system_kernel_roots() -> Vec<PathBuf> {
    match std::env::var("PROGRAMDATA") {
        Ok(value) => vec![PathBuf::from(value).join("jupyter").join("kernels")],
        Err(_) => Vec::new(),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn system_kernel_roots() -> Vec<PathBuf> {
    Vec::new()
}

/// Deduplicate a list of search roots, preserving first-seen order.
pub fn dedup_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if !seen.contains(&root) {
            seen.push(root);
        }
    }
    seen
}
