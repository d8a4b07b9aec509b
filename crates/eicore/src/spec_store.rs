//
// spec_store.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Enumerates and parses kernel specification files.
//!
//! Pure read-side IO: no matching logic lives here. Enumeration follows
//! the Jupyter layout, one directory level under each search root
//! (`<root>/<kernel-name>/kernel.json`). A single malformed file never
//! aborts a batch; it is logged and skipped.

use std::path::{Path, PathBuf};

use eishared::kernel_spec::{KernelSpecModel, KernelSpecification, SPEC_FILE_NAME};
use futures::future::join_all;

use crate::error::DiscoveryError;

/// List the kernel spec files under each search root.
///
/// Roots that don't exist or can't be read are skipped silently; that's
/// the common case (most platforms have several well-known roots and only
/// a few are populated).
pub async fn list_spec_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(err) => {
                log::trace!("Skipping kernel root {}: {}", root.display(), err);
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let spec_file = entry.path().join(SPEC_FILE_NAME);
            match tokio::fs::try_exists(&spec_file).await {
                Ok(true) => files.push(spec_file),
                Ok(false) => {}
                Err(err) => {
                    log::trace!("Skipping {}: {}", spec_file.display(), err);
                }
            }
        }
    }
    files
}

/// Parse a single kernel spec file.
///
/// The kernel's name is the name of the directory the file lives in. A
/// spec without a launch command or display name is rejected; anything
/// else the file carries is preserved on the record.
pub async fn parse_spec(file: &Path) -> Result<KernelSpecification, DiscoveryError> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|err| DiscoveryError::ParseError(file.to_path_buf(), err.to_string()))?;

    let model: KernelSpecModel = serde_json::from_str(&contents)
        .map_err(|err| DiscoveryError::ParseError(file.to_path_buf(), err.to_string()))?;

    if model.argv.is_empty() {
        return Err(DiscoveryError::ParseError(
            file.to_path_buf(),
            "spec has an empty argv".to_string(),
        ));
    }
    if model.display_name.is_empty() {
        return Err(DiscoveryError::ParseError(
            file.to_path_buf(),
            "spec has an empty display_name".to_string(),
        ));
    }

    let name = kernel_name_for(file);
    Ok(KernelSpecification::from_model(
        name,
        &model,
        Some(file.to_path_buf()),
    ))
}

/// Enumerate and parse every spec under the given roots, isolating
/// per-file failures. Parses run concurrently; results keep enumeration
/// order.
pub async fn list_specs(roots: &[PathBuf]) -> Vec<KernelSpecification> {
    let files = list_spec_files(roots).await;
    let parses = join_all(files.iter().map(|file| parse_spec(file))).await;
    parses
        .into_iter()
        .filter_map(|result| match result {
            Ok(spec) => Some(spec),
            Err(err) => {
                err.log();
                None
            }
        })
        .collect()
}

/// Derive the kernel name from a spec file path (its directory name).
fn kernel_name_for(file: &Path) -> String {
    file.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
