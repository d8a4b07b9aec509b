//
// kernel_spec.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The metadata key under which the engine stamps the interpreter
/// descriptor. Its presence is also the marker that a spec file was
/// registered by the engine rather than authored by a user.
pub const METADATA_INTERPRETER_KEY: &str = "interpreter";

/// The metadata key recording the user-authored spec a registered spec was
/// copied from. Written by the registration flow, preserved verbatim here.
pub const METADATA_ORIGINAL_SPEC_FILE_KEY: &str = "originalSpecFile";

/// The file name of a kernel specification inside its kernel directory, per
/// the Jupyter kernel spec layout (`<root>/<kernel-name>/kernel.json`).
pub const SPEC_FILE_NAME: &str = "kernel.json";

/// From the Jupyter documentation for [Kernel Specs](https://jupyter-client.readthedocs.io/en/stable/kernels.html#kernel-specs);
/// directly parsed from JSON.
///
/// User-authored spec files may carry fields this engine knows nothing
/// about; those are collected in `extra` so a rewrite never drops them.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KernelSpecModel {
    /// List of command line arguments to be used to start the kernel
    pub argv: Vec<String>,

    /// The kernel name as it should be displayed in the UI
    pub display_name: String,

    /// The kernel's language; absent in some user-authored files, and a
    /// rewrite must not manufacture the key
    pub language: Option<String>,

    /// Environment variables to set for the kernel. Values are arbitrary
    /// JSON in user-authored files; the mutator scrubs them to strings
    /// before anything downstream launches the kernel.
    pub env: Option<Map<String, Value>>,

    /// Open metadata map; the engine only ever writes the `interpreter` key
    pub metadata: Option<Map<String, Value>>,

    /// Resource hints (icons etc.); opaque to the engine
    pub resources: Option<Map<String, Value>>,

    /// How the kernel is interrupted; opaque to the engine
    pub interrupt_mode: Option<String>,

    /// Any other user-authored top-level fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One discoverable kernel: a parsed specification plus where it came from.
///
/// Immutable after load; updates are produced by re-parsing the file after
/// the mutator rewrites it (the mutator refreshes `metadata`/`env`/`argv`
/// in place on the record it was handed, but never mutates stored copies).
#[derive(Debug, Clone, PartialEq)]
pub struct KernelSpecification {
    /// The kernel name (the directory the spec file lives in)
    pub name: String,

    /// The kernel name as it should be displayed in the UI
    pub display_name: String,

    /// The kernel's language; empty when the spec doesn't declare one
    pub language: String,

    /// Ordered command + arguments used to launch the kernel
    pub argv: Vec<String>,

    /// The primary executable or launcher path (`argv[0]`); possibly just a
    /// bare name like `python`
    pub path: String,

    /// The interpreter this spec was registered for, if recorded
    pub interpreter_path: Option<PathBuf>,

    /// Environment variables from the spec file
    pub env: Option<Map<String, Value>>,

    /// Open metadata map from the spec file
    pub metadata: Option<Map<String, Value>>,

    /// Absolute location of the spec file on disk; `None` for specs
    /// synthesized in memory
    pub spec_file: Option<PathBuf>,
}

impl KernelSpecification {
    /// Build a specification record from a parsed spec model.
    pub fn from_model(name: String, model: &KernelSpecModel, spec_file: Option<PathBuf>) -> Self {
        let path = model.argv.first().cloned().unwrap_or_default();
        let interpreter_path = Self::interpreter_path_from(model);
        Self {
            name,
            display_name: model.display_name.clone(),
            language: model.language.clone().unwrap_or_default(),
            argv: model.argv.clone(),
            path,
            interpreter_path,
            env: model.env.clone(),
            metadata: model.metadata.clone(),
            spec_file,
        }
    }

    /// The path recorded under `metadata.interpreter.path`, even when the
    /// rest of the descriptor is partial or malformed.
    pub fn metadata_interpreter_path(&self) -> Option<PathBuf> {
        let value = self.metadata.as_ref()?.get(METADATA_INTERPRETER_KEY)?;
        let path = value.get("path")?.as_str()?;
        Some(PathBuf::from(path))
    }

    /// Whether this spec was registered by the engine itself. Only the
    /// engine writes `metadata.interpreter`, so its presence is the marker.
    pub fn is_registered_by_engine(&self) -> bool {
        self.metadata
            .as_ref()
            .map(|m| m.contains_key(METADATA_INTERPRETER_KEY))
            .unwrap_or(false)
    }

    fn interpreter_path_from(model: &KernelSpecModel) -> Option<PathBuf> {
        let metadata = model.metadata.as_ref()?;
        let interpreter = metadata.get(METADATA_INTERPRETER_KEY)?;
        let path = interpreter.get("path")?.as_str()?;
        Some(PathBuf::from(path))
    }
}

/// What a caller extracted from a notebook file's own metadata; consulted
/// before any spec search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookMetadata {
    /// The kernel spec name recorded in the notebook
    pub kernel_spec_name: Option<String>,

    /// The kernel spec display name recorded in the notebook
    pub kernel_spec_display_name: Option<String>,

    /// The notebook's language, if recorded
    pub language: Option<String>,

    /// A one-way fingerprint of the interpreter the notebook last ran with
    pub interpreter_hash: Option<String>,
}

impl NotebookMetadata {
    /// Whether the notebook carries no kernel spec information at all.
    pub fn has_kernel_spec(&self) -> bool {
        self.kernel_spec_name.is_some() || self.kernel_spec_display_name.is_some()
    }
}
