//
// spec_mutator.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Reconciles a kernel specification file with its resolved interpreter.
//!
//! The write path is effectively a compare-and-swap on file content: read
//! the current file, apply the changes, write only if the serialized form
//! differs. No external locking is assumed, so two concurrent reconciles
//! of the same file are last-writer-wins; that race is accepted and
//! documented rather than hidden.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use eishared::interpreter::Interpreter;
use eishared::kernel_spec::{KernelSpecModel, KernelSpecification, METADATA_INTERPRETER_KEY};
use serde_json::{Map, Value};

use crate::error::DiscoveryError;
use crate::providers::ActivationEnvProvider;

/// The `argv[0]` marker for specs launched through a `conda run` wrapper;
/// those are left untouched since the wrapper resolves the interpreter
/// itself.
pub const CONDA_RUN_MARKER: &str = "conda";

/// Debugger diagnostics suppression variable. Activation caches can go
/// stale on this one, so the host process's own value always wins.
pub const PYDEVD_DISABLE_FILE_VALIDATION: &str = "PYDEVD_DISABLE_FILE_VALIDATION";

/// What a reconcile did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Whether the spec file on disk was actually rewritten
    pub wrote_file: bool,
}

/// Rewrites kernel specification files to embed interpreter metadata and
/// activated environment variables.
pub struct SpecMutator {
    activation: Arc<dyn ActivationEnvProvider>,
}

impl SpecMutator {
    pub fn new(activation: Arc<dyn ActivationEnvProvider>) -> Self {
        Self { activation }
    }

    /// Sync a spec file on disk with its resolved interpreter.
    ///
    /// Only specs with a known `spec_file` are eligible, and unless
    /// `force_write` is set, only specs that already carry
    /// `metadata.interpreter` are touched -- a spec the engine did not
    /// create is never silently rewritten.
    ///
    /// The in-memory record is always refreshed with the merged state,
    /// whether or not a disk write happened, so the caller observes the
    /// result immediately.
    pub async fn reconcile(
        &self,
        spec: &mut KernelSpecification,
        interpreter: Option<&Interpreter>,
        resource: Option<&Path>,
        force_write: bool,
    ) -> Result<ReconcileOutcome, DiscoveryError> {
        let spec_file = match &spec.spec_file {
            Some(file) => file.clone(),
            None => {
                log::trace!(
                    "Kernel spec '{}' has no backing file; nothing to reconcile",
                    spec.name
                );
                return Ok(ReconcileOutcome { wrote_file: false });
            }
        };

        if !force_write && !spec.is_registered_by_engine() {
            log::trace!(
                "Kernel spec '{}' was not registered by this engine; leaving it alone",
                spec.name
            );
            return Ok(ReconcileOutcome { wrote_file: false });
        }

        // (1) Re-read the current file rather than trusting the in-memory
        // copy; an external edit since enumeration must not be clobbered.
        let contents = tokio::fs::read_to_string(&spec_file)
            .await
            .map_err(|err| DiscoveryError::ParseError(spec_file.clone(), err.to_string()))?;
        let original: KernelSpecModel = serde_json::from_str(&contents)
            .map_err(|err| DiscoveryError::ParseError(spec_file.clone(), err.to_string()))?;
        let mut model = original.clone();

        if let Some(interpreter) = interpreter {
            // (2) Point argv[0] at the interpreter, unless the spec runs
            // through a conda wrapper that resolves it on its own.
            if let Some(first) = model.argv.first_mut() {
                if first != CONDA_RUN_MARKER {
                    *first = interpreter.path.to_string_lossy().to_string();
                }
            }

            // (3) Fold in the activated environment. Best effort: a failed
            // activation yields an empty map, never an abort.
            let activation_env = self.activation_env_for(resource, interpreter).await;
            let env = model.env.get_or_insert_with(Map::new);
            for (key, value) in activation_env {
                env.insert(key, Value::String(value));
            }

            // (5) Stamp the full interpreter descriptor into the metadata.
            match serde_json::to_value(interpreter) {
                Ok(descriptor) => {
                    model
                        .metadata
                        .get_or_insert_with(Map::new)
                        .insert(METADATA_INTERPRETER_KEY.to_string(), descriptor);
                }
                Err(err) => {
                    log::error!("Failed to serialize interpreter descriptor: {}", err);
                }
            }
        }

        // (4) The host's own diagnostics-suppression value always wins over
        // whatever activation reported; a stale value with no host
        // counterpart is dropped.
        let env = model.env.get_or_insert_with(Map::new);
        match std::env::var(PYDEVD_DISABLE_FILE_VALIDATION) {
            Ok(value) => {
                env.insert(
                    PYDEVD_DISABLE_FILE_VALIDATION.to_string(),
                    Value::String(value),
                );
            }
            Err(_) => {
                env.remove(PYDEVD_DISABLE_FILE_VALIDATION);
            }
        }

        // (6) Downstream launchers require a string-only environment.
        scrub_env(env);
        if model.env.as_ref().map(|e| e.is_empty()).unwrap_or(false) && original.env.is_none() {
            // Don't manufacture an empty env block in a file that had none
            model.env = None;
        }

        // (7) Write only if something actually changed.
        let wrote_file = model != original;
        let write_result = if wrote_file {
            self.write_model(&spec_file, &model).await
        } else {
            log::trace!(
                "Kernel spec {} is already up to date; skipping write",
                spec_file.display()
            );
            Ok(())
        };

        // (8) Refresh the in-memory record regardless, so the caller sees
        // the merged state even when the write was skipped or failed; a
        // caller that tolerates the unpersisted state can proceed with it.
        spec.argv = model.argv.clone();
        spec.path = model.argv.first().cloned().unwrap_or_default();
        spec.env = model.env.clone();
        spec.metadata = model.metadata.clone();
        spec.interpreter_path = spec.metadata_interpreter_path();

        write_result?;
        Ok(ReconcileOutcome { wrote_file })
    }

    async fn write_model(
        &self,
        spec_file: &Path,
        model: &KernelSpecModel,
    ) -> Result<(), DiscoveryError> {
        let serialized = serde_json::to_string_pretty(model).map_err(|err| {
            DiscoveryError::WriteFailure(spec_file.to_path_buf(), err.to_string())
        })?;
        tokio::fs::write(spec_file, serialized)
            .await
            .map_err(|err| DiscoveryError::WriteFailure(spec_file.to_path_buf(), err.to_string()))?;
        log::debug!("Updated kernel spec {}", spec_file.display());
        Ok(())
    }

    async fn activation_env_for(
        &self,
        resource: Option<&Path>,
        interpreter: &Interpreter,
    ) -> HashMap<String, String> {
        match self
            .activation
            .activated_env(resource, interpreter, false)
            .await
        {
            Ok(env) => env,
            Err(err) => {
                DiscoveryError::ActivationFailure(err.to_string()).log();
                HashMap::new()
            }
        }
    }
}

/// Force every environment value to a plain string. Numbers and booleans
/// are stringified; anything else is dropped.
fn scrub_env(env: &mut Map<String, Value>) {
    let keys: Vec<String> = env.keys().cloned().collect();
    for key in keys {
        let scrubbed = match env.get(&key) {
            Some(Value::String(_)) => continue,
            Some(Value::Number(n)) => Some(Value::String(n.to_string())),
            Some(Value::Bool(b)) => Some(Value::String(b.to_string())),
            _ => None,
        };
        match scrubbed {
            Some(value) => {
                env.insert(key, value);
            }
            None => {
                env.remove(&key);
            }
        }
    }
}
