//
// providers.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Collaborator interfaces consumed by the engine.
//!
//! The editor host implements these; the engine only ever sees them as
//! trait objects. Everything here is I/O-bound and best-effort -- the
//! engine treats failures from these collaborators as degraded results,
//! never as fatal errors.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use eishared::connection::RemoteSession;
use eishared::interpreter::Interpreter;
use eishared::kernel_spec::KernelSpecification;

/// Enumerates installed interpreters and reports the active one.
#[async_trait]
pub trait InterpreterProvider: Send + Sync {
    /// The interpreter currently selected for the given resource (e.g. the
    /// workspace's chosen interpreter), if any.
    async fn active_interpreter(&self, resource: Option<&Path>) -> Option<Interpreter>;

    /// All interpreters known for the given resource, in provider order.
    async fn list_interpreters(&self, resource: Option<&Path>) -> Vec<Interpreter>;

    /// Full details for the interpreter at `path`, or `Ok(None)` if no
    /// interpreter lives there.
    async fn interpreter_details(&self, path: &Path) -> Result<Option<Interpreter>, anyhow::Error>;
}

/// Fetches the environment variables an interpreter's environment exports
/// once activated (conda/venv activation scripts and the like).
#[async_trait]
pub trait ActivationEnvProvider: Send + Sync {
    async fn activated_env(
        &self,
        resource: Option<&Path>,
        interpreter: &Interpreter,
        allow_exceptions: bool,
    ) -> Result<HashMap<String, String>, anyhow::Error>;
}

/// Reports live kernels and kernel specs from a remote server.
#[async_trait]
pub trait RemoteSessionProvider: Send + Sync {
    /// Sessions currently running on the server.
    async fn running_sessions(&self) -> Result<Vec<RemoteSession>, anyhow::Error>;

    /// Kernel specs the server can launch.
    async fn remote_specs(&self) -> Result<Vec<KernelSpecification>, anyhow::Error>;
}

/// Persisted memory of the kernel last used with a notebook.
pub trait PreferredKernelStore: Send + Sync {
    /// The session id previously used for this resource, if remembered.
    fn get(&self, resource_id: &str) -> Option<String>;

    /// Remember the session id used for this resource.
    fn set(&self, resource_id: &str, session_id: &str);
}

/// Presents a ranked candidate list to the user. Pure UI; out of the
/// engine's scope beyond this seam.
#[async_trait]
pub trait KernelPicker: Send + Sync {
    /// Return the index of the chosen candidate, or `None` if the user
    /// dismissed the prompt.
    async fn pick(
        &self,
        candidates: &[eishared::connection::KernelConnection],
        current_display_name: Option<&str>,
    ) -> Option<usize>;
}
