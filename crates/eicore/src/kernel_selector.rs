//
// kernel_selector.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Top-level kernel resolution: merges local candidates with live remote
//! sessions, applies preferred-kernel memory, and produces a single
//! resolved connection descriptor.

use std::path::Path;
use std::sync::Arc;

use eishared::connection::KernelConnection;
use eishared::interpreter::Interpreter;
use eishared::kernel_spec::{KernelSpecification, NotebookMetadata};
use tokio_util::sync::CancellationToken;

use crate::interpreter_matcher::{match_interpreter, parse_default_kernel_major, PYTHON_LANGUAGE};
use crate::kernel_catalog::{default_spec_for, DiscoveryScope, KernelCatalog};
use crate::providers::{
    InterpreterProvider, KernelPicker, PreferredKernelStore, RemoteSessionProvider,
};
use crate::spec_mutator::SpecMutator;

// Additive scoring weights for remote spec matching. Only the relative
// order (display name > path > version > language alone) is contractual.
const SCORE_DISPLAY_NAME_MATCH: u32 = 16;
const SCORE_PATH_MATCH: u32 = 8;
const SCORE_VERSION_MATCH: u32 = 4;
const SCORE_LANGUAGE_MATCH: u32 = 1;

/// The outcome of a preferred-kernel resolution. Cancellation is a
/// distinct outcome, not an error and not "nothing found".
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A kernel connection was resolved
    Connection(KernelConnection),

    /// No usable kernel was found
    NotFound,

    /// The call was abandoned via its cancellation token
    Cancelled,
}

impl Resolution {
    /// The resolved connection, if any.
    pub fn connection(self) -> Option<KernelConnection> {
        match self {
            Resolution::Connection(connection) => Some(connection),
            Resolution::NotFound | Resolution::Cancelled => None,
        }
    }
}

/// Resolves the preferred kernel connection for a notebook.
///
/// Every descriptor returned from this type is freshly cloned; callers
/// never receive references into the catalog's caches.
pub struct KernelSelector {
    interpreters: Arc<dyn InterpreterProvider>,
    catalog: Arc<KernelCatalog>,
    mutator: SpecMutator,
    remote: Option<Arc<dyn RemoteSessionProvider>>,
    history: Option<Arc<dyn PreferredKernelStore>>,
    picker: Option<Arc<dyn KernelPicker>>,
}

impl KernelSelector {
    pub fn new(
        interpreters: Arc<dyn InterpreterProvider>,
        catalog: Arc<KernelCatalog>,
        mutator: SpecMutator,
    ) -> Self {
        Self {
            interpreters,
            catalog,
            mutator,
            remote: None,
            history: None,
            picker: None,
        }
    }

    /// Attach a remote session collaborator.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteSessionProvider>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Attach a preferred-kernel history store.
    pub fn with_history(mut self, history: Arc<dyn PreferredKernelStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Attach a user prompt collaborator.
    pub fn with_picker(mut self, picker: Arc<dyn KernelPicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    /// Resolve the preferred local kernel connection for a notebook.
    pub async fn resolve_preferred_local(
        &self,
        resource: Option<&Path>,
        metadata: Option<&NotebookMetadata>,
        token: &CancellationToken,
    ) -> Resolution {
        // (1) An interpreter fingerprint in the notebook pins the exact
        // interpreter; when it still exists, no spec search is needed.
        if let Some(hash) = metadata.and_then(|m| m.interpreter_hash.as_deref()) {
            let interpreters = self.interpreters.list_interpreters(resource).await;
            if token.is_cancelled() {
                return Resolution::Cancelled;
            }
            if let Some(interpreter) = interpreters.iter().find(|i| i.fingerprint() == hash) {
                log::debug!(
                    "Resolved notebook interpreter by fingerprint: {}",
                    interpreter.path.display()
                );
                return Resolution::Connection(KernelConnection::Interpreter {
                    spec: default_spec_for(interpreter),
                    interpreter: interpreter.clone(),
                });
            }
        }

        let active = self.interpreters.active_interpreter(resource).await;
        if token.is_cancelled() {
            return Resolution::Cancelled;
        }

        // A notebook known to be Python but carrying no kernel spec
        // metadata at all has nothing to search for.
        let skip_search = match metadata {
            Some(m) => {
                m.language.as_deref().map(|l| l.eq_ignore_ascii_case(PYTHON_LANGUAGE))
                    == Some(true)
                    && !m.has_kernel_spec()
            }
            None => false,
        };

        let scope = scope_for(resource);
        let mut candidates = Vec::new();

        if !skip_search {
            // (2) Search discovered specs for one matching the notebook's
            // kernel metadata.
            candidates = self.catalog.list_candidates(&scope, token).await;
            if token.is_cancelled() {
                return Resolution::Cancelled;
            }
            if let Some(found) = find_matching_candidate(&candidates, metadata) {
                // (4) Bind an interpreter unless the spec's language says
                // this isn't our kernel.
                return Resolution::Connection(self.bind_candidate(
                    found.clone(),
                    resource,
                    active.as_ref(),
                ).await);
            }
        }

        // (3) No matching spec; the active interpreter is good enough.
        if let Some(active) = active {
            return Resolution::Connection(KernelConnection::Interpreter {
                spec: default_spec_for(&active),
                interpreter: active,
            });
        }

        // (5) Last resort: any candidate at all, preferring our language.
        if candidates.is_empty() {
            candidates = self.catalog.list_candidates(&scope, token).await;
            if token.is_cancelled() {
                return Resolution::Cancelled;
            }
        }
        let fallback = candidates
            .iter()
            .find(|c| {
                c.spec()
                    .map(|s| s.language.eq_ignore_ascii_case(PYTHON_LANGUAGE))
                    .unwrap_or(false)
            })
            .or_else(|| candidates.first());
        match fallback {
            Some(candidate) => Resolution::Connection(candidate.clone()),
            None => Resolution::NotFound,
        }
    }

    /// Resolve the preferred kernel for a notebook attached to a remote
    /// server.
    pub async fn resolve_preferred_remote(
        &self,
        resource: Option<&Path>,
        metadata: Option<&NotebookMetadata>,
        token: &CancellationToken,
    ) -> Resolution {
        let remote = match &self.remote {
            Some(remote) => remote.clone(),
            None => return Resolution::NotFound,
        };

        // (1) A remembered live session takes precedence over any scoring.
        if let Some(history) = &self.history {
            if let Some(session_id) = history.get(&resource_id(resource)) {
                let sessions = match remote.running_sessions().await {
                    Ok(sessions) => sessions,
                    Err(err) => {
                        log::warn!("Failed to list running remote sessions: {}", err);
                        Vec::new()
                    }
                };
                if token.is_cancelled() {
                    return Resolution::Cancelled;
                }
                if let Some(session) = sessions.iter().find(|s| s.session_id == session_id) {
                    log::debug!(
                        "Reconnecting to remembered remote session {}",
                        session.session_id
                    );
                    return Resolution::Connection(KernelConnection::Live {
                        session_id: session.session_id.clone(),
                        kernel_name: session.kernel_name.clone(),
                        interpreter: None,
                        last_activity: session.last_activity,
                        connection_count: session.connection_count,
                    });
                }
            }
        }

        let active = self.interpreters.active_interpreter(resource).await;
        let specs = match remote.remote_specs().await {
            Ok(specs) => specs,
            Err(err) => {
                log::warn!("Failed to list remote kernel specs: {}", err);
                Vec::new()
            }
        };
        if token.is_cancelled() {
            return Resolution::Cancelled;
        }

        // (2) Score every remote spec; ties keep the first encountered.
        let mut best: Option<(&KernelSpecification, u32)> = None;
        for spec in &specs {
            let score = score_remote_spec(spec, active.as_ref(), metadata);
            if score > best.map(|(_, s)| s).unwrap_or(0) {
                best = Some((spec, score));
            }
        }

        match best {
            Some((spec, score)) => {
                log::debug!(
                    "Matched remote kernel spec '{}' with score {}",
                    spec.name,
                    score
                );
                Resolution::Connection(KernelConnection::Spec {
                    spec: spec.clone(),
                    interpreter: None,
                })
            }
            // Nothing scored; fall back to a default kernel for the active
            // interpreter.
            None => match active {
                Some(active) => Resolution::Connection(KernelConnection::Interpreter {
                    spec: default_spec_for(&active),
                    interpreter: active,
                }),
                None => Resolution::NotFound,
            },
        }
    }

    /// Present every available connection to the user and return the
    /// chosen one, with interpreter resolution and spec reconciliation
    /// applied to the choice.
    pub async fn prompt_and_select(
        &self,
        resource: Option<&Path>,
        current_display_name: Option<&str>,
        token: &CancellationToken,
    ) -> Result<Option<KernelConnection>, anyhow::Error> {
        let picker = match &self.picker {
            Some(picker) => picker.clone(),
            None => anyhow::bail!("No kernel picker is attached"),
        };

        let scope = scope_for(resource);
        let mut candidates = self.catalog.list_candidates(&scope, token).await;
        if token.is_cancelled() {
            return Ok(None);
        }

        // Fold in live sessions from the remote server, if one is attached.
        if let Some(remote) = &self.remote {
            match remote.running_sessions().await {
                Ok(sessions) => {
                    candidates.extend(sessions.into_iter().map(|s| KernelConnection::Live {
                        session_id: s.session_id,
                        kernel_name: s.kernel_name,
                        interpreter: None,
                        last_activity: s.last_activity,
                        connection_count: s.connection_count,
                    }));
                }
                Err(err) => {
                    log::warn!("Failed to list running remote sessions: {}", err);
                }
            }
        }

        let index = match picker.pick(&candidates, current_display_name).await {
            Some(index) if index < candidates.len() => index,
            _ => return Ok(None),
        };
        let chosen = candidates[index].clone();

        // Remember a chosen live session for next time.
        if let (KernelConnection::Live { session_id, .. }, Some(history)) =
            (&chosen, &self.history)
        {
            history.set(&resource_id(resource), session_id);
        }

        let active = self.interpreters.active_interpreter(resource).await;
        Ok(Some(self.bind_candidate(chosen, resource, active.as_ref()).await))
    }

    /// Bind an interpreter to a spec candidate that lacks one, and
    /// reconcile the spec file with the result. A failed write is logged
    /// and the in-memory, unpersisted spec is used rather than failing the
    /// whole resolution.
    async fn bind_candidate(
        &self,
        candidate: KernelConnection,
        resource: Option<&Path>,
        active: Option<&Interpreter>,
    ) -> KernelConnection {
        let (mut spec, interpreter) = match candidate {
            KernelConnection::Spec {
                spec,
                interpreter: None,
            } => {
                let interpreters = self.interpreters.list_interpreters(resource).await;
                let matched = match_interpreter(&spec, &interpreters, active);
                (spec, matched)
            }
            KernelConnection::Spec {
                spec,
                interpreter: Some(interpreter),
            } => (spec, Some(interpreter)),
            KernelConnection::Interpreter { spec, interpreter } => (spec, Some(interpreter)),
            live @ KernelConnection::Live { .. } => return live,
        };

        if let Err(err) = self
            .mutator
            .reconcile(&mut spec, interpreter.as_ref(), resource, false)
            .await
        {
            log::warn!(
                "Failed to reconcile kernel spec '{}'; continuing with the in-memory spec: {}",
                spec.name,
                err
            );
        }

        match interpreter {
            Some(interpreter) => KernelConnection::Interpreter { spec, interpreter },
            None => KernelConnection::Spec {
                spec,
                interpreter: None,
            },
        }
    }
}

/// Score a remote spec against the active interpreter and the notebook's
/// kernel metadata.
fn score_remote_spec(
    spec: &KernelSpecification,
    active: Option<&Interpreter>,
    metadata: Option<&NotebookMetadata>,
) -> u32 {
    let mut score = 0;

    if let Some(active) = active {
        let active_path = active.path.to_string_lossy();
        let recorded = spec
            .metadata_interpreter_path()
            .or_else(|| spec.interpreter_path.clone());
        if spec.path == active_path
            || recorded
                .map(|p| eishared::interpreter::paths_equal(&p, &active.path))
                .unwrap_or(false)
        {
            score += SCORE_PATH_MATCH;
        }

        if let (Some(major), Some(version)) =
            (parse_default_kernel_major(&spec.name), active.version)
        {
            if major == version.major {
                score += SCORE_VERSION_MATCH;
            }
        }
    }

    if let Some(display_name) = metadata.and_then(|m| m.kernel_spec_display_name.as_deref()) {
        if spec.display_name == display_name {
            score += SCORE_DISPLAY_NAME_MATCH;
        }
    }

    if spec.language.eq_ignore_ascii_case(PYTHON_LANGUAGE) {
        score += SCORE_LANGUAGE_MATCH;
    }

    score
}

/// Find the candidate whose spec matches the notebook's kernel metadata,
/// by name first and display name second.
fn find_matching_candidate<'a>(
    candidates: &'a [KernelConnection],
    metadata: Option<&NotebookMetadata>,
) -> Option<&'a KernelConnection> {
    let metadata = metadata?;
    if !metadata.has_kernel_spec() {
        return None;
    }
    if let Some(name) = metadata.kernel_spec_name.as_deref() {
        if let Some(found) = candidates
            .iter()
            .find(|c| c.spec().map(|s| s.name == name).unwrap_or(false))
        {
            return Some(found);
        }
    }
    if let Some(display_name) = metadata.kernel_spec_display_name.as_deref() {
        if let Some(found) = candidates
            .iter()
            .find(|c| c.spec().map(|s| s.display_name == display_name).unwrap_or(false))
        {
            return Some(found);
        }
    }
    None
}

fn scope_for(resource: Option<&Path>) -> DiscoveryScope {
    match resource {
        Some(resource) => DiscoveryScope::workspace(resource.to_path_buf()),
        None => DiscoveryScope::global(),
    }
}

fn resource_id(resource: Option<&Path>) -> String {
    match resource {
        Some(resource) => resource.to_string_lossy().to_string(),
        None => "global".to_string(),
    }
}
