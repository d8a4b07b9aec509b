//
// kernel_catalog.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Produces the de-duplicated, ranked list of local kernel connection
//! candidates for a scope.
//!
//! The catalog owns its discovery cache outright; there is no ambient
//! state. Hosts that watch for interpreter-list changes invalidate a scope
//! either by calling [`KernelCatalog::invalidate`] directly or by sending
//! the scope key over the channel drained by
//! [`KernelCatalog::run_invalidation_listener`].

use std::path::PathBuf;
use std::sync::Arc;

use eishared::connection::KernelConnection;
use eishared::interpreter::{paths_equal, Interpreter};
use eishared::kernel_spec::{KernelSpecification, METADATA_INTERPRETER_KEY};
use serde_json::Map;
use tokio_util::sync::CancellationToken;

use crate::discovery_cache::DiscoveryCache;
use crate::error::DiscoveryError;
use crate::interpreter_matcher::{match_interpreter, PYTHON_LANGUAGE};
use crate::providers::InterpreterProvider;
use crate::search_paths::{dedup_roots, global_kernel_roots, interpreter_kernel_root};
use crate::spec_store;

/// The name prefix for kernel specifications the engine synthesizes for
/// interpreters that no discovered spec covers.
pub const DEFAULT_SPEC_NAME_PREFIX: &str = "python_defaultSpec_";

/// The logical scope a discovery runs for: a workspace folder, or the
/// global scope when no folder is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryScope {
    /// Cache key; one enumeration is in flight per key at a time
    pub key: String,

    /// The resource interpreters are enumerated for, if any
    pub resource: Option<PathBuf>,
}

impl DiscoveryScope {
    /// The global scope (no workspace folder).
    pub fn global() -> Self {
        Self {
            key: "global".to_string(),
            resource: None,
        }
    }

    /// A workspace folder scope, keyed by the folder path.
    pub fn workspace(folder: PathBuf) -> Self {
        Self {
            key: folder.to_string_lossy().to_string(),
            resource: Some(folder),
        }
    }
}

/// Discovers and ranks local kernel connection candidates.
pub struct KernelCatalog {
    interpreters: Arc<dyn InterpreterProvider>,
    cache: DiscoveryCache<Vec<KernelConnection>>,
    global_roots: Vec<PathBuf>,
}

impl KernelCatalog {
    /// Create a catalog using the platform's global kernel search roots.
    pub fn new(interpreters: Arc<dyn InterpreterProvider>) -> Self {
        Self::with_global_roots(interpreters, global_kernel_roots())
    }

    /// Create a catalog with explicit global roots. Tests use this to point
    /// discovery at fixture directories.
    pub fn with_global_roots(
        interpreters: Arc<dyn InterpreterProvider>,
        global_roots: Vec<PathBuf>,
    ) -> Self {
        Self {
            interpreters,
            cache: DiscoveryCache::new(),
            global_roots,
        }
    }

    /// List the kernel connection candidates for a scope.
    ///
    /// Results are cached per scope key; concurrent callers for the same
    /// key share one enumeration. A cancelled call returns an empty list
    /// (never a partial one) and caches nothing. The returned candidates
    /// are clones; callers can't reach into the cache through them.
    pub async fn list_candidates(
        &self,
        scope: &DiscoveryScope,
        token: &CancellationToken,
    ) -> Vec<KernelConnection> {
        let result = self
            .cache
            .get_or_compute(&scope.key, || self.compute_candidates(scope, token))
            .await;
        match result {
            Some(candidates) => (*candidates).clone(),
            None => Vec::new(),
        }
    }

    /// Drop the cached candidates for a scope (e.g. because the
    /// interpreter list changed).
    pub fn invalidate(&self, scope_key: &str) {
        self.cache.invalidate(scope_key);
    }

    /// Drain scope keys from a channel, invalidating each. Hosts wire
    /// their "interpreter list changed" event to the sending side.
    pub async fn run_invalidation_listener(self: Arc<Self>, rx: async_channel::Receiver<String>) {
        while let Ok(scope_key) = rx.recv().await {
            self.invalidate(&scope_key);
        }
    }

    /// The full enumeration: phases (a) through (f). Returns `None` when
    /// cancelled so nothing lands in the cache.
    async fn compute_candidates(
        &self,
        scope: &DiscoveryScope,
        token: &CancellationToken,
    ) -> Option<Vec<KernelConnection>> {
        let resource = scope.resource.as_deref();
        let interpreters = self.interpreters.list_interpreters(resource).await;
        if token.is_cancelled() {
            log::debug!("Kernel discovery for scope '{}' cancelled", scope.key);
            return None;
        }

        // (a) Degraded path: no interpreters are known, so list global
        // specs for the target language and nothing else.
        if interpreters.is_empty() {
            log::debug!(
                "No interpreters known for scope '{}'; listing global kernel specs only",
                scope.key
            );
            let specs = spec_store::list_specs(&self.global_roots).await;
            return Some(
                specs
                    .into_iter()
                    .filter(|s| {
                        s.language.is_empty() || s.language.eq_ignore_ascii_case(PYTHON_LANGUAGE)
                    })
                    .map(|spec| KernelConnection::Spec {
                        spec,
                        interpreter: None,
                    })
                    .collect(),
            );
        }

        let active = self.interpreters.active_interpreter(resource).await;

        // (b) Enumerate specs under every interpreter environment, plus the
        // engine's own registrations under the global roots.
        let roots = dedup_roots(interpreters.iter().map(interpreter_kernel_root).collect());
        let mut specs = spec_store::list_specs(&roots).await;
        let global_specs = spec_store::list_specs(&self.global_roots).await;
        specs.extend(
            global_specs
                .into_iter()
                .filter(|s| s.is_registered_by_engine()),
        );
        if token.is_cancelled() {
            log::debug!("Kernel discovery for scope '{}' cancelled", scope.key);
            return None;
        }

        // (c) Match every spec to an interpreter, consuming matched
        // interpreters from the unmatched pool.
        let mut unmatched: Vec<Interpreter> = interpreters.clone();
        let mut candidates: Vec<KernelConnection> = Vec::with_capacity(specs.len());
        for spec in specs {
            let matched = self.resolve_spec_interpreter(&spec, &interpreters, active.as_ref()).await;
            match matched {
                Some(interpreter) => {
                    unmatched.retain(|i| !paths_equal(&i.path, &interpreter.path));
                    candidates.push(KernelConnection::Interpreter { spec, interpreter });
                }
                None => {
                    candidates.push(KernelConnection::Spec {
                        spec,
                        interpreter: None,
                    });
                }
            }
        }
        if token.is_cancelled() {
            log::debug!("Kernel discovery for scope '{}' cancelled", scope.key);
            return None;
        }

        // (d) Every interpreter left over gets a synthesized default spec.
        for interpreter in unmatched {
            let spec = default_spec_for(&interpreter);
            candidates.push(KernelConnection::Interpreter { spec, interpreter });
        }

        // (e) Deduplicate by the stable identity key, preferring concrete
        // launch paths over bare names.
        let candidates = dedup_candidates(candidates);

        // (f) Stable sort: the candidate bound to the active interpreter
        // under the active interpreter's display name first; everything
        // else keeps discovery order.
        let mut candidates = candidates;
        if let Some(active) = active.as_ref() {
            candidates.sort_by_key(|c| {
                let preferred = c
                    .interpreter()
                    .map(|i| paths_equal(&i.path, &active.path))
                    .unwrap_or(false)
                    && c.display_name() == active.display_name;
                !preferred
            });
        }

        log::debug!(
            "Kernel discovery for scope '{}' produced {} candidates",
            scope.key,
            candidates.len()
        );
        Some(candidates)
    }

    /// Match a spec against the known interpreters, falling back to a
    /// detail lookup of the spec's recorded interpreter path. Lookup
    /// failures degrade to "no interpreter".
    async fn resolve_spec_interpreter(
        &self,
        spec: &KernelSpecification,
        interpreters: &[Interpreter],
        active: Option<&Interpreter>,
    ) -> Option<Interpreter> {
        if let Some(interpreter) = match_interpreter(spec, interpreters, active) {
            return Some(interpreter);
        }
        if !spec.language.is_empty() && !spec.language.eq_ignore_ascii_case(PYTHON_LANGUAGE) {
            return None;
        }
        let recorded = spec
            .metadata_interpreter_path()
            .or_else(|| spec.interpreter_path.clone())?;
        match self.interpreters.interpreter_details(&recorded).await {
            Ok(details) => details,
            Err(err) => {
                DiscoveryError::LookupFailure(format!("{}: {}", recorded.display(), err)).log();
                None
            }
        }
    }
}

/// Synthesize the default launch specification for an interpreter no
/// discovered spec covers.
pub fn default_spec_for(interpreter: &Interpreter) -> KernelSpecification {
    let fingerprint = interpreter.fingerprint();
    let name = format!("{}{}", DEFAULT_SPEC_NAME_PREFIX, &fingerprint[..8]);
    let path = interpreter.path.to_string_lossy().to_string();

    let mut metadata = Map::new();
    match serde_json::to_value(interpreter) {
        Ok(descriptor) => {
            metadata.insert(METADATA_INTERPRETER_KEY.to_string(), descriptor);
        }
        Err(err) => {
            log::error!("Failed to serialize interpreter descriptor: {}", err);
        }
    }

    KernelSpecification {
        name,
        display_name: interpreter.display_name.clone(),
        language: PYTHON_LANGUAGE.to_string(),
        argv: vec![
            path.clone(),
            "-m".to_string(),
            "ipykernel_launcher".to_string(),
            "-f".to_string(),
            "{connection_file}".to_string(),
        ],
        path,
        interpreter_path: Some(interpreter.path.clone()),
        env: None,
        metadata: Some(metadata),
        spec_file: None,
    }
}

/// Deduplicate candidates by identity key, preserving first-seen order.
/// When two candidates collide, the one with a concrete absolute launch
/// path wins over one with only a bare name.
fn dedup_candidates(candidates: Vec<KernelConnection>) -> Vec<KernelConnection> {
    let mut result: Vec<KernelConnection> = Vec::with_capacity(candidates.len());
    let mut keys: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let key = candidate.dedup_key();
        match keys.iter().position(|k| k == &key) {
            Some(index) => {
                if candidate.has_concrete_path() && !result[index].has_concrete_path() {
                    log::trace!("Replacing duplicate kernel candidate '{}'", key);
                    result[index] = candidate;
                }
            }
            None => {
                keys.push(key);
                result.push(candidate);
            }
        }
    }
    result
}
