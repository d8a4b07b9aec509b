//
// mocks.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//

//! Mock collaborators for the engine's integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use eishared::connection::{KernelConnection, RemoteSession};
use eishared::interpreter::{paths_equal, Interpreter};
use eishared::kernel_spec::KernelSpecification;
use eicore::providers::{
    ActivationEnvProvider, InterpreterProvider, KernelPicker, PreferredKernelStore,
    RemoteSessionProvider,
};

/// An interpreter provider backed by fixed lists.
pub struct StaticInterpreters {
    pub active: Option<Interpreter>,
    pub all: Vec<Interpreter>,

    /// When set, `interpreter_details` fails with this message
    pub details_error: Option<String>,

    /// Number of `list_interpreters` calls observed
    pub list_calls: AtomicUsize,
}

impl StaticInterpreters {
    pub fn new(active: Option<Interpreter>, all: Vec<Interpreter>) -> Self {
        Self {
            active,
            all,
            details_error: None,
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InterpreterProvider for StaticInterpreters {
    async fn active_interpreter(&self, _resource: Option<&Path>) -> Option<Interpreter> {
        self.active.clone()
    }

    async fn list_interpreters(&self, _resource: Option<&Path>) -> Vec<Interpreter> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.all.clone()
    }

    async fn interpreter_details(
        &self,
        path: &Path,
    ) -> Result<Option<Interpreter>, anyhow::Error> {
        if let Some(message) = &self.details_error {
            anyhow::bail!("{}", message.clone());
        }
        Ok(self.all.iter().find(|i| paths_equal(&i.path, path)).cloned())
    }
}

/// An activation provider that returns a fixed environment, or fails.
pub struct StaticActivation {
    pub env: HashMap<String, String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StaticActivation {
    pub fn new(env: HashMap<String, String>) -> Self {
        Self {
            env,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            env: HashMap::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ActivationEnvProvider for StaticActivation {
    async fn activated_env(
        &self,
        _resource: Option<&Path>,
        _interpreter: &Interpreter,
        _allow_exceptions: bool,
    ) -> Result<HashMap<String, String>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("activation script exited with code 1");
        }
        Ok(self.env.clone())
    }
}

/// A remote session provider backed by fixed lists.
pub struct StaticRemote {
    pub sessions: Vec<RemoteSession>,
    pub specs: Vec<KernelSpecification>,
}

#[async_trait]
impl RemoteSessionProvider for StaticRemote {
    async fn running_sessions(&self) -> Result<Vec<RemoteSession>, anyhow::Error> {
        Ok(self.sessions.clone())
    }

    async fn remote_specs(&self) -> Result<Vec<KernelSpecification>, anyhow::Error> {
        Ok(self.specs.clone())
    }
}

/// An in-memory preferred-kernel history store.
#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<HashMap<String, String>>,
}

impl PreferredKernelStore for MemoryHistory {
    fn get(&self, resource_id: &str) -> Option<String> {
        self.entries.lock().unwrap().get(resource_id).cloned()
    }

    fn set(&self, resource_id: &str, session_id: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(resource_id.to_string(), session_id.to_string());
    }
}

/// A picker that always chooses a fixed index.
pub struct IndexPicker {
    pub index: Option<usize>,
}

#[async_trait]
impl KernelPicker for IndexPicker {
    async fn pick(
        &self,
        _candidates: &[KernelConnection],
        _current_display_name: Option<&str>,
    ) -> Option<usize> {
        self.index
    }
}
