//
// lib.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Eirene's kernel discovery and matching engine.
//!
//! The engine reconciles three racy, partially overlapping data sources --
//! on-disk global kernel registrations, per-interpreter kernel
//! registrations, and live sessions reported by a remote server -- into a
//! single de-duplicated, ranked list of kernel connection candidates, and
//! keeps engine-managed spec files in sync with the interpreter they
//! launch.

pub mod discovery_cache;
pub mod error;
pub mod interpreter_matcher;
pub mod kernel_catalog;
pub mod kernel_selector;
pub mod providers;
pub mod search_paths;
pub mod spec_mutator;
pub mod spec_store;

pub use discovery_cache::DiscoveryCache;
pub use error::DiscoveryError;
pub use kernel_catalog::{DiscoveryScope, KernelCatalog};
pub use kernel_selector::{KernelSelector, Resolution};
pub use spec_mutator::{ReconcileOutcome, SpecMutator};
