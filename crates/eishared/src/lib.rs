//
// lib.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Shared types for the Eirene kernel discovery engine.

/// Kernel connection descriptors
pub mod connection;

/// Interpreter descriptors
pub mod interpreter;

/// Kernel specification models
pub mod kernel_spec;
