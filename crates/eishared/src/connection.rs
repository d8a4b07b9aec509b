//
// connection.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use chrono::{DateTime, Utc};

use crate::interpreter::Interpreter;
use crate::kernel_spec::KernelSpecification;

/// A kernel connection candidate: one way the user could run code.
///
/// All payloads are owned, so `Clone` produces a deep copy. The engine
/// clones every descriptor before handing it to a caller; nothing a caller
/// receives aliases engine-internal state.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelConnection {
    /// Launch via a discovered kernel specification, optionally bound to an
    /// interpreter
    Spec {
        spec: KernelSpecification,
        interpreter: Option<Interpreter>,
    },

    /// Launch by invoking an interpreter directly; `spec` is the matched or
    /// synthesized launch specification
    Interpreter {
        spec: KernelSpecification,
        interpreter: Interpreter,
    },

    /// Attach to a kernel already running on a remote server
    Live {
        session_id: String,
        kernel_name: String,
        interpreter: Option<Interpreter>,
        last_activity: Option<DateTime<Utc>>,
        connection_count: u32,
    },
}

impl KernelConnection {
    /// The interpreter bound to this connection, if any.
    pub fn interpreter(&self) -> Option<&Interpreter> {
        match self {
            KernelConnection::Spec { interpreter, .. } => interpreter.as_ref(),
            KernelConnection::Interpreter { interpreter, .. } => Some(interpreter),
            KernelConnection::Live { interpreter, .. } => interpreter.as_ref(),
        }
    }

    /// The specification backing this connection, if any.
    pub fn spec(&self) -> Option<&KernelSpecification> {
        match self {
            KernelConnection::Spec { spec, .. } => Some(spec),
            KernelConnection::Interpreter { spec, .. } => Some(spec),
            KernelConnection::Live { .. } => None,
        }
    }

    /// The name shown to the user for this connection.
    pub fn display_name(&self) -> &str {
        match self {
            KernelConnection::Spec { spec, .. } => &spec.display_name,
            KernelConnection::Interpreter { spec, .. } => &spec.display_name,
            KernelConnection::Live { kernel_name, .. } => kernel_name,
        }
    }

    /// A stable identity key used to deduplicate overlapping registrations:
    /// spec name plus the resolved interpreter path when one is bound, else
    /// the spec file path, else the bare spec name. Live connections are
    /// identified by session id.
    pub fn dedup_key(&self) -> String {
        match self {
            KernelConnection::Spec { spec, interpreter } => {
                Self::spec_key(spec, interpreter.as_ref())
            }
            KernelConnection::Interpreter { spec, interpreter } => {
                Self::spec_key(spec, Some(interpreter))
            }
            KernelConnection::Live { session_id, .. } => format!("live:{}", session_id),
        }
    }

    /// Whether this connection's launch path is concrete (absolute) rather
    /// than a bare executable name; used to break dedup collisions.
    pub fn has_concrete_path(&self) -> bool {
        match self.spec() {
            Some(spec) => std::path::Path::new(&spec.path).is_absolute(),
            None => true,
        }
    }

    fn spec_key(spec: &KernelSpecification, interpreter: Option<&Interpreter>) -> String {
        match interpreter {
            Some(interpreter) => {
                format!("{}:{}", spec.name, interpreter.path.to_string_lossy())
            }
            None => match &spec.spec_file {
                Some(file) => format!("{}:{}", spec.name, file.to_string_lossy()),
                None => spec.name.clone(),
            },
        }
    }
}

/// A kernel session running on a remote server, as reported by the remote
/// session collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSession {
    /// The server's identifier for the session
    pub session_id: String,

    /// The name of the kernel spec the session was started from
    pub kernel_name: String,

    /// When the session last did anything, if the server reports it
    pub last_activity: Option<DateTime<Utc>>,

    /// How many clients are currently attached
    pub connection_count: u32,
}
