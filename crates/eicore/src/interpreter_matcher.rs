//
// interpreter_matcher.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Matches a kernel specification against installed interpreters.
//!
//! The rules run in strict priority order; the first rule that produces a
//! result wins and no further rules are evaluated. Given the same spec and
//! the same interpreter ordering, the result is always the same: every
//! scan walks the slice in order, and nothing here iterates a map.

use std::path::Path;

use eishared::interpreter::{paths_equal, Interpreter};
use eishared::kernel_spec::KernelSpecification;

/// The language this engine matches interpreters for.
pub const PYTHON_LANGUAGE: &str = "python";

/// Find the interpreter that best matches a kernel specification.
///
/// Rules, first match wins:
/// 1. An interpreter path recorded on the spec (`metadata.interpreter.path`
///    or the record's `interpreter_path`) that names a known interpreter.
/// 2. A qualified `argv[0]` (not a bare executable name) that names a
///    known interpreter.
/// 3. The spec's display name equals the active interpreter's.
/// 4. The spec name looks like a default generic kernel (`python<major>`):
///    a major of zero or the active interpreter's major returns the active
///    interpreter; otherwise the first interpreter with that major wins,
///    falling back to the active interpreter.
/// 5. The first interpreter whose display name equals the spec's, falling
///    back to the active interpreter.
///
/// Specs for a language other than Python never match.
pub fn match_interpreter(
    spec: &KernelSpecification,
    interpreters: &[Interpreter],
    active: Option<&Interpreter>,
) -> Option<Interpreter> {
    // Never bind an interpreter to a kernel for some other language
    if !spec.language.is_empty() && !spec.language.eq_ignore_ascii_case(PYTHON_LANGUAGE) {
        log::trace!(
            "Kernel spec '{}' is for language '{}'; not matching an interpreter",
            spec.name,
            spec.language
        );
        return None;
    }

    // Rule 1: the spec records the interpreter it was registered for
    if let Some(recorded) = spec
        .metadata_interpreter_path()
        .or_else(|| spec.interpreter_path.clone())
    {
        if let Some(found) = find_by_path(interpreters, &recorded) {
            log::trace!(
                "Kernel spec '{}' matched interpreter {} by recorded path",
                spec.name,
                recorded.display()
            );
            return Some(found.clone());
        }
    }

    // Rule 2: argv[0] is a concrete path rather than a bare name
    if is_qualified_path(&spec.path) {
        if let Some(found) = find_by_path(interpreters, Path::new(&spec.path)) {
            log::trace!(
                "Kernel spec '{}' matched interpreter {} by argv[0]",
                spec.name,
                spec.path
            );
            return Some(found.clone());
        }
    }

    // Rule 3: the spec is named after the active interpreter
    if let Some(active) = active {
        if spec.display_name == active.display_name {
            return Some(active.clone());
        }
    }

    // Rule 4: default generic kernel names like "python3"
    if let Some(major) = parse_default_kernel_major(&spec.name) {
        if let Some(active) = active {
            if major == 0 || Some(major) == active.version.map(|v| v.major) {
                return Some(active.clone());
            }
        }
        let found = interpreters
            .iter()
            .find(|i| i.version.map(|v| v.major) == Some(major));
        return match found {
            Some(found) => Some(found.clone()),
            None => active.cloned(),
        };
    }

    // Rule 5: match by display name, falling back to the active interpreter
    let found = interpreters
        .iter()
        .find(|i| i.display_name == spec.display_name);
    match found {
        Some(found) => Some(found.clone()),
        None => active.cloned(),
    }
}

/// Parse the major version out of a default generic kernel name
/// (`python3` => 3). Returns `None` when the name doesn't follow the
/// pattern; a parsed zero means "any version".
pub fn parse_default_kernel_major(name: &str) -> Option<u32> {
    let rest = name.to_lowercase();
    let rest = rest.strip_prefix(PYTHON_LANGUAGE)?.trim().to_string();
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Whether a launch path is qualified (absolute or containing a path
/// separator) rather than a bare executable name resolved via PATH.
pub fn is_qualified_path(path: &str) -> bool {
    let p = Path::new(path);
    p.is_absolute() || path.chars().any(std::path::is_separator)
}

fn find_by_path<'a>(interpreters: &'a [Interpreter], path: &Path) -> Option<&'a Interpreter> {
    interpreters.iter().find(|i| paths_equal(&i.path, path))
}
