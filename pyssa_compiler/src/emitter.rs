//! Module translation and nested-definition hoisting.
//!
//! The module body is translated first. Each definition site it contains
//! yields a [`Hoisted`] body, which is translated after its parent, depth-first
//! in definition order, under the qualified name its parent assigned.

use crate::config::TranslateConfig;
use crate::error::{TranslateError, TranslateResult};
use crate::ir::{Module, ProcKind, Procedure, QualName};
use crate::translator::{Hoisted, ProcedureTranslator};
use log::{debug, warn};
use pyssa_bytecode::CodeObject;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// The outcome of translating a module: every procedure that translated, plus
/// one error per procedure that did not.
#[derive(Debug, Clone)]
pub struct Translation {
    pub module: Module,
    pub errors: Vec<TranslateError>,
}

impl Translation {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// The module, or the first failure.
    pub fn into_result(self) -> TranslateResult<Module> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.module),
        }
    }
}

/// Translate a single code object without descending into its definitions.
pub fn translate_procedure(
    code: &CodeObject,
    qualname: QualName,
    kind: ProcKind,
    config: &TranslateConfig,
) -> TranslateResult<(Procedure, Vec<Hoisted>)> {
    ProcedureTranslator::new(code, qualname, kind, config)?.translate()
}

/// Translate a module body and every body nested in it.
///
/// A failing procedure is reported in [`Translation::errors`]; its own nested
/// bodies are never reached, its siblings are still translated.
pub fn translate_module(code: &CodeObject, config: &TranslateConfig) -> Translation {
    let root = Hoisted {
        qualname: QualName::toplevel(config.module_name.clone()),
        kind: ProcKind::Module,
        code: Arc::new(code.clone()),
    };

    let mut procedures = Vec::new();
    let mut errors = Vec::new();
    let mut seen: FxHashSet<QualName> = FxHashSet::default();
    let mut pending = vec![root];

    while let Some(next) = pending.pop() {
        if !seen.insert(next.qualname.clone()) {
            warn!("duplicate qualified name {}", next.qualname);
        }
        match translate_procedure(&next.code, next.qualname.clone(), next.kind, config) {
            Ok((procedure, hoisted)) => {
                procedures.push(procedure);
                // Reversed so the first definition is translated first.
                pending.extend(hoisted.into_iter().rev());
            }
            Err(err) => {
                warn!("{}", err);
                errors.push(err);
            }
        }
    }

    debug!(
        "module {}: {} procedures, {} failed",
        config.module_name,
        procedures.len(),
        errors.len()
    );
    Translation {
        module: Module {
            name: config.module_name.clone(),
            procedures,
        },
        errors,
    }
}
