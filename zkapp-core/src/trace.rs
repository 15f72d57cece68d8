//! Error traces collected while building a zkApp command
//!
//! Every account update added to a context gets a trace node mirroring the
//! update tree: where it was added, what went wrong, and the traces of its
//! children. Construction fails with the rendered report of the whole trace.

use crate::error::ApplyError;
use crate::tree::AccountUpdateTree;
use crate::types::AccountId;
use serde::Serialize;
use std::fmt::{self, Write};

/// Source location an update was added from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Source file
    pub file: &'static str,
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl CallSite {
    /// Location of the (tracked) caller
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Trace node of one account update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountUpdateTrace {
    /// Target account
    pub account_id: AccountId,
    /// Where the enclosing tree was added
    pub call_site: CallSite,
    /// Findings for this update
    pub errors: Vec<ApplyError>,
    /// Traces of the child updates, in order
    pub child_traces: Vec<AccountUpdateTrace>,
}

impl AccountUpdateTrace {
    /// Whether this node or any descendant has errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.child_traces.iter().any(|t| t.has_errors())
    }

    /// Total findings in this subtree
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.child_traces.iter().map(|t| t.error_count()).sum::<usize>()
    }

    /// Whether this trace has the same shape as `tree`
    pub fn matches_shape<T>(&self, tree: &AccountUpdateTree<T>) -> bool {
        self.child_traces.len() == tree.children.len()
            && self
                .child_traces
                .iter()
                .zip(tree.children.iter())
                .all(|(trace, child)| trace.matches_shape(child))
    }

    fn write_report(&self, out: &mut String, path: &str, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        writeln!(out, "{}[{}] {} (added at {})", pad, path, self.account_id, self.call_site)?;
        for error in &self.errors {
            writeln!(out, "{}  - {}", pad, error)?;
        }
        for (i, child) in self.child_traces.iter().enumerate() {
            child.write_report(out, &format!("{}.{}", path, i), indent + 1)?;
        }
        Ok(())
    }
}

/// Full error trace of one zkApp command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZkappCommandErrorTrace {
    /// Findings of the fee payment
    pub fee_payer_errors: Vec<ApplyError>,
    /// Transaction-level findings (fee excess)
    pub general_errors: Vec<ApplyError>,
    /// One trace per top-level tree
    pub account_update_traces: Vec<AccountUpdateTrace>,
}

impl ZkappCommandErrorTrace {
    /// Whether anything failed
    pub fn has_errors(&self) -> bool {
        !self.fee_payer_errors.is_empty()
            || !self.general_errors.is_empty()
            || self.account_update_traces.iter().any(|t| t.has_errors())
    }

    /// Total number of findings
    pub fn error_count(&self) -> usize {
        self.fee_payer_errors.len()
            + self.general_errors.len()
            + self
                .account_update_traces
                .iter()
                .map(|t| t.error_count())
                .sum::<usize>()
    }

    /// Human-readable, indented report
    pub fn generate_report(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_report(&mut out);
        out
    }

    fn write_report(&self, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            "errors were encountered while creating a zkApp command ({} total)",
            self.error_count()
        )?;

        if !self.fee_payer_errors.is_empty() {
            writeln!(out, "fee payer:")?;
            for error in &self.fee_payer_errors {
                writeln!(out, "  - {}", error)?;
            }
        }

        if !self.general_errors.is_empty() {
            writeln!(out, "transaction:")?;
            for error in &self.general_errors {
                writeln!(out, "  - {}", error)?;
            }
        }

        if !self.account_update_traces.is_empty() {
            writeln!(out, "account updates:")?;
            for (i, trace) in self.account_update_traces.iter().enumerate() {
                trace.write_report(out, &i.to_string(), 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ZkappCommandErrorTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.generate_report())
    }
}
