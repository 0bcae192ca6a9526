//! Operator confirmation port.
//!
//! Confirmation is modeled as a pluggable callback so automated runs and
//! tests can supply a deterministic stub instead of interactive input.

use crate::resolver::CandidateMapping;
use pricescout_core::SemanticField;
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of asking the operator about a candidate mapping.
pub enum Confirmation {
    /// Operator accepted (possibly after editing) this field → column map
    Accepted(BTreeMap<SemanticField, usize>),
    /// No confirmation available; proceed with the unconfirmed candidate
    Declined,
}

/// Port through which the resolver requests operator confirmation.
pub trait ConfirmMapping: Send + Sync {
    fn confirm(
        &self,
        file: &Path,
        headers: &[String],
        candidate: &CandidateMapping,
    ) -> Confirmation;
}

/// Never confirms; used for unattended runs, where low-confidence mappings
/// proceed tagged rather than block ingestion.
#[derive(Default)]
pub struct AutoDeclineConfirm;

impl ConfirmMapping for AutoDeclineConfirm {
    fn confirm(
        &self,
        _file: &Path,
        _headers: &[String],
        _candidate: &CandidateMapping,
    ) -> Confirmation {
        Confirmation::Declined
    }
}
