//! Column mappings: header row → semantic fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic fields a spreadsheet column can map to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Designation,
    Unit,
    Quantity,
    UnitPrice,
    TotalPrice,
}

impl SemanticField {
    pub const ALL: [SemanticField; 5] = [
        SemanticField::Designation,
        SemanticField::Unit,
        SemanticField::Quantity,
        SemanticField::UnitPrice,
        SemanticField::TotalPrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::Designation => "designation",
            SemanticField::Unit => "unit",
            SemanticField::Quantity => "quantity",
            SemanticField::UnitPrice => "unit_price",
            SemanticField::TotalPrice => "total_price",
        }
    }
}

impl std::fmt::Display for SemanticField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence tier assigned by automatic detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingConfidence {
    High,
    Medium,
    Low,
}

/// How a persisted mapping came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingProvenance {
    AutoDetected,
    OperatorConfirmed,
}

/// A persisted mapping from semantic field to column index, keyed by the
/// structural hash of the header row it was derived from.
///
/// Entries are never silently overwritten: only an operator confirmation
/// replaces the mapping stored under a given hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Structural hash of the normalized, order-preserving header labels
    pub header_hash: String,
    /// Semantic field → zero-based column index
    pub columns: BTreeMap<SemanticField, usize>,
    pub confidence: MappingConfidence,
    pub provenance: MappingProvenance,
}

impl ColumnMapping {
    /// True when the mapping can be auto-reused without confirmation.
    pub fn reusable(&self) -> bool {
        self.confidence == MappingConfidence::High
            || self.provenance == MappingProvenance::OperatorConfirmed
    }
}
