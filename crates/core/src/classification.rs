//! Classification results for candidate pricing documents.

use crate::descriptor::FileDescriptor;
use serde::{Deserialize, Serialize};

/// The closed set of pricing-document kinds the classifier can assign.
///
/// In the source corpus these correspond to the French procurement forms
/// DPGF (lump-sum price breakdown), BPU (unit price schedule), and DQE
/// (quantity estimate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    PricingBreakdown,
    UnitPriceSchedule,
    QuantityEstimate,
    Unknown,
}

impl DocumentKind {
    /// The kinds the classifier actively scores (everything but `Unknown`).
    pub const DETECTABLE: [DocumentKind; 3] = [
        DocumentKind::PricingBreakdown,
        DocumentKind::UnitPriceSchedule,
        DocumentKind::QuantityEstimate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::PricingBreakdown => "PRICING_BREAKDOWN",
            DocumentKind::UnitPriceSchedule => "UNIT_PRICE_SCHEDULE",
            DocumentKind::QuantityEstimate => "QUANTITY_ESTIMATE",
            DocumentKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trail of what the classifier matched, kept for the RunReport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Keywords matched against the folded file name
    pub keywords: Vec<String>,
    /// Regex patterns matched against the folded file name
    pub patterns: Vec<String>,
    /// Header row labels that matched a column archetype, joined with `|`
    pub header_signature: Option<String>,
    /// Lot number extracted from the file name, when present
    pub lot_hint: Option<String>,
    /// Set when content scoring was requested but the sheet was unreadable
    pub content_unreadable: bool,
}

/// Result of classifying one file descriptor.
///
/// `confidence` is derived from at most two weighted sub-scores: the
/// name-based score (always computed) and the content-based score (only
/// when deep scan supplied a content sample).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub descriptor: FileDescriptor,
    pub document_kind: DocumentKind,
    /// Combined confidence in [0, 1]
    pub confidence: f64,
    /// Name-based sub-score in [0, 1], before weighting
    pub name_score: f64,
    /// Content-based sub-score in [0, 1], before weighting; 0.0 when no
    /// content was available
    pub content_score: f64,
    pub evidence: Evidence,
}
