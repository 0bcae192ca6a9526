//! Per-kind keyword sets, file-name patterns, and header archetypes.
//!
//! Keyword and pattern defaults come from the naming conventions of French
//! procurement pricing documents (DPGF, BPU, DQE); header archetypes are
//! the column shapes those documents conventionally carry.

use pricescout_core::error::{Error, Result};
use pricescout_core::DocumentKind;
use regex::Regex;

/// Matching profile for one document kind.
pub struct KindProfile {
    pub kind: DocumentKind,
    /// Folded keywords matched as substrings of the folded file name
    pub keywords: Vec<String>,
    /// Patterns matched against the folded file name
    pub patterns: Vec<Regex>,
    /// Alternative sets of expected header labels; the content score uses
    /// the best-matching set
    pub header_archetypes: Vec<Vec<&'static str>>,
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| Error::classification(format!("bad pattern '{p}': {e}")))
        })
        .collect()
}

/// Built-in profiles for the three detectable kinds.
pub fn default_profiles() -> Result<Vec<KindProfile>> {
    Ok(vec![
        KindProfile {
            kind: DocumentKind::PricingBreakdown,
            keywords: [
                "dpgf",
                "decomposition du prix global",
                "prix global et forfaitaire",
                "forfaitaire",
                "decomposition des prix",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            patterns: compile(&[
                r"dpgf[-_ ]*lot[-_ ]?\d+",
                r"lot[-_ ]?\d+[-_ ]*dpgf",
                r"dpgf.*\d{2,4}",
            ])?,
            header_archetypes: vec![
                vec!["designation", "quantite", "prix", "montant"],
                vec!["designation", "unite", "quantite", "pu", "montant"],
                vec!["description", "quantite", "prix", "total"],
            ],
        },
        KindProfile {
            kind: DocumentKind::UnitPriceSchedule,
            keywords: [
                "bpu",
                "bordereau des prix",
                "bordereau de prix",
                "prix unitaires",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            patterns: compile(&[
                r"bpu[-_ ]*lot[-_ ]?\d+",
                r"lot[-_ ]?\d+[-_ ]*bpu",
                r"bpu.*\d{2,4}",
            ])?,
            header_archetypes: vec![
                vec!["designation", "unite", "prix"],
                vec!["description", "unite", "pu"],
                vec!["reference", "libelle", "unite", "prix"],
            ],
        },
        KindProfile {
            kind: DocumentKind::QuantityEstimate,
            keywords: [
                "dqe",
                "detail quantitatif",
                "quantitatif estimatif",
                "detail estimatif",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            patterns: compile(&[
                r"dqe[-_ ]*lot[-_ ]?\d+",
                r"lot[-_ ]?\d+[-_ ]*dqe",
                r"dqe.*\d{2,4}",
            ])?,
            header_archetypes: vec![
                vec!["designation", "quantite", "prix", "montant"],
                vec!["designation", "unite", "quantite", "pu", "total"],
                vec!["reference", "description", "quantite", "pu", "montant"],
            ],
        },
    ])
}
