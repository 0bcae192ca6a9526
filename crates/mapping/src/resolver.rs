//! Automatic mapping detection with operator fallback.

use crate::confirm::{ConfirmMapping, Confirmation};
use crate::hash::header_hash;
use crate::store::MappingStore;
use pricescout_core::error::Result;
use pricescout_core::normalize::normalize_label;
use pricescout_core::{ColumnMapping, MappingConfidence, MappingProvenance, SemanticField};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keywords recognized per semantic field, matched against normalized
/// labels. Short keywords match exactly; longer ones as substrings, with a
/// fuzzy fallback.
fn field_keywords(field: SemanticField) -> &'static [&'static str] {
    match field {
        SemanticField::Designation => {
            &["designation", "description", "libelle", "intitule", "ouvrage"]
        }
        SemanticField::Unit => &["unite", "un", "u"],
        SemanticField::Quantity => &["quantite", "qte", "qt"],
        SemanticField::UnitPrice => &["prix unitaire", "prix unit", "prix u", "pu"],
        SemanticField::TotalPrice => &["montant", "prix total", "total"],
    }
}

/// What automatic detection produced, before any confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMapping {
    pub columns: BTreeMap<SemanticField, usize>,
    pub confidence: MappingConfidence,
    /// Fields that matched more than one column, or columns claimed by
    /// more than one field
    pub ambiguous_fields: Vec<SemanticField>,
}

/// A mapping ready for use by the import path.
#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    pub mapping: ColumnMapping,
    /// The mapping proceeds unconfirmed below HIGH; every record ingested
    /// under it must be surfaced as a warning in the run report
    pub low_confidence: bool,
    /// Served straight from the persisted store
    pub reused: bool,
    /// The confirmation port was invoked for this resolution
    pub prompted: bool,
}

/// Resolves header rows to column mappings, consulting the persisted store
/// first and the confirmation port when detection is uncertain.
pub struct MappingResolver {
    store: Arc<dyn MappingStore>,
    confirm: Arc<dyn ConfirmMapping>,
    fuzzy_threshold: f64,
}

impl MappingResolver {
    pub fn new(
        store: Arc<dyn MappingStore>,
        confirm: Arc<dyn ConfirmMapping>,
        fuzzy_threshold: f64,
    ) -> Self {
        Self {
            store,
            confirm,
            fuzzy_threshold,
        }
    }

    /// Resolve a header row to a mapping.
    ///
    /// Never blocks ingestion: when neither the store nor the operator can
    /// supply a confident mapping, the best candidate proceeds flagged as
    /// low-confidence.
    pub fn resolve(&self, file: &Path, headers: &[String]) -> Result<ResolvedMapping> {
        let hash = header_hash(headers);

        if let Some(existing) = self.store.get(&hash) {
            if existing.reusable() {
                debug!(hash = %hash, "Reusing persisted column mapping");
                return Ok(ResolvedMapping {
                    mapping: existing,
                    low_confidence: false,
                    reused: true,
                    prompted: false,
                });
            }
        }

        let candidate = self.detect(headers);

        if candidate.confidence == MappingConfidence::High {
            let mapping = ColumnMapping {
                header_hash: hash,
                columns: candidate.columns,
                confidence: MappingConfidence::High,
                provenance: MappingProvenance::AutoDetected,
            };
            self.store.put(mapping.clone())?;
            info!(hash = %mapping.header_hash, "Auto-detected column mapping (HIGH)");
            return Ok(ResolvedMapping {
                mapping,
                low_confidence: false,
                reused: false,
                prompted: false,
            });
        }

        match self.confirm.confirm(file, headers, &candidate) {
            Confirmation::Accepted(columns) => {
                let mapping = ColumnMapping {
                    header_hash: hash,
                    columns,
                    confidence: MappingConfidence::High,
                    provenance: MappingProvenance::OperatorConfirmed,
                };
                self.store.put(mapping.clone())?;
                info!(hash = %mapping.header_hash, "Operator confirmed column mapping");
                Ok(ResolvedMapping {
                    mapping,
                    low_confidence: false,
                    reused: false,
                    prompted: true,
                })
            }
            Confirmation::Declined => {
                warn!(
                    file = %file.display(),
                    confidence = ?candidate.confidence,
                    "Proceeding with unconfirmed column mapping"
                );
                let mapping = ColumnMapping {
                    header_hash: hash,
                    columns: candidate.columns,
                    confidence: candidate.confidence,
                    provenance: MappingProvenance::AutoDetected,
                };
                // Keep the auto-detected entry for audit, but never clobber
                // an existing entry without operator confirmation.
                if self.store.get(&mapping.header_hash).is_none() {
                    self.store.put(mapping.clone())?;
                }
                Ok(ResolvedMapping {
                    mapping,
                    low_confidence: true,
                    reused: false,
                    prompted: true,
                })
            }
        }
    }

    /// Keyword/fuzzy detection over the normalized header labels.
    pub fn detect(&self, headers: &[String]) -> CandidateMapping {
        let labels: Vec<String> = headers.iter().map(|h| normalize_label(h)).collect();

        let mut columns = BTreeMap::new();
        let mut ambiguous_fields = Vec::new();
        let mut claimed: BTreeMap<usize, SemanticField> = BTreeMap::new();

        for field in SemanticField::ALL {
            let matches: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, label)| self.label_matches_field(label, field))
                .map(|(idx, _)| idx)
                .collect();

            if matches.len() > 1 {
                ambiguous_fields.push(field);
            }

            // prefer the first column not already claimed by another field
            let chosen = matches
                .iter()
                .copied()
                .find(|idx| !claimed.contains_key(idx))
                .or_else(|| {
                    if let Some(first) = matches.first() {
                        // the column is contested between two fields
                        if !ambiguous_fields.contains(&field) {
                            ambiguous_fields.push(field);
                        }
                        Some(*first)
                    } else {
                        None
                    }
                });

            if let Some(idx) = chosen {
                claimed.entry(idx).or_insert(field);
                columns.insert(field, idx);
            }
        }

        let matched = columns.len();
        let required = SemanticField::ALL.len();
        let confidence = if matched == required && ambiguous_fields.is_empty() {
            MappingConfidence::High
        } else if matched * 2 >= required {
            MappingConfidence::Medium
        } else {
            MappingConfidence::Low
        };

        CandidateMapping {
            columns,
            confidence,
            ambiguous_fields,
        }
    }

    fn label_matches_field(&self, label: &str, field: SemanticField) -> bool {
        if label.is_empty() {
            return false;
        }
        let compact = label.replace(' ', "");
        field_keywords(field).iter().any(|keyword| {
            if label == *keyword || compact == keyword.replace(' ', "") {
                return true;
            }
            if keyword.len() >= 3
                && (label.contains(keyword) || compact.contains(&keyword.replace(' ', "")))
            {
                return true;
            }
            keyword.len() >= 4 && strsim::jaro_winkler(label, keyword) >= self.fuzzy_threshold
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::confirm::AutoDeclineConfirm;
    use crate::store::InMemoryMappingStore;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn headers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn resolver_with(
        store: Arc<dyn MappingStore>,
        confirm: Arc<dyn ConfirmMapping>,
    ) -> MappingResolver {
        MappingResolver::new(store, confirm, 0.88)
    }

    /// Confirmation stub that accepts the candidate as-is and counts calls.
    struct CountingAccept {
        calls: AtomicUsize,
    }

    impl CountingAccept {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ConfirmMapping for CountingAccept {
        fn confirm(
            &self,
            _file: &Path,
            _headers: &[String],
            candidate: &CandidateMapping,
        ) -> Confirmation {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Confirmation::Accepted(candidate.columns.clone())
        }
    }

    #[test]
    fn clean_headers_detect_high() {
        let resolver = resolver_with(
            Arc::new(InMemoryMappingStore::new()),
            Arc::new(AutoDeclineConfirm),
        );
        let candidate = resolver.detect(&headers(&[
            "N°",
            "Désignation",
            "Unité",
            "Quantité",
            "Prix Unitaire",
            "Montant",
        ]));

        assert_eq!(candidate.confidence, MappingConfidence::High);
        assert_eq!(candidate.columns.get(&SemanticField::Designation), Some(&1));
        assert_eq!(candidate.columns.get(&SemanticField::Unit), Some(&2));
        assert_eq!(candidate.columns.get(&SemanticField::Quantity), Some(&3));
        assert_eq!(candidate.columns.get(&SemanticField::UnitPrice), Some(&4));
        assert_eq!(candidate.columns.get(&SemanticField::TotalPrice), Some(&5));
    }

    #[test]
    fn opaque_headers_detect_low() {
        let resolver = resolver_with(
            Arc::new(InMemoryMappingStore::new()),
            Arc::new(AutoDeclineConfirm),
        );
        let candidate = resolver.detect(&headers(&["Col1", "Col2", "Col3", "Col4"]));
        assert_eq!(candidate.confidence, MappingConfidence::Low);
        assert!(candidate.columns.is_empty());
    }

    #[test]
    fn high_detection_persists_without_prompt() {
        let store: Arc<dyn MappingStore> = Arc::new(InMemoryMappingStore::new());
        let confirm = Arc::new(CountingAccept::new());
        let resolver = resolver_with(store.clone(), confirm.clone());

        let hdrs = headers(&["Désignation", "Unité", "Quantité", "P.U.", "Montant"]);
        let resolved = resolver.resolve(Path::new("a.xlsx"), &hdrs).unwrap();

        assert!(!resolved.prompted);
        assert!(!resolved.low_confidence);
        assert_eq!(store.len(), 1);
        assert_eq!(confirm.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resolution_is_idempotent_after_persistence() {
        let store: Arc<dyn MappingStore> = Arc::new(InMemoryMappingStore::new());
        let confirm = Arc::new(CountingAccept::new());
        let resolver = resolver_with(store.clone(), confirm.clone());

        // ambiguous enough to require confirmation
        let hdrs = headers(&["Description", "Qté", "Total"]);
        let first = resolver.resolve(Path::new("a.xlsx"), &hdrs).unwrap();
        assert!(first.prompted);
        assert_eq!(confirm.calls.load(Ordering::SeqCst), 1);

        let second = resolver.resolve(Path::new("b.xlsx"), &hdrs).unwrap();
        assert!(second.reused);
        assert!(!second.prompted);
        assert_eq!(second.mapping, first.mapping);
        // no re-prompt for the same header shape
        assert_eq!(confirm.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn declined_confirmation_proceeds_tagged() {
        let store: Arc<dyn MappingStore> = Arc::new(InMemoryMappingStore::new());
        let resolver = resolver_with(store.clone(), Arc::new(AutoDeclineConfirm));

        let hdrs = headers(&["Description", "Qté", "Total"]);
        let resolved = resolver.resolve(Path::new("a.xlsx"), &hdrs).unwrap();

        assert!(resolved.low_confidence);
        assert_eq!(
            resolved.mapping.provenance,
            MappingProvenance::AutoDetected
        );
        // unconfirmed entries are kept for audit but are not reusable
        let again = resolver.resolve(Path::new("a.xlsx"), &hdrs).unwrap();
        assert!(!again.reused);
        assert!(again.low_confidence);
    }

    #[test]
    fn ambiguous_duplicate_columns_are_not_high() {
        let resolver = resolver_with(
            Arc::new(InMemoryMappingStore::new()),
            Arc::new(AutoDeclineConfirm),
        );
        let candidate = resolver.detect(&headers(&[
            "Désignation",
            "Désignation",
            "Unité",
            "Quantité",
            "P.U.",
            "Montant",
        ]));
        assert_ne!(candidate.confidence, MappingConfidence::High);
        assert!(candidate
            .ambiguous_fields
            .contains(&SemanticField::Designation));
    }
}
