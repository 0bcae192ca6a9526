//! Scoring and kind selection.

use crate::profiles::{default_profiles, KindProfile};
use crate::sheet::{find_header_row, SheetSample};
use pricescout_core::error::Result;
use pricescout_core::normalize::{fold, normalize_label};
use pricescout_core::{ClassificationResult, DocumentKind, Error, Evidence, FileDescriptor};
use regex::Regex;
use tracing::debug;

/// Weight of the header-archetype ratio within the content sub-score.
const CONTENT_COLUMN_WEIGHT: f64 = 0.7;
/// Bonus when a kind keyword appears in the sampled cell text.
const CONTENT_KEYWORD_BONUS: f64 = 0.3;

/// Classifier tuning knobs.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Acceptance threshold on the combined confidence
    pub min_confidence: f64,
    /// Weight of the name-based sub-score
    pub name_weight: f64,
    /// Weight of the content-based sub-score
    pub content_weight: f64,
    /// Jaro-Winkler threshold for fuzzy header-archetype matching
    pub fuzzy_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.35,
            name_weight: 0.5,
            content_weight: 0.7,
            fuzzy_threshold: 0.88,
        }
    }
}

/// Availability of tabular content for one classification call.
pub enum ContentStatus<'a> {
    /// Deep scan disabled; score on the name alone
    NotRequested,
    /// Deep scan requested but the sheet could not be parsed; scored on the
    /// name alone and flagged as a soft warning
    Unreadable,
    /// Sampled rows of the first sheet
    Sample(&'a SheetSample),
}

/// Stateless relevance classifier; one instance serves the whole run.
pub struct Classifier {
    profiles: Vec<KindProfile>,
    config: ClassifierConfig,
    lot_pattern: Regex,
}

struct KindScore<'p> {
    profile: &'p KindProfile,
    name_raw: f64,
    content_raw: f64,
    matched_keywords: Vec<String>,
    matched_patterns: Vec<String>,
    header_signature: Option<String>,
}

impl<'p> KindScore<'p> {
    fn combined(&self, config: &ClassifierConfig) -> f64 {
        clamp01(config.name_weight * self.name_raw + config.content_weight * self.content_raw)
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        Self::with_profiles(default_profiles()?, config)
    }

    pub fn with_profiles(profiles: Vec<KindProfile>, config: ClassifierConfig) -> Result<Self> {
        let lot_pattern = Regex::new(r"lot[\s_-]*(\d+)")
            .map_err(|e| Error::classification(format!("bad lot pattern: {e}")))?;
        Ok(Self {
            profiles,
            config,
            lot_pattern,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one descriptor, optionally with sampled sheet content.
    pub fn classify(
        &self,
        descriptor: &FileDescriptor,
        content: ContentStatus<'_>,
    ) -> ClassificationResult {
        let folded_name = fold(&descriptor.name);
        let content_unreadable = matches!(&content, ContentStatus::Unreadable);
        let sample = match content {
            ContentStatus::Sample(s) if !s.is_empty() => Some(s),
            _ => None,
        };

        let header_labels = sample.and_then(|s| {
            find_header_row(s).map(|idx| {
                let raw = s.rows[idx].clone();
                let normalized: Vec<String> = raw.iter().map(|c| normalize_label(c)).collect();
                (raw, normalized)
            })
        });
        let sample_text = sample.map(|s| {
            let mut text = String::new();
            for row in &s.rows {
                for cell in row {
                    text.push(' ');
                    text.push_str(&fold(cell));
                }
            }
            text
        });

        let mut scores: Vec<KindScore<'_>> = self
            .profiles
            .iter()
            .map(|profile| self.score_kind(profile, &folded_name, &header_labels, &sample_text))
            .collect();

        if scores.is_empty() {
            return ClassificationResult {
                descriptor: descriptor.clone(),
                document_kind: DocumentKind::Unknown,
                confidence: 0.0,
                name_score: 0.0,
                content_score: 0.0,
                evidence: Evidence {
                    lot_hint: self.lot_hint(&folded_name),
                    content_unreadable,
                    ..Evidence::default()
                },
            };
        }

        // Highest combined score wins; ties go to the kind with more
        // matched patterns, then to profile order.
        scores.sort_by(|a, b| {
            b.combined(&self.config)
                .total_cmp(&a.combined(&self.config))
                .then_with(|| b.matched_patterns.len().cmp(&a.matched_patterns.len()))
        });

        let best = &scores[0];
        let confidence = best.combined(&self.config);

        let (document_kind, evidence, name_score, content_score) = if confidence > 0.0 {
            (
                best.profile.kind,
                Evidence {
                    keywords: best.matched_keywords.clone(),
                    patterns: best.matched_patterns.clone(),
                    header_signature: best.header_signature.clone(),
                    lot_hint: self.lot_hint(&folded_name),
                    content_unreadable,
                },
                best.name_raw,
                best.content_raw,
            )
        } else {
            (
                DocumentKind::Unknown,
                Evidence {
                    lot_hint: self.lot_hint(&folded_name),
                    content_unreadable,
                    ..Evidence::default()
                },
                0.0,
                0.0,
            )
        };

        debug!(
            file = %descriptor.path,
            kind = %document_kind,
            confidence,
            name_score,
            content_score,
            "Classified file"
        );

        ClassificationResult {
            descriptor: descriptor.clone(),
            document_kind,
            confidence,
            name_score,
            content_score,
            evidence,
        }
    }

    /// True when the result clears the acceptance threshold.
    pub fn accepts(&self, result: &ClassificationResult) -> bool {
        result.document_kind != DocumentKind::Unknown
            && result.confidence >= self.config.min_confidence
    }

    fn score_kind<'p>(
        &self,
        profile: &'p KindProfile,
        folded_name: &str,
        header_labels: &Option<(Vec<String>, Vec<String>)>,
        sample_text: &Option<String>,
    ) -> KindScore<'p> {
        let matched_keywords: Vec<String> = profile
            .keywords
            .iter()
            .filter(|kw| folded_name.contains(kw.as_str()))
            .cloned()
            .collect();
        let matched_patterns: Vec<String> = profile
            .patterns
            .iter()
            .filter(|p| p.is_match(folded_name))
            .map(|p| p.as_str().to_string())
            .collect();

        let mut name_raw = 0.0;
        if !matched_keywords.is_empty() {
            name_raw += 0.5;
        }
        if !matched_patterns.is_empty() {
            name_raw += 0.5;
        }

        let mut content_raw = 0.0;
        let mut header_signature = None;
        if let Some((raw_labels, normalized_labels)) = header_labels {
            let best_ratio = profile
                .header_archetypes
                .iter()
                .map(|archetype| self.archetype_ratio(archetype, normalized_labels))
                .fold(0.0_f64, f64::max);
            content_raw += CONTENT_COLUMN_WEIGHT * best_ratio;
            if best_ratio >= 0.5 {
                header_signature = Some(
                    raw_labels
                        .iter()
                        .filter(|c| !c.trim().is_empty())
                        .cloned()
                        .collect::<Vec<_>>()
                        .join("|"),
                );
            }
        }
        if let Some(text) = sample_text {
            if profile.keywords.iter().any(|kw| text.contains(kw.as_str())) {
                content_raw += CONTENT_KEYWORD_BONUS;
            }
        }
        content_raw = clamp01(content_raw);

        KindScore {
            profile,
            name_raw,
            content_raw,
            matched_keywords,
            matched_patterns,
            header_signature,
        }
    }

    /// Fraction of archetype labels found among the header labels.
    fn archetype_ratio(&self, archetype: &[&str], labels: &[String]) -> f64 {
        if archetype.is_empty() {
            return 0.0;
        }
        let found = archetype
            .iter()
            .filter(|expected| {
                labels.iter().any(|label| {
                    !label.is_empty()
                        && (label.contains(*expected)
                            // abbreviations like `P.U.` normalize to `p u`
                            || label.replace(' ', "").contains(*expected)
                            || strsim::jaro_winkler(label, expected) >= self.config.fuzzy_threshold)
                })
            })
            .count();
        found as f64 / archetype.len() as f64
    }

    fn lot_hint(&self, folded_name: &str) -> Option<String> {
        self.lot_pattern
            .captures(folded_name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor(name: &str) -> FileDescriptor {
        FileDescriptor {
            id: format!("/files/{name}"),
            path: format!("/files/{name}"),
            name: name.to_string(),
            folder_path: "/files".to_string(),
            extension: FileDescriptor::extension_of(name),
            size: 1024,
            modified_at: None,
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn dpgf_lot_file_scores_keyword_and_pattern() {
        let result = classifier().classify(
            &descriptor("DPGF Lot 04 - Gros Oeuvre.xlsx"),
            ContentStatus::NotRequested,
        );

        assert_eq!(result.document_kind, DocumentKind::PricingBreakdown);
        assert_eq!(result.name_score, 1.0);
        // name contribution alone must reach the 0.5 weighted floor
        assert!(result.confidence >= 0.5);
        assert!(result.evidence.keywords.contains(&"dpgf".to_string()));
        assert!(!result.evidence.patterns.is_empty());
        assert_eq!(result.evidence.lot_hint.as_deref(), Some("04"));
    }

    #[test]
    fn unrelated_file_is_unknown() {
        let result = classifier().classify(
            &descriptor("Compte rendu réunion.xlsx"),
            ContentStatus::NotRequested,
        );
        assert_eq!(result.document_kind, DocumentKind::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn content_sample_raises_confidence() {
        let c = classifier();
        let desc = descriptor("Lot 4 annexe.xlsx");

        let name_only = c.classify(&desc, ContentStatus::NotRequested);

        let sample = SheetSample::new(vec![
            vec!["DPGF".to_string()],
            vec![
                "Désignation".to_string(),
                "Unité".to_string(),
                "Quantité".to_string(),
                "P.U.".to_string(),
                "Montant".to_string(),
            ],
        ]);
        let with_content = c.classify(&desc, ContentStatus::Sample(&sample));

        assert_eq!(with_content.document_kind, DocumentKind::PricingBreakdown);
        assert!(with_content.confidence > name_only.confidence);
        assert!(with_content.evidence.header_signature.is_some());
        assert_eq!(with_content.content_score, 1.0);
    }

    #[test]
    fn unreadable_content_is_soft() {
        let result = classifier().classify(
            &descriptor("BPU Lot 2.xlsx"),
            ContentStatus::Unreadable,
        );
        assert_eq!(result.document_kind, DocumentKind::UnitPriceSchedule);
        assert_eq!(result.content_score, 0.0);
        assert!(result.evidence.content_unreadable);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn acceptance_is_monotonic_in_threshold() {
        let names = [
            "DPGF Lot 04 - Gros Oeuvre.xlsx",
            "bpu.xlsx",
            "Planning.xlsx",
            "dqe lot 12.xlsx",
            "Photos chantier.xlsx",
        ];

        let lenient = Classifier::new(ClassifierConfig {
            min_confidence: 0.2,
            ..ClassifierConfig::default()
        })
        .unwrap();
        let strict = Classifier::new(ClassifierConfig {
            min_confidence: 0.45,
            ..ClassifierConfig::default()
        })
        .unwrap();

        let accepted = |c: &Classifier| -> Vec<String> {
            names
                .iter()
                .map(|n| c.classify(&descriptor(n), ContentStatus::NotRequested))
                .filter(|r| c.accepts(r))
                .map(|r| r.descriptor.name)
                .collect()
        };

        let at_lenient = accepted(&lenient);
        let at_strict = accepted(&strict);
        for name in &at_strict {
            assert!(at_lenient.contains(name), "{name} accepted only at t2");
        }
    }

    #[test]
    fn ties_break_toward_more_matched_patterns() {
        let profiles = vec![
            KindProfile {
                kind: DocumentKind::PricingBreakdown,
                keywords: vec!["annexe".to_string()],
                patterns: Vec::new(),
                header_archetypes: Vec::new(),
            },
            KindProfile {
                kind: DocumentKind::QuantityEstimate,
                keywords: Vec::new(),
                patterns: vec![Regex::new(r"annexe\s*\d+").unwrap()],
                header_archetypes: Vec::new(),
            },
        ];
        let c = Classifier::with_profiles(profiles, ClassifierConfig::default()).unwrap();

        // both kinds score 0.5 on the name; the pattern match wins the tie
        let result = c.classify(&descriptor("annexe 3.xlsx"), ContentStatus::NotRequested);
        assert_eq!(result.document_kind, DocumentKind::QuantityEstimate);
    }
}
