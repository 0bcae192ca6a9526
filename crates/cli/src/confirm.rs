//! Interactive mapping confirmation via terminal prompts.

use dialoguer::{Confirm, Input};
use pricescout_core::SemanticField;
use pricescout_mapping::{CandidateMapping, ConfirmMapping, Confirmation};
use std::collections::BTreeMap;
use std::path::Path;

/// Asks the operator to confirm or correct an uncertain candidate mapping.
/// Any prompt failure (e.g. no TTY) declines, so ingestion is never
/// blocked.
pub struct DialoguerConfirm;

impl ConfirmMapping for DialoguerConfirm {
    fn confirm(
        &self,
        file: &Path,
        headers: &[String],
        candidate: &CandidateMapping,
    ) -> Confirmation {
        println!();
        println!(
            "Column mapping for {} needs confirmation ({:?}):",
            file.display(),
            candidate.confidence
        );
        for (i, header) in headers.iter().enumerate() {
            println!("  {i}: {header}");
        }
        println!("Enter a column index per field, or leave empty to skip it.");

        let mut columns = BTreeMap::new();
        for field in SemanticField::ALL {
            let suggested = candidate
                .columns
                .get(&field)
                .map(|i| i.to_string())
                .unwrap_or_default();
            let answer: String = match Input::new()
                .with_prompt(format!("{field}"))
                .with_initial_text(suggested)
                .allow_empty(true)
                .interact_text()
            {
                Ok(answer) => answer,
                Err(_) => return Confirmation::Declined,
            };
            if let Ok(idx) = answer.trim().parse::<usize>() {
                if idx < headers.len() {
                    columns.insert(field, idx);
                } else {
                    println!("  index {idx} out of range, skipping {field}");
                }
            }
        }

        match Confirm::new()
            .with_prompt("Use this mapping?")
            .default(true)
            .interact()
        {
            Ok(true) => Confirmation::Accepted(columns),
            _ => Confirmation::Declined,
        }
    }
}
