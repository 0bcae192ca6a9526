//! Spreadsheet sampling: first-sheet row extraction and header-row
//! location.

use calamine::{open_workbook_auto, Data, Reader};
use pricescout_core::error::{Error, Result};
use pricescout_core::normalize::normalize_label;
use std::path::Path;

/// Labels that identify a header row, across all document kinds.
const HEADER_VOCABULARY: [&str; 10] = [
    "designation",
    "description",
    "libelle",
    "reference",
    "unite",
    "quantite",
    "pu",
    "prix",
    "montant",
    "total",
];

/// Rows considered when locating the header row.
const HEADER_SEARCH_ROWS: usize = 20;

/// A sample of the first sheet, cells stringified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetSample {
    pub rows: Vec<Vec<String>>,
}

impl SheetSample {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Read up to `max_rows` rows of the first sheet of an Excel workbook.
pub fn read_sample(path: &Path, max_rows: usize) -> Result<SheetSample> {
    let file = path.display().to_string();
    let mut workbook =
        open_workbook_auto(path).map_err(|e| Error::sheet(&file, format!("open failed: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::sheet(&file, "workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::sheet(&file, format!("cannot read sheet '{sheet_name}': {e}")))?;

    let rows = range
        .rows()
        .take(max_rows)
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok(SheetSample::new(rows))
}

/// Locate the header row: the first of the leading rows with at least two
/// cells matching the header vocabulary.
pub fn find_header_row(sample: &SheetSample) -> Option<usize> {
    for (idx, row) in sample.rows.iter().take(HEADER_SEARCH_ROWS).enumerate() {
        let hits = row
            .iter()
            .filter(|cell| {
                let label = normalize_label(cell);
                let compact = label.replace(' ', "");
                !label.is_empty()
                    && HEADER_VOCABULARY
                        .iter()
                        .any(|known| label.contains(known) || compact.contains(known))
            })
            .count();
        if hits >= 2 {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rows: &[&[&str]]) -> SheetSample {
        SheetSample::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn header_row_found_after_title_rows() {
        let sample = sample(&[
            &["DPGF - Lot 04 Gros Oeuvre"],
            &[""],
            &["N°", "Désignation", "Unité", "Quantité", "P.U.", "Montant"],
            &["1.1", "Terrassement", "m3", "120", "45.0", "5400"],
        ]);
        assert_eq!(find_header_row(&sample), Some(2));
    }

    #[test]
    fn no_header_row_in_prose() {
        let sample = sample(&[
            &["Compte rendu de chantier"],
            &["Présents", "Absents"],
        ]);
        assert_eq!(find_header_row(&sample), None);
    }

    #[test]
    fn empty_sample_has_no_header() {
        assert_eq!(find_header_row(&SheetSample::default()), None);
    }
}
