//! Structural hashing of header rows.

use pricescout_core::normalize::normalize_label;
use twox_hash::XxHash3_128;

/// Hash the normalized, order-preserving list of header labels.
///
/// Two header rows that differ only in case, accents, or punctuation hash
/// identically; reordering or renaming a column changes the hash.
pub fn header_hash(labels: &[String]) -> String {
    let joined = labels
        .iter()
        .map(|l| normalize_label(l))
        .collect::<Vec<_>>()
        .join("|");
    format!("hdr-{:032x}", XxHash3_128::oneshot(joined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hash_ignores_case_and_accents() {
        let a = header_hash(&labels(&["Désignation", "Unité", "P.U."]));
        let b = header_hash(&labels(&["designation", "UNITE", "p u"]));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_order_sensitive() {
        let a = header_hash(&labels(&["designation", "unite"]));
        let b = header_hash(&labels(&["unite", "designation"]));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_distinguishes_different_labels() {
        let a = header_hash(&labels(&["designation", "quantite"]));
        let b = header_hash(&labels(&["designation", "montant"]));
        assert_ne!(a, b);
    }
}
