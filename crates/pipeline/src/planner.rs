//! Deterministic greedy batch planning.

use pricescout_core::{Batch, ClassificationResult};
use twox_hash::XxHash3_128;

/// Group accepted results into batches bounded by count and cumulative
/// declared size.
///
/// Results are ordered by descending confidence (ties by path) so the
/// highest-value files are processed and persisted earliest; the ordering
/// is stable, making batch boundaries reproducible for resume. A single
/// file larger than `max_bytes` gets a batch of its own.
pub fn plan(
    mut accepted: Vec<ClassificationResult>,
    max_count: usize,
    max_bytes: u64,
) -> Vec<Batch> {
    accepted.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.descriptor.path.cmp(&b.descriptor.path))
    });

    let mut batches = Vec::new();
    let mut current: Vec<ClassificationResult> = Vec::new();
    let mut current_bytes: u64 = 0;

    for result in accepted {
        let size = result.descriptor.size;
        let fits = current.len() < max_count && current_bytes + size <= max_bytes;
        if !current.is_empty() && !fits {
            batches.push(Batch::new(batches.len(), std::mem::take(&mut current)));
            current_bytes = 0;
        }
        current_bytes += size;
        current.push(result);
    }
    if !current.is_empty() {
        batches.push(Batch::new(batches.len(), current));
    }
    batches
}

/// Stable fingerprint of a plan's file identities, stored in the
/// checkpoint so a resume against changed remote content can be detected.
pub fn plan_fingerprint(batches: &[Batch]) -> String {
    let mut joined = String::new();
    for batch in batches {
        for file in &batch.files {
            joined.push_str(&file.descriptor.id);
            joined.push('\n');
        }
    }
    format!("{:032x}", XxHash3_128::oneshot(joined.as_bytes()))
}
