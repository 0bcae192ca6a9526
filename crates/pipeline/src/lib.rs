//! The pricescout pipeline: remote tree walking, batch planning, bounded
//! downloading with guaranteed cleanup, import dispatch, and the run
//! orchestrator that drives them batch by batch.

#![deny(warnings)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod cancel;
mod checkpoint;
mod download;
mod orchestrator;
mod planner;
mod walker;

pub use cancel::CancelFlag;
pub use checkpoint::Checkpoint;
pub use download::{BatchDownload, DownloadManager, DownloadSettings, FileFetch};
pub use orchestrator::Orchestrator;
pub use planner::{plan, plan_fingerprint};
pub use walker::{walk_tree, WalkerConfig, EXCEL_EXTENSIONS};
