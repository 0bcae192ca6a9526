//! Relevance classification for candidate pricing spreadsheets.
//!
//! Decides, from a file's name and optionally a sample of its tabular
//! content, how likely it is to be one of the known pricing-document
//! kinds. Name scoring is always available; content scoring requires a
//! downloaded sample and is only used under deep scan.

#![deny(warnings)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod classifier;
mod profiles;
mod sheet;

pub use classifier::{Classifier, ClassifierConfig, ContentStatus};
pub use profiles::{default_profiles, KindProfile};
pub use sheet::{find_header_row, read_sample, SheetSample};
