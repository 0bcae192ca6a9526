//! Remote document store access for the pricescout pipeline.
//!
//! Provides the [`RemoteStore`] trait the walker and download manager are
//! written against, a Graph-style HTTP implementation, a local-directory
//! implementation, and an in-memory mock for tests. Authentication/token
//! lifecycle belongs to the collaborator; this crate only classifies
//! per-call errors as retryable or fatal.

#![deny(warnings)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod http;
mod local;
mod mock;
mod retry;
mod store;

pub use error::RemoteError;
pub use http::{GraphDriveStore, StaticTokenSource, TokenSource};
pub use local::LocalDirStore;
pub use mock::MockRemoteStore;
pub use retry::{with_retry, RetryPolicy};
pub use store::{RemoteEntry, RemoteStore};
