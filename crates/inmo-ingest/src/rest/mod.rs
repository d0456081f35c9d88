//! REST loading path
//!
//! Used when the database cannot be reached directly. Rows are sent to the
//! PostgREST-style data API of the hosted project in fixed-size batches.
//!
//! - **endpoints**: URL and header conventions of the data API
//! - **client**: authenticated insert/delete/count calls
//! - **loader**: batching, dry-run planning and fail-fast run loop

pub mod client;
pub mod endpoints;
pub mod loader;

pub use client::RestClient;
pub use loader::{batch_sizes, BatchPlan, RestLoader, RestOptions, RestRun};

/// One row as sent to the API
pub type Row = serde_json::Map<String, serde_json::Value>;
