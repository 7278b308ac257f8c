//! Conformance checks for the JPL SBDB close-approach data API.
//!
//! The crate is split the way a run flows: [`http`] issues single GET
//! requests, [`engine`] wraps them in a retrying fetcher and a concurrent load
//! harness, and [`validate`] holds the pure checks applied to fetched bodies.
//! The live suite itself lives in `tests/live_api.rs` and is `#[ignore]`d by
//! default.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http;
pub mod observe;
pub mod validate;

pub use config::SuiteConfig;
pub use engine::{CadFetcher, LoadOptions, RetryPolicy, fetch_with, simulate_cad_load, simulate_load};
pub use error::{CadError, Result};
pub use http::{CadClient, CadQuery};
pub use observe::{Observer, RecordingObserver, TracingObserver};
