pub mod fetch;
pub mod load;
pub mod retry;

pub use fetch::{CadFetcher, expect_status, fetch_with};
pub use load::{LoadOptions, simulate_cad_load, simulate_load};
pub use retry::RetryPolicy;
