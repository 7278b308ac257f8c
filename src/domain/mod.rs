mod load_types;
mod types;

pub use load_types::*;
pub use types::*;
