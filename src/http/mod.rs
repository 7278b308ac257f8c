pub mod client;
pub mod request;
pub mod response;

pub use client::CadClient;
pub use request::CadQuery;
pub use response::ApiResponse;
