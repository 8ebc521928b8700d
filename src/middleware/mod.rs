pub mod pii_filter;
pub mod response;

pub use pii_filter::{pii_filter_middleware, AdmittedBatch};
pub use response::{ApiResponse, ApiResult};
