pub mod config;
pub mod error;
pub mod types;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use types::{now_rfc3339, unix_now};
