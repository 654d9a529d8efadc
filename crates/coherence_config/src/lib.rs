mod error;
mod harness;
mod retry_config;

pub use error::*;
pub use harness::*;
pub use retry_config::*;
