mod error;
mod openai;
mod request;
mod response;

pub use error::*;
pub use openai::*;
