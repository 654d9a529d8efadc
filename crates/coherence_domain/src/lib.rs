mod backend;
mod context;
mod conversation;
mod error;
mod finding;
mod metrics;
mod persona;
mod result;
mod scenario;
mod taxonomy;

pub use backend::*;
pub use context::*;
pub use conversation::*;
pub use error::*;
pub use finding::*;
pub use metrics::*;
pub use persona::*;
pub use result::*;
pub use scenario::*;
pub use taxonomy::*;
