mod aggregator;
mod detector;
mod evaluation;
mod executor;
mod retry;
mod runner;
mod store;

#[cfg(test)]
mod mock;

pub use aggregator::*;
pub use detector::*;
pub use evaluation::*;
pub use executor::*;
pub use retry::*;
pub use runner::*;
pub use store::*;
