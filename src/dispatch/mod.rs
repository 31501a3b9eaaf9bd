//! Throttled, strictly sequential dispatch of knowledge-base lookups.
//!
//! - [`Throttle`] - minimum spacing between the start of consecutive calls
//! - [`Dispatcher`] - runs batch plans and per-request lookups, isolating
//!   per-call failures

mod dispatcher;
mod throttle;

pub use dispatcher::Dispatcher;
pub use throttle::Throttle;
