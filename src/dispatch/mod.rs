//! Request dispatch: the path from a validated chat request to a reply.
//!
//! - `dispatcher`: validation, cache lookup, backend call with deadline,
//!   cache fill and failure classification.
//! - `coalesce`: sharing one upstream call between concurrent misses.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod coalesce;
mod dispatcher;

pub use coalesce::{CallFailure, InFlight};
pub use dispatcher::Dispatcher;
