//! Client side of a service call: resolve a name to a worker URL, POST the
//! request, and hand back a handle that can be waited on (possibly more
//! than once, possibly after a prior wait timed out).

pub mod broker;
pub mod call;
pub mod check;

pub use broker::Broker;
pub use call::ClientCall;
pub use check::check_args;
