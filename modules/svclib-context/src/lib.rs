//! Call contexts: the state threaded through a dispatch, on both the
//! client side (a call about to go out) and the service side (a call
//! being handled).

pub mod client_context;
pub mod context;
pub mod invoker;
pub mod service;
pub mod service_context;

pub use client_context::ClientContext;
pub use context::{default_uid, Context};
pub use invoker::Invoker;
pub use service::Service;
pub use service_context::ServiceContext;
