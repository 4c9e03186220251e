//! Turns an incoming [`Request`] into a [`Response`]: builds the service's
//! context, runs its handler, and folds any error (including a panic-style
//! failure surfaced as `Err`) into the envelope. Ported from
//! `ServiceInstance._execute`.

use std::sync::Arc;

use sysinfo::System;

use svclib_context::{Context, Invoker, ServiceContext};
use svclib_core::{Request, Response, ServiceError};
use svclib_store::{Results, Scratch};

use crate::table::ServiceEntry;

fn local_host() -> String {
    System::host_name()
        .unwrap_or_else(|| "localhost".to_string())
        .split('.')
        .next()
        .unwrap_or("localhost")
        .to_string()
}

pub async fn dispatch(
    name: &str,
    entry: &ServiceEntry,
    req: Request,
    results: Arc<dyn Results>,
    scratch: Arc<dyn Scratch>,
    invoker: Arc<dyn Invoker>,
) -> Response {
    let ctx = ServiceContext::new(name, entry.home.clone(), req.clone(), results, scratch, invoker);
    ctx.metadata().start();

    let outcome = {
        let _timer = ctx.metadata().timer("elapsed");
        entry.service.execute(&ctx, &req.args, &req.kwargs).await
    };

    ctx.cleanup().await;
    ctx.metadata().stop();

    let outcome = outcome.map_err(|err| {
        let mut err = err;
        if err.service.is_none() || err.origin.is_none() {
            let service = err.service.clone().unwrap_or_else(|| name.to_string());
            let origin = err.origin.clone().unwrap_or_else(local_host);
            err = err.with_origin(service, origin);
        }
        err
    });

    match outcome {
        Ok(value) => Response::ok(value, ctx.metadata().clone()),
        Err(err) => {
            tracing::info!(service = name, error = %err, "service call failed");
            Response::err(err, ctx.metadata().clone())
        }
    }
}

/// Builds the `BadRequest` response for a request that couldn't even be
/// parsed off the wire.
pub fn bad_request(message: impl Into<String>) -> Response {
    Response::err(ServiceError::bad_request(message), svclib_core::Metadata::unnamed())
}
