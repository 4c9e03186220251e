//! Sample services exercising every corner of `svclib-context`: a plain
//! function call, a raised error, a spawned subprocess, cache control,
//! and a stateful instance. Grounded on `samples/*.py` in the original
//! `servicelib` tree.

pub mod cache_demo;
pub mod counters;
pub mod df;
pub mod dump_request;
pub mod greetings;
pub mod hello;
pub mod proxy;
pub mod raise;
pub mod sleep;
pub mod tar;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use svclib_context::{Invoker, ServiceContext};
    use svclib_core::{Metadata, Request, ServiceError};
    use svclib_store::{DefaultScratch, LocalFileResults};

    /// A `ServiceContext` backed by a fresh temp directory, for tests that
    /// don't care about a specific request shape or about making nested
    /// calls.
    pub fn context(dir: &std::path::Path) -> ServiceContext {
        context_for(dir, Request::new(vec![], Map::new()))
    }

    pub fn context_for(dir: &std::path::Path, request: Request) -> ServiceContext {
        context_with(dir, request, Arc::new(StubInvoker::new()))
    }

    pub fn context_with_invoker(dir: &std::path::Path, invoker: Arc<dyn Invoker>) -> ServiceContext {
        context_with(dir, Request::new(vec![], Map::new()), invoker)
    }

    fn context_with(dir: &std::path::Path, request: Request, invoker: Arc<dyn Invoker>) -> ServiceContext {
        ServiceContext::new(
            "test",
            dir.to_path_buf(),
            request,
            Arc::new(LocalFileResults::new(vec![dir.to_path_buf()])),
            Arc::new(DefaultScratch::new(vec![dir.to_path_buf()]).unwrap()),
            invoker,
        )
    }

    /// Records every call it's asked to make. In `echoing` mode it answers
    /// with the single argument it was passed, matching the `echo` sample
    /// service, so `proxy` tests can assert on the forwarded value without
    /// standing up a real worker.
    pub struct StubInvoker {
        calls: Mutex<Vec<(String, Vec<Value>)>>,
        echo: bool,
    }

    impl StubInvoker {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                echo: false,
            }
        }

        pub fn echoing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                echo: true,
            }
        }

        pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Invoker for StubInvoker {
        async fn invoke(
            &self,
            service: &str,
            args: Vec<Value>,
            _kwargs: Map<String, Value>,
        ) -> Result<(Value, Metadata), ServiceError> {
            self.calls.lock().unwrap().push((service.to_string(), args.clone()));
            let child = Metadata::new(service.to_string());
            let value = if self.echo {
                args.first().cloned().unwrap_or(Value::Null)
            } else {
                Value::from(1)
            };
            Ok((value, child))
        }
    }
}
