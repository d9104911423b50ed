//! Request routing and aggregation.
//!
//! The dispatcher is a stateless request → response function over the
//! registry. Aggregating actions query providers one by one in handle order;
//! a provider that errors, panics or runs past the deadline is left out of
//! `data` and noted under `errors` instead of failing the whole request.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{Map, Value};
use tallyproto::{decode, Action, Request, Response, HANDLE_ALL};
use tracing::{debug, error, warn};

use crate::error::{ProviderError, QueryError};
use crate::provider::SharedProvider;
use crate::registry::ProviderRegistry;

/// Counters kept by the dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    served: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    fn record(&self, response: &Response) {
        self.served.fetch_add(1, Ordering::Relaxed);
        if !response.ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Requests answered so far.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Requests answered with `ok: false`.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Routes decoded requests to the registry.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    provider_timeout: Option<Duration>,
    config_view: Map<String, Value>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            provider_timeout: None,
            config_view: Map::new(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Deadline for each individual provider call. `None` waits forever.
    pub fn with_provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// What the `config` action reports.
    pub fn with_config_view(mut self, view: Map<String, Value>) -> Self {
        self.config_view = view;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Decode one raw frame and answer it.
    ///
    /// Always returns a response: codec errors and even panics inside the
    /// dispatcher come back as `ok: false`.
    pub async fn handle_frame(&self, raw: &[u8]) -> Response {
        let response = match AssertUnwindSafe(self.decode_and_dispatch(raw))
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("dispatcher panicked: {}", message);
                QueryError::Internal(message).into_response()
            }
        };

        self.stats.record(&response);
        response
    }

    async fn decode_and_dispatch(&self, raw: &[u8]) -> Response {
        match decode(raw) {
            Ok(request) => self.dispatch(&request).await,
            Err(e) => {
                warn!("rejecting request: {}", e);
                QueryError::from(e).into_response()
            }
        }
    }

    /// Answer a decoded request.
    pub async fn dispatch(&self, request: &Request) -> Response {
        debug!(
            "dispatch action={} handle={:?}",
            request.action, request.handle
        );

        let result = match &request.action {
            Action::AllServices => Ok(self.all_info().await),
            Action::Info => match request.handle.as_deref() {
                None => Err(QueryError::Protocol(
                    tallyproto::ProtocolError::MissingField("handle"),
                )),
                Some(HANDLE_ALL) => Ok(self.all_info().await),
                Some(handle) => self.single_info(handle).await,
            },
            Action::CacheStats => self.cache_stats(request).await,
            Action::Config => Ok(Response::success(self.config_view.clone())),
            Action::Other(name) => Err(QueryError::UnknownAction(name.clone())),
        };

        result.unwrap_or_else(|e| {
            debug!("query failed: {}", e);
            e.into_response()
        })
    }

    /// `all_services` and `info` for `all`: info of every provider, by handle.
    async fn all_info(&self) -> Response {
        let snapshot = self.registry.all();
        let mut data = Map::new();
        let mut errors = BTreeMap::new();

        for (handle, provider) in &snapshot {
            match self.guarded(|| provider.info()).await {
                Ok(info) => {
                    data.insert(handle.clone(), info);
                }
                Err(e) => {
                    warn!("provider {} failed during info: {}", handle, e);
                    errors.insert(handle.clone(), e.to_string());
                }
            }
        }

        Response::partial(data, errors)
    }

    async fn single_info(&self, handle: &str) -> Result<Response, QueryError> {
        let provider = self.registry.lookup(handle)?;
        let info = self
            .guarded(|| provider.info())
            .await
            .map_err(|source| QueryError::ProviderFailure {
                handle: handle.to_string(),
                source,
            })?;

        let mut data = Map::new();
        data.insert(handle.to_string(), info);
        Ok(Response::success(data))
    }

    /// Cache counters keyed by handle. Providers without a cache are skipped,
    /// including when one was asked for by name.
    async fn cache_stats(&self, request: &Request) -> Result<Response, QueryError> {
        let targets: Vec<(String, SharedProvider)> = if request.targets_all() {
            self.registry
                .all()
                .iter()
                .map(|(handle, provider)| (handle.clone(), Arc::clone(provider)))
                .collect()
        } else {
            let handle = request.handle.clone().unwrap_or_default();
            let provider = self.registry.lookup(&handle)?;
            vec![(handle, provider)]
        };

        let mut data = Map::new();
        let mut errors = BTreeMap::new();

        for (handle, provider) in targets {
            let cache = match panic::catch_unwind(AssertUnwindSafe(|| provider.cache())) {
                Ok(Some(cache)) => cache,
                Ok(None) => continue,
                Err(payload) => {
                    let e = ProviderError::Panicked(panic_message(payload.as_ref()));
                    warn!("provider {} failed during cache_stats: {}", handle, e);
                    errors.insert(handle, e.to_string());
                    continue;
                }
            };

            match self.guarded(|| cache.cache_stats()).await {
                Ok(stats) => match serde_json::to_value(stats) {
                    Ok(value) => {
                        data.insert(handle, value);
                    }
                    Err(e) => {
                        errors.insert(handle, e.to_string());
                    }
                },
                Err(e) => {
                    warn!("provider {} failed during cache_stats: {}", handle, e);
                    errors.insert(handle, e.to_string());
                }
            }
        }

        Ok(Response::partial(data, errors))
    }

    /// Run one provider call, converting panics and overruns into errors.
    /// `start` is invoked inside the guard, so a provider that panics before
    /// handing back its future is caught too.
    async fn guarded<T, F>(&self, start: impl FnOnce() -> F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let call = panic::catch_unwind(AssertUnwindSafe(start))
            .map_err(|payload| ProviderError::Panicked(panic_message(payload.as_ref())))?;
        let call = AssertUnwindSafe(call).catch_unwind();

        let outcome = match self.provider_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => call.await,
        };

        outcome.unwrap_or_else(|panic| Err(ProviderError::Panicked(panic_message(panic.as_ref()))))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
