//! The probe's routes and the state they share.

use std::sync::Arc;

use tracing::error;

use crate::cache::{KvStore, RoundTripError, perform_round_trip};
use crate::config::{Config, EnvSnapshot, Identity};
use crate::context::Context;
use crate::middleware::{LoggerMiddleware, Pipeline};
use crate::page::{self, PageError, Pages};
use crate::{Response, Router, StatusCode};

/// Everything handlers need, built once in `main`.
pub struct AppState<S> {
    pub config: Config,
    pub identity: Identity,
    pub env: EnvSnapshot,
    pub store: S,
    pub pages: Pages,
}

impl<S: KvStore> AppState<S> {
    /// # Errors
    ///
    /// [`PageError`] if the page templates fail to register.
    pub fn new(
        config: Config,
        identity: Identity,
        env: EnvSnapshot,
        store: S,
    ) -> Result<Self, PageError> {
        Ok(Self {
            config,
            identity,
            env,
            store,
            pages: Pages::new()?,
        })
    }
}

/// Routes in match order:
///
/// - `GET /` — identity, locations, environment, link to the default key.
/// - `GET /favicon.ico` — `204`, so browsers do not trigger a round trip.
/// - `GET /:key` — cache round trip for `key`.
pub fn router<S: KvStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let mut router = Router::new();

    let index_state = Arc::clone(&state);
    router.get("/", move |_ctx: Context| {
        let state = Arc::clone(&index_state);
        async move { index(state.as_ref()) }
    });

    router.get("/favicon.ico", |_ctx: Context| async {
        Response::new(StatusCode::NoContent)
    });

    router.get("/:key", move |ctx: Context| {
        let state = Arc::clone(&state);
        async move { round_trip(state.as_ref(), &ctx).await }
    });

    router
}

/// The router behind the request logger, ready for [`Server::run`](crate::Server::run).
pub fn pipeline<S: KvStore + 'static>(state: Arc<AppState<S>>) -> Pipeline {
    Pipeline::builder()
        .layer(LoggerMiddleware)
        .finish(router(state))
}

fn index<S>(state: &AppState<S>) -> Response {
    let render = || -> Result<String, PageError> {
        Ok(page::document(
            &state.identity,
            &[
                page::banner(&state.identity),
                page::round_trip_link(&state.config.default_key),
                state.pages.env_accordion(&state.env)?,
                state.pages.location_list(&state.identity)?,
            ],
        ))
    };
    respond(StatusCode::Ok, render())
}

async fn round_trip<S: KvStore>(state: &AppState<S>, ctx: &Context) -> Response {
    let config = &state.config;
    let key = config.key_or_default(ctx.params().get("key"));

    let (status, result) =
        match perform_round_trip(&state.store, &config.store, key, &config.stored_value).await {
            Ok(trace) => (StatusCode::Ok, state.pages.trace_block(&trace)),
            Err(err) => (failure_status(&err), state.pages.error_block(&err)),
        };

    let render = || -> Result<String, PageError> {
        Ok(page::document(
            &state.identity,
            &[
                page::banner(&state.identity),
                result?,
                state.pages.env_accordion(&state.env)?,
                state.pages.location_list(&state.identity)?,
            ],
        ))
    };
    respond(status, render())
}

/// The rendered page with `status`, or a bare `500` when rendering failed.
fn respond(status: StatusCode, page: Result<String, PageError>) -> Response {
    match page {
        Ok(body) => Response::html(status, body),
        Err(err) => {
            error!(error = %err, "page rendering failed");
            Response::new(StatusCode::InternalServerError).body("Internal Server Error")
        }
    }
}

/// `503` when the store could not be reached, `502` when it misbehaved.
fn failure_status(err: &RoundTripError) -> StatusCode {
    if err.is_connection() {
        StatusCode::ServiceUnavailable
    } else {
        StatusCode::BadGateway
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use crate::cache::{Fault, MemoryStore};
    use clap::Parser;

    fn state(store: MemoryStore) -> Arc<AppState<MemoryStore>> {
        let config = Config::try_parse_from(["kvprobe", "--default-key", "my-key"]).unwrap();
        let env = [("PROBE_MARKER".to_owned(), "on".to_owned())].into_iter().collect();
        Arc::new(AppState::new(
            config,
            Identity::new("pod-1", Some("aws-eu-central-1")),
            env,
            store,
        ).unwrap())
    }

    async fn get(pipeline: &Pipeline, path: &str) -> Response {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        pipeline.handle(Request::parse(raw.as_bytes()).unwrap().0).await
    }

    #[tokio::test]
    async fn index_renders_without_touching_the_store() {
        let store = MemoryStore::new();
        let pipeline = pipeline(state(store.clone()));

        let res = get(&pipeline, "/").await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = res.body_text();
        assert!(body.contains("<li>PROBE_MARKER = on</li>"));
        assert!(body.contains("color: green; font-weight: bold\">aws-eu-central-1"));
        assert!(body.contains("href=\"/my-key\""));
        assert_eq!(store.total_connections(), 0);
    }

    #[tokio::test]
    async fn favicon_is_not_a_cache_key() {
        let store = MemoryStore::new();
        let pipeline = pipeline(state(store.clone()));

        let res = get(&pipeline, "/favicon.ico").await;
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(store.total_connections(), 0);
    }

    #[tokio::test]
    async fn key_route_performs_round_trip() {
        let store = MemoryStore::new();
        let pipeline = pipeline(state(store.clone()));

        let res = get(&pipeline, "/other%20key").await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = res.body_text();
        assert!(body.contains("set &quot;other key&quot; &quot;this is my-key&#39;s stored value&quot;"));
        assert!(body.contains("returned &quot;this is my-key&#39;s stored value&quot;"));
        assert_eq!(
            store.value("other key").as_deref(),
            Some("this is my-key's stored value")
        );
    }

    #[tokio::test]
    async fn unreachable_store_is_503() {
        let store = MemoryStore::new().with_fault(Fault::RefuseConnections);
        let res = get(&pipeline(state(store)), "/my-key").await;
        assert_eq!(res.status(), StatusCode::ServiceUnavailable);
        assert!(res.body_text().contains("Exception:"));
    }

    #[tokio::test]
    async fn rejected_write_is_502() {
        let store = MemoryStore::new().with_fault(Fault::RejectWrites);
        let res = get(&pipeline(state(store.clone())), "/my-key").await;
        assert_eq!(res.status(), StatusCode::BadGateway);
        assert!(res.body_text().contains("SET rejected by store"));
        assert_eq!(store.open_connections(), 0);
    }
}
