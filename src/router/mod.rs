//! Request routing: map `GET` paths to handler functions.
//!
//! | Pattern  | Example match | Captured params   |
//! |----------|---------------|-------------------|
//! | `/`      | `/`           | *(none)*          |
//! | `/:key`  | `/my%20key`   | `key → "my key"`  |
//!
//! Trailing slashes are ignored on both patterns and incoming paths.
//! Captured segments are percent-decoded; a segment that does not decode to
//! UTF-8 is passed through as sent. Routes are tried in registration order
//! and the first match wins.

use std::borrow::Cow;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::{Method, Response, StatusCode};

/// Type-erased async handler.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Implemented for every `Fn(Context) -> impl Future<Output = Response>`
/// that can be shared across tasks, so routes accept plain closures.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Parameter(String),
}

#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<Segment>,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let segments = segments(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Parameter(name.to_owned()),
                None => Segment::Static(s.to_owned()),
            })
            .collect();
        Self { segments }
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = segments(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Parameter(name) => {
                    let value = urlencoding::decode(part).unwrap_or(Cow::Borrowed(part));
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }
        Some(params)
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

/// Dispatches requests to the first route whose method and pattern match,
/// answering `404 Not Found` otherwise.
///
/// # Examples
///
/// ```rust,no_run
/// use kvprobe::{Response, Router, StatusCode};
/// use kvprobe::context::Context;
///
/// let mut router = Router::new();
/// router.get("/:key", |ctx: Context| async move {
///     let key = ctx.params().get("key").unwrap_or_default().to_owned();
///     Response::new(StatusCode::Ok).body(key)
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method: Method::Get,
            pattern: Pattern::parse(path),
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the matching handler with the captured params stored on `ctx`.
    pub async fn route(&self, mut ctx: Context) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            if &route.method != ctx.request().method() {
                return None;
            }
            route
                .pattern
                .matches(ctx.request().path())
                .map(|params| (route, params))
        });

        match matched {
            Some((route, params)) => {
                ctx.set_params(params);
                (route.handler)(ctx).await
            }
            None => Response::new(StatusCode::NotFound).body("Not Found"),
        }
    }
}
