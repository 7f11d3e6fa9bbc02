//! Middleware pipeline: composable logic wrapped around the router.
//!
//! - [`Middleware`] is implemented by every layer.
//! - [`Next`] is the cursor into the rest of the chain.
//! - [`Pipeline`] owns the layers with the [`Router`] as the innermost one
//!   and turns a raw [`Request`] into a [`Response`].
//! - [`LoggerMiddleware`] logs one line per request.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;
use tracing::info;

use crate::{Request, Response, Router, StatusCode, context::Context};

/// A type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Wraps a [`Middleware`] so it can sit in a chain.
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// Cursor into the remaining middleware chain for one request.
///
/// Consumed by [`run`](Self::run), so each layer can forward at most once.
pub struct Next {
    chain: Arc<[MiddlewareHandler]>,
    index: usize,
}

impl Next {
    pub fn new(chain: Arc<[MiddlewareHandler]>) -> Self {
        Self { chain, index: 0 }
    }

    /// Invokes the next layer. A chain that runs out without producing a
    /// response yields `500 Internal Server Error`.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.chain.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline"),
        }
    }
}

/// A layer around the router.
///
/// Implementations may pass the request on with `next.run(ctx).await`,
/// answer it themselves, or decorate the downstream response.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs method, path, status and elapsed time once the response is ready.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed = ?start.elapsed(),
                "request handled"
            );
            response
        })
    }
}

/// Ordered middleware layers terminated by a [`Router`].
///
/// # Examples
///
/// ```rust,no_run
/// use kvprobe::middleware::{LoggerMiddleware, Pipeline};
/// use kvprobe::Router;
///
/// let pipeline = Pipeline::builder().layer(LoggerMiddleware).finish(Router::new());
/// ```
pub struct Pipeline {
    chain: Arc<[MiddlewareHandler]>,
}

/// Collects layers for a [`Pipeline`]; the first added runs outermost.
#[derive(Default)]
pub struct PipelineBuilder {
    layers: Vec<MiddlewareHandler>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn layer<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.layers.push(from_middleware(Arc::new(middleware)));
        self
    }

    pub fn finish(mut self, router: Router) -> Pipeline {
        let router = Arc::new(router);
        self.layers.push(Arc::new(move |ctx: Context, _next: Next| {
            let router = Arc::clone(&router);
            Box::pin(async move { router.route(ctx).await })
                as Pin<Box<dyn Future<Output = Response> + Send>>
        }));
        Pipeline {
            chain: self.layers.into(),
        }
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub async fn handle(&self, request: Request) -> Response {
        Next::new(Arc::clone(&self.chain))
            .run(Context::new(request))
            .await
    }
}
