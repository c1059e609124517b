//! slog HTTP access log, one line per request.

use crate::tracing::RequestId;
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use slog::{o, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, PlainDecorator, TermDecorator};
use std::sync::Arc;
use std::time::Instant;

/// Paths that are polled by infrastructure and not worth an access line
const QUIET_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Configuration for setting up the logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    async_buffer_size: usize,
    use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    pub fn new(async_buffer_size: usize, use_color: bool) -> Self {
        Self {
            async_buffer_size,
            use_color,
        }
    }
}

/// Sets up a logger with configurable options
pub fn setup_logger(config: LoggerConfig) -> Logger {
    let async_drain = if config.use_color {
        let decorator = TermDecorator::new().force_color().build();
        Async::new(FullFormat::new(decorator).build().fuse())
            .chan_size(config.async_buffer_size)
            .build()
    } else {
        let decorator = PlainDecorator::new(std::io::stdout());
        Async::new(FullFormat::new(decorator).build().fuse())
            .chan_size(config.async_buffer_size)
            .build()
    };

    Logger::root(
        async_drain.fuse(),
        o!("service" => "fulfillment-api", "version" => env!("CARGO_PKG_VERSION")),
    )
}

/// State struct for logging middleware
#[derive(Clone)]
pub struct LoggingState {
    logger: Logger,
}

impl LoggingState {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

/// Access log middleware; must run inside the request id middleware.
pub async fn logging_middleware(
    State(state): State<Arc<LoggingState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|rid| rid.as_str().to_string())
        .unwrap_or_default();

    let response = next.run(req).await;

    if !QUIET_PATHS.contains(&path.as_str()) {
        slog::info!(
            &state.logger,
            "HTTP request handled";
            "method" => method,
            "path" => path,
            "status" => response.status().as_u16(),
            "duration_ms" => start_time.elapsed().as_millis() as u64,
            "request_id" => request_id,
        );
    }

    response
}
