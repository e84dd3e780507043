//! HTTP API server for outbound calls

pub mod health;
pub mod outbound;
pub mod rate_limit;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::{Config, Environment};
use crate::phone::DEFAULT_COUNTRY_CODE;
use crate::providers::{CallProvider, VapiClient};
use crate::Result;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub environment: Environment,
    /// `None` when no platform credential is configured
    pub provider: Option<Arc<dyn CallProvider>>,
    pub default_country_code: String,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Builder for the API server
pub struct ApiServerBuilder {
    port: u16,
    environment: Environment,
    provider: Option<Arc<dyn CallProvider>>,
    default_country_code: String,
    rate_limit_rpm: Option<u32>,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            environment: Environment::default(),
            provider: None,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            rate_limit_rpm: None,
            static_dir: None,
        }
    }

    /// Builder populated from loaded configuration
    ///
    /// A Vapi client is only created when an API key is configured.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let provider = config.vapi.api_key.as_ref().map(|key| {
            let client = VapiClient::new(&config.vapi.base_url, key.clone());
            Arc::new(client) as Arc<dyn CallProvider>
        });

        Self::new(config.api_server.port)
            .environment(config.environment.clone())
            .provider(provider)
            .default_country_code(&config.phone.default_country_code)
            .rate_limit(config.api_server.rate_limit_rpm)
            .static_dir(config.api_server.static_dir.clone())
    }

    /// Set the runtime environment label
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the call-creation provider
    #[must_use]
    pub fn provider(mut self, provider: Option<Arc<dyn CallProvider>>) -> Self {
        self.provider = provider;
        self
    }

    /// Set the country code prepended to bare ten-digit numbers
    #[must_use]
    pub fn default_country_code(mut self, code: &str) -> Self {
        code.clone_into(&mut self.default_country_code);
        self
    }

    /// Enable a global requests-per-minute limit
    #[must_use]
    pub fn rate_limit(mut self, requests_per_minute: Option<u32>) -> Self {
        self.rate_limit_rpm = requests_per_minute;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let rate_limiter = self.rate_limit_rpm.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            environment: self.environment,
            provider: self.provider,
            default_country_code: self.default_country_code,
            rate_limiter,
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/vapi/outbound-call", post(outbound::create_call))
            .route("/vapi/outbound-campaign", post(outbound::create_campaign))
            .route("/health", get(health::health))
            .fallback(not_found)
            .with_state(self.state.clone());

        let mut router = Router::new().nest("/api", api);

        // Serve static files if configured; `/api` keeps its own fallback
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // Rate limiting (only when configured)
        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let expose_errors = self.state.environment.exposes_errors();

        router
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(cors)
            .layer(CatchPanicLayer::custom(
                move |panic: Box<dyn std::any::Any + Send + 'static>| {
                    panic_response(expose_errors, panic)
                },
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.provider.is_none() {
            tracing::error!("no Vapi provider configured, outbound routes will answer 500");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            env = %self.state.environment,
            "API server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

/// 500 for a panicking handler; the message is only shown in development
#[allow(clippy::needless_pass_by_value)]
fn panic_response(
    expose_errors: bool,
    panic: Box<dyn std::any::Any + Send + 'static>,
) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("Internal Server Error");

    tracing::error!(detail, "request handler panicked");

    let message = if expose_errors {
        detail
    } else {
        "Internal Server Error"
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
