use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::connect_info::ConnectInfo,
    extract::DefaultBodyLimit,
    extract::State,
    http::header::{HeaderName, HeaderValue, CONTENT_TYPE},
    http::Method,
    http::Request,
    middleware,
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use dotenvy::dotenv;
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::keyed::DashMapStateStore, Quota,
    RateLimiter,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use jobq_core::persist::{FileStore, MemoryStore, SearchStatePersistence};
use jobq_core::source::postgres::{create_pool_from_url, PgSource};
use jobq_core::source::InMemorySource;
use jobq_core::{EngineConfig, JobSource, Listing, ResultCache};

pub mod error;
pub mod handlers;
pub mod session;

use error::ApiError;
use handlers::{health, saved, search};
use session::SessionRegistry;

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Parser)]
#[command(name = "jobq-api", about = "HTTP API exposing jobq search sessions")]
struct Cli {
    /// Server port
    #[arg(long, env = "JOBQ_PORT", default_value_t = 3100)]
    port: u16,

    /// PostgreSQL connection string; omit to serve from the seed file
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JSON file with an array of listings, used when no database is configured
    #[arg(long, env = "JOBQ_SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// Directory for persisted session state
    #[arg(long, env = "JOBQ_STATE_DIR", default_value = "jobq-state")]
    state_dir: PathBuf,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "JOBQ_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub state_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "JOBQ_CORS_ORIGINS must list explicit origins".into(),
            ));
        }

        Ok(Self {
            port: cli.port,
            database_url: cli.database_url,
            seed_file: cli.seed_file,
            state_dir: cli.state_dir,
            cors_origins,
        })
    }
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
    execute: Arc<IpRateLimiter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub global_per_sec: u64,
    pub global_burst: u32,
    pub execute_per_sec: u64,
    pub execute_burst: u32,
}

impl RateLimitConfig {
    fn parse_env_u64(name: &str) -> Option<u64> {
        env::var(name)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
    }

    fn parse_env_u32(name: &str) -> Option<u32> {
        env::var(name)
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    fn from_env() -> Self {
        Self {
            global_per_sec: Self::parse_env_u64("JOBQ_RATE_LIMIT_GLOBAL_PER_SEC").unwrap_or(20),
            global_burst: Self::parse_env_u32("JOBQ_RATE_LIMIT_GLOBAL_BURST").unwrap_or(40),
            execute_per_sec: Self::parse_env_u64("JOBQ_RATE_LIMIT_EXECUTE_PER_SEC").unwrap_or(5),
            execute_burst: Self::parse_env_u32("JOBQ_RATE_LIMIT_EXECUTE_BURST").unwrap_or(10),
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub engine_config: EngineConfig,
    pub cache: Arc<ResultCache>,
    pub source: Arc<dyn JobSource>,
    pub store: Arc<dyn SearchStatePersistence>,
    pub sessions: SessionRegistry,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

fn build_ip_limiter(per_second: u64, burst_size: u32) -> Arc<IpRateLimiter> {
    let nanos_per_token = 1_000_000_000u64 / per_second.max(1);
    let quota = Quota::with_period(Duration::from_nanos(nanos_per_token.max(1)))
        .unwrap()
        .allow_burst(NonZeroU32::new(burst_size).unwrap());

    Arc::new(RateLimiter::keyed(quota))
}

pub fn default_rate_limits() -> RateLimits {
    let cfg = RateLimitConfig::from_env();
    RateLimits {
        global: build_ip_limiter(cfg.global_per_sec, cfg.global_burst),
        execute: build_ip_limiter(cfg.execute_per_sec, cfg.execute_burst),
    }
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce_rate_limit(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), ApiError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.global, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn execute_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.execute, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let session_routes = Router::new()
        .route("/filters", post(search::set_filter))
        .route("/filters/remove", post(search::remove_filter))
        .route("/filters/active", get(search::active_filters))
        .route("/skills/toggle", post(search::toggle_skill))
        .route("/clear", post(search::clear_filters))
        .route("/sort", post(search::set_sort))
        .route("/page", post(search::set_page))
        .route(
            "/execute",
            post(search::execute).route_layer(middleware::from_fn_with_state(
                state.clone(),
                execute_rate_limit,
            )),
        )
        .route("/recent", get(search::recent_searches))
        .route("/saved", get(saved::list_saved).post(saved::save_search))
        .route("/saved/:id", delete(saved::delete_saved))
        .route("/saved/:id/load", post(saved::load_saved));

    let api_routes = Router::new().nest("/sessions/:session_id", session_routes);

    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
        .layer(cors)
        .with_state(state)
}

async fn build_source(config: &AppConfig) -> Result<Arc<dyn JobSource>, ApiError> {
    if let Some(url) = &config.database_url {
        let pool = create_pool_from_url(url)
            .map_err(|err| ApiError::Internal(format!("failed to create pool: {err}")))?;
        return Ok(Arc::new(PgSource::new(pool)));
    }

    let listings: Vec<Listing> = match &config.seed_file {
        Some(path) => {
            let raw = tokio::fs::read(path)
                .await
                .map_err(|err| ApiError::Internal(format!("failed to read seed file: {err}")))?;
            serde_json::from_slice(&raw)
                .map_err(|err| ApiError::Internal(format!("invalid seed file: {err}")))?
        }
        None => Vec::new(),
    };

    Ok(Arc::new(InMemorySource::new(listings)))
}

/// In-memory state for router tests. No database, no filesystem.
pub fn test_state(listings: Vec<Listing>) -> SharedState {
    let engine_config = EngineConfig::default();

    Arc::new(AppState {
        config: AppConfig {
            port: 3100,
            database_url: None,
            seed_file: None,
            state_dir: PathBuf::from("jobq-state"),
            cors_origins: vec!["http://localhost:3000".into()],
        },
        engine_config: engine_config.clone(),
        cache: Arc::new(ResultCache::new(
            engine_config.cache_capacity,
            engine_config.cache_ttl,
        )),
        source: Arc::new(InMemorySource::new(listings)),
        store: Arc::new(MemoryStore::new()),
        sessions: SessionRegistry::new(),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    jobq_core::logging::init_tracing(env!("CARGO_PKG_NAME"));
    jobq_core::logging::install_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let engine_config = EngineConfig::from_env();

    let source = build_source(&config).await?;
    let store: Arc<dyn SearchStatePersistence> = Arc::new(FileStore::new(&config.state_dir));
    let cache = Arc::new(ResultCache::new(
        engine_config.cache_capacity,
        engine_config.cache_ttl,
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        engine_config,
        cache,
        source,
        store,
        sessions: SessionRegistry::new(),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(%addr, backend = if config.database_url.is_some() { "postgres" } else { "memory" }, "jobq-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state
        .readiness
        .store(false, std::sync::atomic::Ordering::SeqCst);

    // Give load balancers a brief window to observe /readyz as not ready
    // before axum stops accepting new connections.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn with_envs(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_GUARD.lock().unwrap();

        let previous: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(var, value)| {
                let old = env::var(var).ok();
                match value {
                    Some(v) => env::set_var(var, v),
                    None => env::remove_var(var),
                }
                (*var, old)
            })
            .collect();

        f();

        for (var, previous_value) in previous {
            match previous_value {
                Some(v) => env::set_var(var, v),
                None => env::remove_var(var),
            }
        }
    }

    #[test]
    fn rate_limit_config_respects_env_overrides() {
        with_envs(
            &[
                ("JOBQ_RATE_LIMIT_GLOBAL_PER_SEC", Some("10")),
                ("JOBQ_RATE_LIMIT_GLOBAL_BURST", Some("25")),
                ("JOBQ_RATE_LIMIT_EXECUTE_PER_SEC", Some("2")),
                ("JOBQ_RATE_LIMIT_EXECUTE_BURST", Some("4")),
            ],
            || {
                let cfg = RateLimitConfig::from_env();
                assert_eq!(
                    cfg,
                    RateLimitConfig {
                        global_per_sec: 10,
                        global_burst: 25,
                        execute_per_sec: 2,
                        execute_burst: 4,
                    }
                );
            },
        );
    }

    #[test]
    fn wildcard_cors_origins_are_rejected() {
        let cli = Cli::parse_from(["jobq-api", "--cors-origins", "*"]);
        assert!(AppConfig::from_cli(cli).is_err());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let cli = Cli::parse_from([
            "jobq-api",
            "--cors-origins",
            "http://localhost:3000, https://jobs.example.com ,",
        ]);
        let config = AppConfig::from_cli(cli).unwrap();
        assert_eq!(
            config.cors_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://jobs.example.com".to_string()
            ]
        );
    }
}
