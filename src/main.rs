use actix_cors::Cors;
use actix_web::dev::Service;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use kg_matchmaker::config::{EmbeddingBackend, LoggingSettings, Settings};
use kg_matchmaker::core::Matcher;
use kg_matchmaker::routes::{self, matches::AppState};
use kg_matchmaker::services::{
    Embedder, EmbeddingRuntime, HashingEmbedder, HuggingFaceClient, OllamaClient,
    ReasoningGenerator, ReasoningMode, TextGenerator,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const WARM_UP_ATTEMPTS: u32 = 5;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>, reqwest::Error> {
    let embedding = &settings.embedding;
    let embedder: Arc<dyn Embedder> = match embedding.backend {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(embedding.dimension)),
        EmbeddingBackend::Ollama => Arc::new(OllamaClient::new(
            embedding.ollama_host.clone(),
            settings.reasoning.ollama.model.clone(),
            embedding.model.clone(),
            Duration::from_secs(embedding.timeout_secs),
        )?),
    };
    Ok(embedder)
}

/// Backends in default priority order: local first, hosted second
fn build_reasoner(settings: &Settings, mode: ReasoningMode) -> Result<ReasoningGenerator, reqwest::Error> {
    let reasoning = &settings.reasoning;
    let timeout = Duration::from_secs(reasoning.timeout_secs);

    let ollama = OllamaClient::new(
        reasoning.ollama.host.clone(),
        reasoning.ollama.model.clone(),
        settings.embedding.model.clone(),
        timeout,
    )?;
    let huggingface = HuggingFaceClient::new(
        reasoning.huggingface.endpoint.clone(),
        reasoning.huggingface.model.clone(),
        reasoning.huggingface.api_token.clone(),
        timeout,
    )?;
    if !huggingface.has_token() {
        info!("HF_API_TOKEN not set, hosted inference backend will be skipped");
    }

    let backends = vec![
        Arc::new(ollama) as Arc<dyn TextGenerator>,
        Arc::new(huggingface) as Arc<dyn TextGenerator>,
    ];
    Ok(ReasoningGenerator::new(backends, mode, timeout))
}

/// Warm the embedding backend, retrying with a linear backoff
async fn warm_up(runtime: Arc<EmbeddingRuntime>) {
    for attempt in 1..=WARM_UP_ATTEMPTS {
        match runtime.warm_up().await {
            Ok(_) => return,
            Err(e) => {
                warn!(attempt, "Embedding warm-up failed: {}", e);
                tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
            }
        }
    }
    error!("Embedding backend never warmed up; /ready will keep reporting 503");
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting KG Matchmaker service...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    info!("Configuration loaded successfully");

    let mode: ReasoningMode = settings.reasoning.mode.parse().map_err(|e| {
        error!("Invalid reasoning mode: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let embedder = build_embedder(&settings).map_err(|e| {
        error!("Failed to create embedding client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;
    let embedding = Arc::new(EmbeddingRuntime::new(embedder));

    let reasoner = build_reasoner(&settings, mode).map_err(|e| {
        error!("Failed to create reasoning clients: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    info!(
        "Reasoning chain initialized (mode: {:?}, attempt timeout: {}s)",
        mode, settings.reasoning.timeout_secs
    );

    let config = settings.matcher_config().map_err(|e| {
        error!("Invalid scoring configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    info!("Matcher initialized with config: {:?}", config);

    let matcher = Matcher::new(config, Arc::clone(&embedding), Arc::new(reasoner));

    actix_web::rt::spawn(warm_up(embedding));

    let app_state = AppState { matcher };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap_fn(|req, srv| {
                let started = Instant::now();
                let fut = srv.call(req);
                async move {
                    let mut res = fut.await?;
                    let elapsed = format!("{:.1}", started.elapsed().as_secs_f64() * 1000.0);
                    if let Ok(value) = HeaderValue::from_str(&elapsed) {
                        res.headers_mut()
                            .insert(HeaderName::from_static("x-process-time-ms"), value);
                    }
                    Ok(res)
                }
            })
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
