use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{MatchError, Matcher};
use crate::models::{ErrorResponse, HealthResponse, MatchRequest, ReadyResponse};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness))
        .route("/match", web::post().to(match_candidates))
        .route("/match/tiers", web::post().to(match_tiers));
}

/// Liveness probe
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Readiness probe: ready once the embedding backend has warmed up
async fn readiness(state: web::Data<AppState>) -> impl Responder {
    let embedding = state.matcher.embedding();
    let embedder = embedding.embedder().name().to_string();

    if embedding.is_ready() {
        HttpResponse::Ok().json(ReadyResponse {
            status: "ready".to_string(),
            embedder,
        })
    } else {
        HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "not_ready".to_string(),
            message: format!("Embedding backend `{}` has not warmed up yet", embedder),
            status_code: 503,
        })
    }
}

fn validation_failure(req: &MatchRequest) -> Option<HttpResponse> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for match request: field_errors={:?}", errors);
        return Some(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        }));
    }
    None
}

fn error_response(err: MatchError) -> HttpResponse {
    match err {
        MatchError::DuplicateCandidate(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: err.to_string(),
            status_code: 400,
        }),
        MatchError::Embedding(_) => {
            tracing::error!("Matching pipeline error: {}", err);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "Matching failed".to_string(),
                message: err.to_string(),
                status_code: 503,
            })
        }
    }
}

/// Run the matching pipeline
///
/// POST /api/v1/match
///
/// Request body:
/// ```json
/// {
///   "user_profile": { "current_role": { "title": "string" }, "top_skills": [{ "skill": "string" }] },
///   "user_objective": {
///     "person_id": "string",
///     "primary_goal": "string",
///     "target_profiles": [{ "type": "string", "titles": ["string"], "why": "string" }],
///     "success_signals": ["string"]
///   },
///   "network_profiles": [{ "profile_id": "string", "name": "string", "title": "string" }]
/// }
/// ```
async fn match_candidates(
    state: web::Data<AppState>,
    req: web::Json<MatchRequest>,
) -> impl Responder {
    if let Some(response) = validation_failure(&req) {
        return response;
    }

    tracing::info!(
        "Matching {} candidates for {}",
        req.network_profiles.len(),
        req.user_objective.person_id
    );

    match state.matcher.run(&req).await {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e) => error_response(e),
    }
}

/// Run the pipeline and group results into hot / warm / cold tiers
///
/// POST /api/v1/match/tiers
async fn match_tiers(
    state: web::Data<AppState>,
    req: web::Json<MatchRequest>,
) -> impl Responder {
    if let Some(response) = validation_failure(&req) {
        return response;
    }

    match state.matcher.run_tiered(&req).await {
        Ok(tiers) => {
            tracing::info!(
                hot = tiers.hot.len(),
                warm = tiers.warm.len(),
                cold = tiers.cold.len(),
                "Tiered {} results for {}",
                tiers.len(),
                req.user_objective.person_id
            );
            HttpResponse::Ok().json(tiers)
        }
        Err(e) => error_response(e),
    }
}
