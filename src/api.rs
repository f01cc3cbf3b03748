use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::annotate::{Annotation, Mark};
use crate::batch::{self, RawRecord, RunOptions, ScoredReview};
use crate::error::ScoreError;
use crate::scoring::{CategoryScores, Scorer};
use crate::taxonomy::{Category, KeywordGroup, Polarity};

#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<Scorer>,
    pub run: RunOptions,
}

impl AppState {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            scorer: Arc::new(scorer),
            run: RunOptions::default(),
        }
    }

    /// Batch options for `/batch`; `/score` is always a single row.
    pub fn with_run(mut self, run: RunOptions) -> Self {
        self.run = run;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/score", post(score))
        .route("/batch", post(score_batch))
        .route("/taxonomy", get(taxonomy))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Core errors mapped onto HTTP. A null text is the caller's data problem.
pub struct ApiError(ScoreError);

impl From<ScoreError> for ApiError {
    fn from(e: ScoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, row) = match &self.0 {
            ScoreError::MissingField { row, .. } => (StatusCode::UNPROCESSABLE_ENTITY, Some(*row)),
            ScoreError::Configuration { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        warn!(error = %self.0, "request rejected");
        (status, Json(json!({ "error": self.0.to_string(), "row": row }))).into_response()
    }
}

#[derive(serde::Deserialize)]
struct ScoreReq {
    #[serde(default)]
    text: Value,
}

/// Annotated text split into runs, for clients that style marks themselves.
#[derive(serde::Serialize)]
struct SegmentOut {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    polarity: Option<Polarity>,
}

#[derive(serde::Serialize)]
struct ScoreResp {
    scores: CategoryScores,
    annotated_text: String,
    marks: Vec<Mark>,
    segments: Vec<SegmentOut>,
}

async fn score(
    State(state): State<AppState>,
    Json(body): Json<ScoreReq>,
) -> Result<Json<ScoreResp>, ApiError> {
    let record = RawRecord::from_json_value(&body.text);
    let mut scored = batch::run(&state.scorer, &[record], RunOptions::default())?;
    // run() returns exactly one row per record.
    let row = scored.remove(0);
    let annotation = Annotation {
        text: row.annotated_text,
        marks: row.marks,
    };
    let segments = annotation
        .segments()
        .into_iter()
        .map(|seg| SegmentOut {
            text: seg.text.to_string(),
            category: seg.bucket.map(|(c, _)| c),
            polarity: seg.bucket.map(|(_, p)| p),
        })
        .collect();
    Ok(Json(ScoreResp {
        scores: row.scores,
        segments,
        annotated_text: annotation.text,
        marks: annotation.marks,
    }))
}

async fn score_batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<ScoreReq>>,
) -> Result<Json<Vec<ScoredReview>>, ApiError> {
    let records: Vec<RawRecord> = items
        .iter()
        .map(|it| RawRecord::from_json_value(&it.text))
        .collect();
    let scored = batch::run(&state.scorer, &records, state.run)?;
    Ok(Json(scored))
}

#[derive(serde::Serialize)]
struct CategoryOut {
    category: Category,
    label: &'static str,
    polar: bool,
    keywords: KeywordGroup,
}

#[derive(serde::Serialize)]
struct TaxonomyOut {
    categories: Vec<CategoryOut>,
    affective_fusion: Option<&'static str>,
    annotated: Vec<Category>,
}

async fn taxonomy(State(state): State<AppState>) -> Json<TaxonomyOut> {
    let t = state.scorer.taxonomy().taxonomy();
    let categories = t
        .groups()
        .map(|(category, group)| CategoryOut {
            category,
            label: category.label(),
            polar: group.is_polar(),
            keywords: group.clone(),
        })
        .collect();
    Json(TaxonomyOut {
        categories,
        affective_fusion: state.scorer.estimator().map(|e| e.name()),
        annotated: state.scorer.annotated_categories().to_vec(),
    })
}
