//! HTTP surface: the HTML form plus a small JSON API

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};

use crate::error::{EstimatorError, Result};
use crate::page::{FormPage, Notice};
use crate::report::Report;
use crate::service::{EmissionService, Outcome};
use crate::types::{Feature, RawInput};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EmissionService>,
}

pub fn router(service: Arc<EmissionService>) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .route("/api/estimate", axum::routing::post(estimate_json))
        .route("/api/schema", get(schema))
        .route("/health", get(|| async { "ok" }))
        .with_state(AppState { service })
}

fn page(service: &EmissionService, submitted: &HashMap<Feature, String>) -> FormPage {
    FormPage::new(&service.profile().title, service.schema(), submitted)
}

async fn show_form(State(state): State<AppState>) -> Html<String> {
    Html(page(&state.service, &HashMap::new()).to_html())
}

async fn submit_form(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> (StatusCode, Html<String>) {
    let submitted: HashMap<Feature, String> = pairs
        .iter()
        .filter_map(|(k, v)| Feature::from_name(k).map(|f| (f, v.clone())))
        .collect();
    let view = page(&state.service, &submitted);

    let result = RawInput::from_fields(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .and_then(|raw| state.service.submit(&raw));

    let (status, notice) = match result {
        Ok(Outcome::Estimated(report)) => (StatusCode::OK, Notice::report(&report)),
        Ok(Outcome::Blocked { warning }) => (StatusCode::OK, Notice::warning(warning)),
        Err(e) if e.is_input_error() => (StatusCode::UNPROCESSABLE_ENTITY, Notice::error(&e)),
        Err(e) => {
            tracing::error!(kind = e.kind(), detail = %e, "form estimation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Notice::error(&e))
        }
    };
    (status, Html(view.with_notice(notice).to_html()))
}

#[derive(Serialize)]
struct EstimateOut<'a> {
    headline: String,
    #[serde(flatten)]
    report: &'a Report,
}

async fn estimate_json(
    State(state): State<AppState>,
    Json(body): Json<HashMap<String, Value>>,
) -> Result<Response> {
    let fields = json_fields(&body)?;
    let raw = RawInput::from_fields(fields.iter().map(|(k, v)| (*k, v.as_str())))?;

    match state.service.submit(&raw)? {
        Outcome::Estimated(report) => Ok(Json(EstimateOut {
            headline: report.headline(),
            report: &report,
        })
        .into_response()),
        Outcome::Blocked { warning } => Ok(Json(json!({ "warning": warning })).into_response()),
    }
}

/// Flattens JSON scalars to the text form the normalizer parses.
fn json_fields(body: &HashMap<String, Value>) -> Result<Vec<(&str, String)>> {
    let mut out = Vec::with_capacity(body.len());
    for (key, value) in body {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => match Feature::from_name(key) {
                Some(feature) => {
                    return Err(EstimatorError::TypeConversion {
                        field: feature.name(),
                        value: other.to_string(),
                        reason: "expected a number or a string",
                    })
                }
                None => continue,
            },
        };
        out.push((key.as_str(), text));
    }
    Ok(out)
}

async fn schema(State(state): State<AppState>) -> Json<Value> {
    let service = &state.service;
    let features: Vec<Value> = service
        .schema()
        .iter()
        .map(|f| {
            json!({
                "name": f.name(),
                "label": f.label(),
                "categorical": f.is_categorical(),
                "min": f.min(),
                "max": f.max(),
                "step": f.step(),
            })
        })
        .collect();
    Json(json!({
        "profile": service.profile(),
        "features": features,
    }))
}
