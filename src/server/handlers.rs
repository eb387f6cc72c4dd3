use axum::extract::{Form, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::server::form::{self, FormFields};
use crate::server::state::AppState;
use crate::server::template;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._ -]").expect("valid regex"));

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let settings = state.orchestrator.settings();
    template::render_index(&settings.converter.to_string(), settings.max_upload_bytes)
}

/// `POST /convert`: run the conversion and render the result page.
pub async fn convert_page(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let converter = state.orchestrator.settings().converter.to_string();
    let FormFields { file, options } = match form::parse_multipart(multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return (StatusCode::BAD_REQUEST, template::render_error(&converter, &e)).into_response();
        }
    };

    let report = state.orchestrator.handle(file, &options).await;
    template::render_result(&converter, &report).into_response()
}

/// `POST /api/convert`: same flow as [`convert_page`], JSON response.
pub async fn convert_api(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let FormFields { file, options } = match form::parse_multipart(multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };

    Json(state.orchestrator.handle(file, &options).await).into_response()
}

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    pub filename: String,
    /// Standard base64 of the Markdown bytes.
    pub content: String,
}

/// `POST /download`: hand the Markdown back as an attachment, byte for byte.
pub async fn download(Form(form): Form<DownloadForm>) -> Response {
    let bytes = match STANDARD.decode(form.content.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Rejected download payload: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid download payload: {e}"))
                .into_response();
        }
    };
    let filename = sanitize_download_name(&form.filename);
    (
        [
            (
                header::CONTENT_TYPE,
                "text/markdown; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// `GET /healthz`
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let converter = state.orchestrator.settings().converter.to_string();
    let available = state.orchestrator.probe_converter().await;
    Json(serde_json::json!({
        "status": "ok",
        "converter": converter,
        "converter_available": available,
    }))
}

/// Restrict the attachment name to a safe character set and force `.md`.
pub fn sanitize_download_name(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == ' ');
    let stem = cleaned.strip_suffix(".md").unwrap_or(cleaned);
    if stem.is_empty() {
        "document.md".to_string()
    } else {
        format!("{stem}.md")
    }
}
