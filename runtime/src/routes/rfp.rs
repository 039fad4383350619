use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use tracing::{error, info};

use crate::{
    AppState,
    pipeline::{DocumentReport, document_manager::extension_of},
    routes::types::{ModelsResponse, TextRequest},
};

type ApiError = (StatusCode, String);

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    model: Option<String>,
}

pub fn rfp_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/models", get(list_models))
        .route("/rfp/upload", post(upload_rfp))
        .route("/rfp/preview", post(preview_rfp))
        .route("/rfp/text", post(analyze_text))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = state.llm_client.list_models().await;
    Json(ModelsResponse {
        default_model: state.config.llm.default_model.clone(),
        models,
    })
}

/// Pulls the `file` part (and an optional `model` part) out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;
    let mut model: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        (
            err.status(),
            format!("invalid multipart payload: {}", err.body_text()),
        )
    })? {
        match field.name() {
            Some("file") => {
                original_filename = field.file_name().map(|name| name.to_string());
                let data = field.bytes().await.map_err(|err| {
                    (
                        err.status(),
                        format!("failed to read upload field: {}", err.body_text()),
                    )
                })?;
                file_bytes = Some(data.to_vec());
            }
            Some("model") => {
                let value = field.text().await.map_err(|err| {
                    (
                        err.status(),
                        format!("failed to read model field: {}", err.body_text()),
                    )
                })?;
                model = Some(value).filter(|value| !value.trim().is_empty());
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "missing file field in multipart payload".to_string(),
        )
    })?;
    let file_name = original_filename.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "uploaded file missing filename".to_string(),
        )
    })?;
    if bytes.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "uploaded file is empty".to_string()));
    }

    Ok(Upload {
        file_name,
        bytes,
        model,
    })
}

async fn upload_rfp(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<DocumentReport>, ApiError> {
    let upload = read_upload(multipart).await?;
    let original_filename = upload.file_name;

    let stored = state
        .pipeline
        .document_manager()
        .store_upload(&original_filename, &upload.bytes)
        .await
        .map_err(|err| {
            (
                StatusCode::BAD_REQUEST,
                format!(
                    "rejected upload '{original_filename}': {err}. supported types: {:?}",
                    state.config.extraction.supported_extensions
                ),
            )
        })?;
    info!(
        file = %original_filename,
        path = %stored.display(),
        bytes = upload.bytes.len(),
        "RFP upload stored"
    );

    let report = state
        .pipeline
        .process_file(&stored, &original_filename, upload.model.as_deref())
        .await
        .map_err(|err| {
            error!(file = %original_filename, error = %err, "RFP upload processing failed");
            (StatusCode::UNPROCESSABLE_ENTITY, format!("{err:#}"))
        })?;

    Ok(Json(report))
}

/// Returns the upload as a PDF for display. Nothing is extracted.
async fn preview_rfp(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart).await?;
    let extension = extension_of(std::path::Path::new(&upload.file_name)).unwrap_or_default();
    if extension != "pdf" && !state.pipeline.is_convertible(&extension) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Unsupported file type. Please upload a PDF or Word document.".to_string(),
        ));
    }

    let stored = state
        .pipeline
        .document_manager()
        .store_upload(&upload.file_name, &upload.bytes)
        .await
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("rejected upload: {err}")))?;

    let pdf_path = state.pipeline.preview_pdf(&stored).await.map_err(|err| {
        error!(file = %upload.file_name, error = %err, "RFP preview failed");
        (StatusCode::UNPROCESSABLE_ENTITY, format!("{err:#}"))
    })?;
    let pdf = tokio::fs::read(&pdf_path).await.map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to read preview {}: {err}", pdf_path.display()),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], pdf))
}

async fn analyze_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<DocumentReport>, ApiError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "RFP text is required".to_string()));
    }

    let report = state
        .pipeline
        .process_text(text, request.model.as_deref())
        .await
        .map_err(|err| {
            error!(error = %err, "RFP text processing failed");
            (StatusCode::UNPROCESSABLE_ENTITY, format!("{err:#}"))
        })?;
    Ok(Json(report))
}
