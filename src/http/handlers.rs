use super::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Multipart field carrying the audio
pub const AUDIO_FIELD: &str = "audio";

/// Acknowledgment returned for every stored upload
pub const UPLOAD_ACK: &str = "Audio uploaded successfully!";

/// Filename assumed when the client sends none
const DEFAULT_FILE_NAME: &str = "blob";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn multipart_error(e: MultipartError) -> Response {
    warn!("Rejected upload body: {}", e.body_text());
    error_response(e.status(), e.body_text())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /upload
/// Store one audio file sent as the `audio` multipart field
pub async fn upload_audio(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut audio: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e),
        };

        let name = field.name().unwrap_or_default().to_string();
        if name != AUDIO_FIELD && field.file_name().is_none() {
            // Plain text fields ride along with the file and are ignored
            debug!("Ignoring text field: {:?}", name);
            if let Err(e) = field.bytes().await {
                return multipart_error(e);
            }
            continue;
        }
        if name != AUDIO_FIELD || audio.is_some() {
            warn!("Unexpected multipart field: {:?}", name);
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Unexpected field `{}`; send exactly one `{}` file", name, AUDIO_FIELD),
            );
        }

        let file_name = field.file_name().unwrap_or(DEFAULT_FILE_NAME).to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return multipart_error(e),
        };

        audio = Some((file_name, bytes.to_vec()));
    }

    let Some((file_name, bytes)) = audio else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Missing `{}` file field", AUDIO_FIELD),
        );
    };

    match state.store.save(&file_name, &bytes).await {
        Ok(stored) => {
            info!(
                "File received: {} -> {} ({} bytes)",
                file_name,
                stored.path.display(),
                stored.size
            );
            (
                StatusCode::OK,
                Json(UploadResponse {
                    message: UPLOAD_ACK.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to store upload {}: {}", file_name, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store upload: {}", e),
            )
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
