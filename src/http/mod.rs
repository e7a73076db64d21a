//! HTTP upload receiver
//!
//! - POST /upload - Store one `audio` multipart file under the storage directory
//! - GET /health - Health check
//!
//! Cross-origin requests are allowed from any origin.

mod handlers;
mod routes;
mod server;
mod state;

pub use handlers::{ErrorResponse, UploadResponse, AUDIO_FIELD, UPLOAD_ACK};
pub use routes::create_router;
pub use server::{serve, serve_on};
pub use state::{AppState, DEFAULT_MAX_UPLOAD_BYTES};
