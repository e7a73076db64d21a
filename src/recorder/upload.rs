use reqwest::{multipart, Client};
use tracing::info;

use super::artifact::AudioArtifact;
use super::config::RecorderConfig;
use super::error::RecorderError;
use crate::http::UploadResponse;

/// Sends artifacts to the upload receiver as a single multipart request
#[derive(Debug, Clone)]
pub struct UploadClient {
    client: Client,
    url: String,
    field: String,
    file_name: String,
}

impl UploadClient {
    pub fn new(
        url: impl Into<String>,
        field: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            field: field.into(),
            file_name: file_name.into(),
        }
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::new(
            config.upload_url.clone(),
            config.upload_field.clone(),
            config.upload_file_name.clone(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Upload one artifact; no retry, no timeout
    pub async fn upload(&self, artifact: &AudioArtifact) -> Result<UploadResponse, RecorderError> {
        let part = multipart::Part::bytes(artifact.bytes().to_vec())
            .file_name(self.file_name.clone())
            .mime_str(artifact.mime_type())?;

        let form = multipart::Form::new().part(self.field.clone(), part);

        info!("Uploading {} bytes to {}", artifact.len(), self.url);

        let response = self.client.post(&self.url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RecorderError::TransportFailure(format!(
                "server returned {}: {}",
                status, text
            )));
        }

        let ack: UploadResponse = response.json().await?;
        info!("Server response: {}", ack.message);

        Ok(ack)
    }
}
