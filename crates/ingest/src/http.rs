//! HTTP implementation of the ingestion endpoint.

use crate::endpoint::{ImportCounts, ImportOptions, ImportOutcome, IngestEndpoint};
use crate::error::IngestError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Posts files to the collaborator's import endpoint as multipart uploads.
pub struct HttpIngestClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl HttpIngestClient {
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Unreachable(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
        })
    }

    async fn build_form(
        &self,
        file: &Path,
        options: &ImportOptions,
    ) -> Result<Form, IngestError> {
        let bytes = tokio::fs::read(file).await.map_err(|e| IngestError::LocalFile {
            file: file.display().to_string(),
            message: e.to_string(),
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.xlsx".to_string());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("dry_run", options.dry_run.to_string())
            .text("classify_assist", options.classify_assist.to_string());

        if options.classify_assist {
            if let Some(kind) = options.document_kind {
                form = form.text("document_kind", kind.as_str());
            }
        }
        if let Some(mapping) = &options.mapping {
            let json = serde_json::to_string(mapping)
                .map_err(|e| IngestError::Protocol(format!("cannot serialize mapping: {e}")))?;
            form = form.text("column_mapping", json);
        }
        Ok(form)
    }
}

#[async_trait]
impl IngestEndpoint for HttpIngestClient {
    async fn import_file(
        &self,
        file: &Path,
        options: &ImportOptions,
    ) -> Result<ImportOutcome, IngestError> {
        let form = self.build_form(file, options).await?;

        let response = self
            .client
            .post(&self.endpoint_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            warn!(
                file = %file.display(),
                status = status.as_u16(),
                "Import rejected by endpoint"
            );
            return Ok(ImportOutcome::failure(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let counts: ImportCounts = response
            .json()
            .await
            .map_err(|e| IngestError::Protocol(format!("invalid counts payload: {e}")))?;
        debug!(
            file = %file.display(),
            records_created = counts.records_created,
            records_reused = counts.records_reused,
            errors = counts.errors,
            dry_run = options.dry_run,
            "Import dispatched"
        );
        Ok(ImportOutcome {
            success: true,
            counts,
            error: None,
        })
    }

    async fn health_check(&self) -> Result<(), IngestError> {
        self.client
            .head(&self.endpoint_url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| IngestError::Unreachable(e.to_string()))
    }
}
