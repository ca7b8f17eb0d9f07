//! JSON-over-HTTP annotation service.

use marginalia_core::{
    Annotation, AnnotationId, AnnotationService, CreatedAnnotation, DocumentId, NewAnnotation,
    ServiceError,
};
use serde::de::DeserializeOwned;

/// Talks to `{base}/api/...` with reqwest's fetch backend.
#[derive(Debug, Clone)]
pub struct HttpAnnotationService {
    client: reqwest::Client,
    base: String,
}

impl HttpAnnotationService {
    /// `base` is an absolute URL without a trailing slash.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into(),
        }
    }

    pub fn annotations_url(&self, document: &DocumentId) -> String {
        format!("{}/api/documents/{}/annotations", self.base, document)
    }

    pub fn annotation_url(&self, id: &AnnotationId) -> String {
        format!("{}/api/annotations/{}", self.base, id)
    }
}

/// Turn a non-success status into [`ServiceError::Http`] carrying the body text.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ServiceError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
    let body = response
        .text()
        .await
        .map_err(|e| ServiceError::Transport(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
}

impl AnnotationService for HttpAnnotationService {
    async fn list(&self, document: &DocumentId) -> Result<Vec<Annotation>, ServiceError> {
        let url = self.annotations_url(document);
        tracing::debug!(target: "marginalia::service", %url, "listing annotations");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        decode(check(response).await?).await
    }

    async fn create(
        &self,
        document: &DocumentId,
        annotation: &NewAnnotation,
    ) -> Result<CreatedAnnotation, ServiceError> {
        let url = self.annotations_url(document);
        tracing::debug!(
            target: "marginalia::service",
            %url,
            start = annotation.start,
            end = annotation.end,
            "creating annotation"
        );
        let response = self
            .client
            .post(&url)
            .json(annotation)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        decode(check(response).await?).await
    }

    async fn delete(&self, id: &AnnotationId) -> Result<(), ServiceError> {
        let url = self.annotation_url(id);
        tracing::debug!(target: "marginalia::service", %url, "deleting annotation");
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        check(response).await?;
        Ok(())
    }
}
