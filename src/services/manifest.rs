use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{errors::ServiceError, models::ExpectedItemPayload};

/// Result of extracting a purchase-order document: the document identifiers
/// found in the payload plus the expected-item manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedManifest {
    pub document_ids: Vec<String>,
    pub expected_items: Vec<ExpectedItemPayload>,
}

/// Boundary to the external text-extraction service. Invoked once at
/// shipment creation; the reconciliation engine never calls it.
#[async_trait]
pub trait ManifestExtractor: Send + Sync {
    async fn extract(&self, document: &[u8]) -> Result<ExtractedManifest, ServiceError>;
}

/// HTTP-backed extractor posting the raw document to a configured endpoint.
#[derive(Clone)]
pub struct HttpManifestExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpManifestExtractor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ManifestExtractor for HttpManifestExtractor {
    #[instrument(skip(self, document), fields(bytes = document.len()))]
    async fn extract(&self, document: &[u8]) -> Result<ExtractedManifest, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .body(document.to_vec())
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("Manifest extraction failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Manifest extraction returned {}",
                response.status()
            )));
        }

        response.json::<ExtractedManifest>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "Manifest extraction returned an unreadable body: {}",
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor(ExtractedManifest);

    #[async_trait]
    impl ManifestExtractor for FixedExtractor {
        async fn extract(&self, _document: &[u8]) -> Result<ExtractedManifest, ServiceError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn extractor_trait_is_object_safe_and_callable() {
        let extractor: Box<dyn ManifestExtractor> = Box::new(FixedExtractor(ExtractedManifest {
            document_ids: vec!["PO-1".into()],
            expected_items: vec![],
        }));
        let manifest = extractor.extract(b"raw pdf bytes").await.unwrap();
        assert_eq!(manifest.document_ids, vec!["PO-1".to_string()]);
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let manifest = ExtractedManifest {
            document_ids: vec!["PO-1".into()],
            expected_items: vec![],
        };
        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json.get("documentIds").is_some());
        assert!(json.get("expectedItems").is_some());
    }
}
