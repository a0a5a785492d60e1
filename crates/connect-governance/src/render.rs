//! PDF rendering collaborator.
//!
//! Layout and templates live outside this service. The core hands over the
//! template name and structured data and gets opaque bytes back.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{GovernanceError, Result};

/// Turns structured template data into a PDF byte buffer.
#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, template: &str, data: &serde_json::Value) -> Result<Vec<u8>>;
}

/// Records render calls and returns a placeholder document.
#[derive(Debug, Default, Clone)]
pub struct MockPdfRenderer {
    calls: Arc<RwLock<Vec<(String, serde_json::Value)>>>,
    failing: bool,
}

impl MockPdfRenderer {
    /// Header of every buffer this renderer returns.
    pub const MAGIC: &'static [u8] = b"%PDF-1.4\n";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.read().await.clone()
    }
}

#[async_trait::async_trait]
impl PdfRenderer for MockPdfRenderer {
    async fn render(&self, template: &str, data: &serde_json::Value) -> Result<Vec<u8>> {
        if self.failing {
            return Err(GovernanceError::Collaborator("renderer unavailable".to_string()));
        }
        self.calls
            .write()
            .await
            .push((template.to_string(), data.clone()));

        let mut bytes = Self::MAGIC.to_vec();
        bytes.extend_from_slice(template.as_bytes());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_records_template_and_data() {
        let renderer = MockPdfRenderer::new();
        let bytes = renderer
            .render("intake", &json!({"subject_name": "R. Doe"}))
            .await
            .unwrap();
        assert!(bytes.starts_with(MockPdfRenderer::MAGIC));
        let calls = renderer.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "intake");
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let err = MockPdfRenderer::failing()
            .render("asam", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Collaborator(_)));
    }
}
