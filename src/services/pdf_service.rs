use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};
use tracing::{instrument, warn};
use url::Url;

use crate::error::{Error, Result};

/// HTML to PDF rasterization, provided by an external rendering service.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Bytes>;
}

#[derive(Clone)]
pub struct HttpPdfRenderer {
    client: Client,
    endpoint: Url,
}

impl HttpPdfRenderer {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    #[instrument(skip(self, html), fields(html_len = html.len()))]
    async fn render(&self, html: &str) -> Result<Bytes> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header(header::ACCEPT, "application/pdf")
            .body(html.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "PDF renderer failed");
            return Err(Error::Upstream {
                endpoint: "pdf-renderer".to_string(),
                status: status.as_u16(),
            });
        }

        let pdf = response.bytes().await?;
        if !pdf.starts_with(b"%PDF") {
            return Err(Error::InvalidResponse {
                endpoint: "pdf-renderer".to_string(),
                message: "response is not a PDF document".to_string(),
            });
        }
        Ok(pdf)
    }
}

/// Stand-in used when no renderer URL is configured: every render fails, so certificate
/// generation reports a per-assessment failure instead of crashing the run.
pub struct UnconfiguredPdfRenderer;

#[async_trait]
impl PdfRenderer for UnconfiguredPdfRenderer {
    async fn render(&self, _html: &str) -> Result<Bytes> {
        Err(Error::Config(
            "PDF_RENDERER_URL is not set; cannot render certificates".to_string(),
        ))
    }
}
