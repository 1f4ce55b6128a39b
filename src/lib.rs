pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    aggregator_service::CandidateAggregator,
    backend_service::{BackendApi, HttpBackendApi},
    certificate_service::{CertificateProvisioner, CertificateRegistry},
    list_filter_service::CandidateListFilter,
    pdf_service::{HttpPdfRenderer, PdfRenderer, UnconfiguredPdfRenderer},
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: CandidateAggregator,
    pub list_filter: CandidateListFilter,
    pub certificates: CertificateProvisioner,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let api: Arc<dyn BackendApi> = Arc::new(HttpBackendApi::with_client(
            http_client.clone(),
            config.api_base_url.clone(),
        ));
        let renderer: Arc<dyn PdfRenderer> = match &config.pdf_renderer_url {
            Some(url) => Arc::new(HttpPdfRenderer::new(http_client, url.clone())),
            None => {
                tracing::warn!("PDF_RENDERER_URL not set; certificate generation is disabled");
                Arc::new(UnconfiguredPdfRenderer)
            }
        };

        Ok(Self::with_services(config, api, renderer))
    }

    pub fn with_services(
        config: &Config,
        api: Arc<dyn BackendApi>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        let aggregator = CandidateAggregator::new(api.clone(), config.fetch_concurrency);
        let list_filter = CandidateListFilter::new(api.clone(), config.fetch_concurrency);
        let certificates = CertificateProvisioner::new(
            api,
            renderer,
            CertificateRegistry::new(),
            config.certificate_issuer.clone(),
        );

        Self {
            aggregator,
            list_filter,
            certificates,
        }
    }
}
