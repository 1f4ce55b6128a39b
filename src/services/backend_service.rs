use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use crate::dto::backend_dto::{
    ApiEnvelope, CertificateList, CreateCertificateRequest, CreateCertificateResponse,
    LinkCertificateRequest, RawCandidate, RawRecording, RawResultData, RawUserId, TitlesResponse,
    UploadResponse,
};
use crate::error::{Error, Result};

/// Every call the portal makes against the recruitment backend.
///
/// Implementations report transport failures and non-2xx statuses as errors
/// ([`Error::Upstream`] carries the status). Payload content is returned as received; callers
/// decide what counts as "no data".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn list_candidates(&self) -> Result<ApiEnvelope<Vec<RawCandidate>>>;

    async fn fetch_candidate(&self, candidate_id: &str) -> Result<Option<RawCandidate>>;

    async fn fetch_assessment_titles(&self, candidate_id: &str) -> Result<TitlesResponse>;

    async fn fetch_assessment_result(
        &self,
        interview_id: &str,
    ) -> Result<ApiEnvelope<RawResultData>>;

    async fn fetch_recording(&self, interview_id: &str) -> Result<ApiEnvelope<RawRecording>>;

    async fn resolve_user_id(&self, interview_id: &str) -> Result<String>;

    async fn fetch_certificates(&self, user_id: &str) -> Result<ApiEnvelope<CertificateList>>;

    /// Returns the id of the created certificate record.
    async fn create_certificate(&self, request: &CreateCertificateRequest) -> Result<String>;

    async fn link_certificate(&self, request: &LinkCertificateRequest) -> Result<()>;

    /// Returns the public URL of the uploaded file.
    async fn upload_pdf(&self, file_name: &str, pdf: Bytes) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpBackendApi {
    client: Client,
    base_url: Url,
}

impl HttpBackendApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        info!("Recruitment backend client targeting {}", base_url);
        Self { client, base_url }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, endpoint, body = %body, "Backend request failed");
            return Err(Error::Upstream {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.client.get(url).send().await?;
        Self::read_json(response, segments[0..segments.len().min(2)].join("/").as_str()).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.client.request(method, url).json(body).send().await?;
        Self::read_json(response, segments.join("/").as_str()).await
    }

    async fn scan_for_candidate(&self, candidate_id: &str) -> Result<Option<RawCandidate>> {
        info!("Scanning full candidate list for {}", candidate_id);
        let list = self.list_candidates().await?;
        Ok(list
            .data
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.id == candidate_id))
    }
}

#[async_trait]
impl BackendApi for HttpBackendApi {
    #[instrument(skip(self))]
    async fn list_candidates(&self) -> Result<ApiEnvelope<Vec<RawCandidate>>> {
        self.get_json(&["browseCandidates", "candidates"]).await
    }

    #[instrument(skip(self))]
    async fn fetch_candidate(&self, candidate_id: &str) -> Result<Option<RawCandidate>> {
        let url = self.endpoint(&["browseCandidates", "candidates", candidate_id])?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => match response.json::<ApiEnvelope<RawCandidate>>().await {
                Ok(envelope) if envelope.data.is_some() => return Ok(envelope.data),
                Ok(_) => warn!("Candidate {} endpoint returned no data. Falling back to list scan.", candidate_id),
                Err(e) => warn!("Failed to parse candidate {} JSON: {}. Falling back to list scan.", candidate_id, e),
            },
            StatusCode::NOT_FOUND => {
                warn!("Candidate {} not found via direct API. Falling back to list scan.", candidate_id)
            }
            status => warn!("Candidate API returned status {}. Falling back to list scan.", status),
        }

        self.scan_for_candidate(candidate_id).await
    }

    #[instrument(skip(self))]
    async fn fetch_assessment_titles(&self, candidate_id: &str) -> Result<TitlesResponse> {
        self.get_json(&["browseCandidates", "assessments", candidate_id])
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_assessment_result(
        &self,
        interview_id: &str,
    ) -> Result<ApiEnvelope<RawResultData>> {
        self.get_json(&[
            "browseCandidates",
            "getResultForCandidateAssessment",
            interview_id,
        ])
        .await
    }

    #[instrument(skip(self))]
    async fn fetch_recording(&self, interview_id: &str) -> Result<ApiEnvelope<RawRecording>> {
        self.get_json(&["browseCandidates", "getRecording", interview_id])
            .await
    }

    #[instrument(skip(self))]
    async fn resolve_user_id(&self, interview_id: &str) -> Result<String> {
        let envelope: ApiEnvelope<RawUserId> = self
            .get_json(&["browseCandidates", "getUserIdByInterview", interview_id])
            .await?;

        match envelope.data {
            Some(user) if envelope.success => Ok(user.into_id()),
            _ => Err(Error::InvalidResponse {
                endpoint: "browseCandidates/getUserIdByInterview".to_string(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("no user id for interview {}", interview_id)),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_certificates(&self, user_id: &str) -> Result<ApiEnvelope<CertificateList>> {
        self.get_json(&["certificates", "user", user_id]).await
    }

    #[instrument(skip(self, request), fields(interview_id = %request.interview_id))]
    async fn create_certificate(&self, request: &CreateCertificateRequest) -> Result<String> {
        let created: CreateCertificateResponse = self
            .send_json(reqwest::Method::POST, &["certificates"], request)
            .await?;
        Ok(created.data.certificate.id)
    }

    #[instrument(skip(self, request), fields(interview_id = %request.interview_id))]
    async fn link_certificate(&self, request: &LinkCertificateRequest) -> Result<()> {
        let _: serde_json::Value = self
            .send_json(
                reqwest::Method::PUT,
                &["browseCandidates", "linkCertificate"],
                request,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, pdf), fields(size = pdf.len()))]
    async fn upload_pdf(&self, file_name: &str, pdf: Bytes) -> Result<String> {
        let part = multipart::Part::bytes(pdf.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);

        let url = self.endpoint(&["upload"])?;
        let response = self.client.post(url).multipart(form).send().await?;
        let uploaded: UploadResponse = Self::read_json(response, "upload").await?;
        Ok(uploaded.into_url())
    }
}
