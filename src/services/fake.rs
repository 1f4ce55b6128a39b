//! In-memory stand-ins for the backend and the PDF renderer, used by tests to script
//! scenarios (missing data, failing endpoints, slow uploads) and to count calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};

use crate::dto::backend_dto::{
    ApiEnvelope, CertificateList, CreateCertificateRequest, LinkCertificateRequest, RawCandidate,
    RawRecording, RawResultData, TitlesResponse,
};
use crate::error::{Error, Result};
use crate::services::backend_service::BackendApi;
use crate::services::pdf_service::PdfRenderer;

#[derive(Default)]
struct FakeState {
    candidates: Vec<JsonValue>,
    titles: HashMap<String, JsonValue>,
    results: HashMap<String, JsonValue>,
    recordings: HashMap<String, JsonValue>,
    user_ids: HashMap<String, String>,
    certificates: HashMap<String, Vec<JsonValue>>,
    failing: HashSet<String>,
    calls: Vec<String>,
    upload_delay: Option<Duration>,
    next_id: usize,
}

#[derive(Clone, Default)]
pub struct FakeBackendApi {
    state: Arc<Mutex<FakeState>>,
}

fn decode<T: DeserializeOwned>(value: JsonValue) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

fn simulated(key: &str) -> Error {
    Error::Upstream {
        endpoint: format!("fake/{}", key),
        status: 500,
    }
}

impl FakeBackendApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call and fails it if `key` was marked with [`FakeBackendApi::fake_fail`].
    fn enter(&self, key: String) -> Result<()> {
        let mut state = self.state();
        state.calls.push(key.clone());
        if state.failing.contains(&key) {
            return Err(simulated(&key));
        }
        Ok(())
    }

    /// Adds a candidate in backend wire format (`_id`, `assessmentsPaid`, ...).
    pub fn with_candidate(self, candidate: JsonValue) -> Self {
        self.state().candidates.push(candidate);
        self
    }

    /// `titles` is a list of `{_id, title}` objects.
    pub fn with_titles(self, candidate_id: &str, titles: JsonValue) -> Self {
        self.state().titles.insert(candidate_id.to_string(), titles);
        self
    }

    /// `result` is the full envelope returned by the result endpoint.
    pub fn with_result(self, interview_id: &str, result: JsonValue) -> Self {
        self.state().results.insert(interview_id.to_string(), result);
        self
    }

    pub fn with_recording(self, interview_id: &str, url: &str) -> Self {
        self.state()
            .recordings
            .insert(interview_id.to_string(), json!(url));
        self
    }

    pub fn with_user_id(self, interview_id: &str, user_id: &str) -> Self {
        self.state()
            .user_ids
            .insert(interview_id.to_string(), user_id.to_string());
        self
    }

    pub fn with_certificate(self, user_id: &str, certificate: JsonValue) -> Self {
        self.state()
            .certificates
            .entry(user_id.to_string())
            .or_default()
            .push(certificate);
        self
    }

    /// Makes calls with this key fail, e.g. `"result:i1"`, `"recording:i1"`, `"titles:c1"`,
    /// `"list"`, `"upload"`, `"create:i1"`.
    pub fn fake_fail(&self, key: &str) {
        self.state().failing.insert(key.to_string());
    }

    pub fn fake_reset(&self, key: &str) {
        self.state().failing.remove(key);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.state().upload_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn stored_certificates(&self, user_id: &str) -> Vec<JsonValue> {
        self.state()
            .certificates
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl BackendApi for FakeBackendApi {
    async fn list_candidates(&self) -> Result<ApiEnvelope<Vec<RawCandidate>>> {
        self.enter("list".to_string())?;
        let candidates = self.state().candidates.clone();
        decode(json!({ "success": true, "data": candidates }))
    }

    async fn fetch_candidate(&self, candidate_id: &str) -> Result<Option<RawCandidate>> {
        self.enter(format!("candidate:{}", candidate_id))?;
        let found = self
            .state()
            .candidates
            .iter()
            .find(|c| c["_id"] == candidate_id)
            .cloned();
        found.map(decode).transpose()
    }

    async fn fetch_assessment_titles(&self, candidate_id: &str) -> Result<TitlesResponse> {
        self.enter(format!("titles:{}", candidate_id))?;
        let titles = self
            .state()
            .titles
            .get(candidate_id)
            .cloned()
            .unwrap_or_else(|| json!([]));
        decode(json!({ "data": titles }))
    }

    async fn fetch_assessment_result(
        &self,
        interview_id: &str,
    ) -> Result<ApiEnvelope<RawResultData>> {
        self.enter(format!("result:{}", interview_id))?;
        let result = self.state().results.get(interview_id).cloned();
        match result {
            Some(envelope) => decode(envelope),
            None => Err(Error::Upstream {
                endpoint: "fake/result".to_string(),
                status: 404,
            }),
        }
    }

    async fn fetch_recording(&self, interview_id: &str) -> Result<ApiEnvelope<RawRecording>> {
        self.enter(format!("recording:{}", interview_id))?;
        let url = self.state().recordings.get(interview_id).cloned();
        decode(json!({ "success": true, "data": url }))
    }

    async fn resolve_user_id(&self, interview_id: &str) -> Result<String> {
        self.enter(format!("user:{}", interview_id))?;
        self.state()
            .user_ids
            .get(interview_id)
            .cloned()
            .ok_or_else(|| Error::InvalidResponse {
                endpoint: "fake/user".to_string(),
                message: format!("no user id for interview {}", interview_id),
            })
    }

    async fn fetch_certificates(&self, user_id: &str) -> Result<ApiEnvelope<CertificateList>> {
        self.enter(format!("certificates:{}", user_id))?;
        let certificates = self.stored_certificates(user_id);
        decode(json!({ "success": true, "data": { "certificates": certificates } }))
    }

    async fn create_certificate(&self, request: &CreateCertificateRequest) -> Result<String> {
        self.enter(format!("create:{}", request.interview_id))?;
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("cert-{}", state.next_id);
        state
            .certificates
            .entry(request.user_id.clone())
            .or_default()
            .push(json!({
                "_id": id,
                "interviewId": request.interview_id,
                "assessmentId": request.assessment_id,
                "certificateLink": request.certificate_link,
                "certificateId": request.certificate_id,
            }));
        Ok(id)
    }

    async fn link_certificate(&self, request: &LinkCertificateRequest) -> Result<()> {
        self.enter(format!("link:{}", request.interview_id))?;
        let mut state = self.state();
        if let Some(candidate) = state
            .candidates
            .iter_mut()
            .find(|c| c["_id"] == request.user_id.as_str())
        {
            let link = json!({
                "interviewId": request.interview_id,
                "certificateId": request.certificate_id,
            });
            match candidate.get_mut("certificates").and_then(JsonValue::as_array_mut) {
                Some(links) => links.push(link),
                None => candidate["certificates"] = json!([link]),
            }
        }
        Ok(())
    }

    async fn upload_pdf(&self, file_name: &str, pdf: Bytes) -> Result<String> {
        self.enter("upload".to_string())?;
        let delay = self.state().upload_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if !pdf.starts_with(b"%PDF") {
            return Err(Error::BadRequest("upload is not a PDF".to_string()));
        }
        Ok(format!("https://files.example.test/{}", file_name))
    }
}

/// Renderer returning a tiny fixed PDF and counting renders.
#[derive(Clone, Default)]
pub struct FakePdfRenderer {
    renders: Arc<Mutex<Vec<String>>>,
    fail: Arc<Mutex<bool>>,
}

impl FakePdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fake_fail(&self, fail: bool) {
        *self.fail.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn rendered(&self) -> Vec<String> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PdfRenderer for FakePdfRenderer {
    async fn render(&self, html: &str) -> Result<Bytes> {
        if *self.fail.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(simulated("pdf"));
        }
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(html.to_string());
        Ok(Bytes::from_static(b"%PDF-1.4\n% fake certificate\n"))
    }
}
