use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, instrument, warn};

use crate::dto::backend_dto::{CreateCertificateRequest, LinkCertificateRequest};
use crate::error::{Error, Result};
use crate::models::assessment::AssessmentTitleMap;
use crate::models::candidate::{Candidate, PaidAssessment};
use crate::models::certificate::{certificate_id, Certificate};
use crate::services::backend_service::BackendApi;
use crate::services::certificate_template::{render_certificate_html, CertificateContent};
use crate::services::normalizer_service::ResponseNormalizer;
use crate::services::pdf_service::PdfRenderer;
use crate::services::result_service::{InterviewRef, PerAssessmentResultFetcher};
use crate::services::title_service::AssessmentTitleResolver;
use crate::utils::time::current_year;

/// Per-candidate progress of certificate provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProvisionState {
    #[default]
    Idle,
    Checking,
    Generating { interview_id: String, remaining: usize },
    /// Checked for this tab visit; cleared when the tab is left.
    Done { generated: usize },
}

impl ProvisionState {
    fn is_running(&self) -> bool {
        matches!(self, ProvisionState::Checking | ProvisionState::Generating { .. })
    }
}

#[derive(Debug, Default)]
struct Entry {
    state: ProvisionState,
    /// Tab was left while a run was in flight; go back to `Idle` when it ends.
    reset_requested: bool,
    known: Vec<Certificate>,
}

enum Begin {
    Started,
    AlreadyRunning,
    AlreadyChecked,
}

/// Shared provisioning state, keyed by candidate id. The lock is never held across `.await`.
#[derive(Clone, Default)]
pub struct CertificateRegistry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl CertificateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, candidate_id: &str) -> ProvisionState {
        self.lock()
            .get(candidate_id)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Certificates this process has generated for the candidate.
    pub fn known(&self, candidate_id: &str) -> Vec<Certificate> {
        self.lock()
            .get(candidate_id)
            .map(|entry| entry.known.clone())
            .unwrap_or_default()
    }

    fn try_begin(&self, candidate_id: &str) -> Begin {
        let mut entries = self.lock();
        let entry = entries.entry(candidate_id.to_string()).or_default();
        if entry.state.is_running() {
            return Begin::AlreadyRunning;
        }
        if matches!(entry.state, ProvisionState::Done { .. }) {
            return Begin::AlreadyChecked;
        }
        entry.state = ProvisionState::Checking;
        entry.reset_requested = false;
        Begin::Started
    }

    fn set_state(&self, candidate_id: &str, state: ProvisionState) {
        self.lock()
            .entry(candidate_id.to_string())
            .or_default()
            .state = state;
    }

    fn remember(&self, candidate_id: &str, certificate: Certificate) {
        self.lock()
            .entry(candidate_id.to_string())
            .or_default()
            .known
            .push(certificate);
    }

    fn finish(&self, candidate_id: &str, outcome: Option<usize>) {
        let mut entries = self.lock();
        let entry = entries.entry(candidate_id.to_string()).or_default();
        entry.state = match outcome {
            Some(generated) if !entry.reset_requested => ProvisionState::Done { generated },
            _ => ProvisionState::Idle,
        };
        entry.reset_requested = false;
    }

    /// Tab left: the one-shot check may run again on the next activation.
    pub fn deactivate(&self, candidate_id: &str) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(candidate_id) {
            if entry.state.is_running() {
                entry.reset_requested = true;
            } else {
                entry.state = ProvisionState::Idle;
            }
        }
    }
}

/// Returns the candidate to `Idle` if a run is dropped before it finishes.
struct RunGuard<'a> {
    registry: &'a CertificateRegistry,
    candidate_id: &'a str,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, outcome: Option<usize>) {
        self.registry.finish(self.candidate_id, outcome);
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.registry.finish(self.candidate_id, None);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionFailure {
    pub interview_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionReport {
    pub generated: Vec<Certificate>,
    pub failures: Vec<ProvisionFailure>,
    /// Fresh candidate data, fetched only when something was generated.
    pub refreshed: Option<Candidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    Ran(ProvisionReport),
    AlreadyRunning,
    AlreadyChecked,
}

#[derive(Clone)]
pub struct CertificateProvisioner {
    api: Arc<dyn BackendApi>,
    renderer: Arc<dyn PdfRenderer>,
    registry: CertificateRegistry,
    titles: AssessmentTitleResolver,
    fetcher: PerAssessmentResultFetcher,
    issuer: String,
}

impl CertificateProvisioner {
    pub fn new(
        api: Arc<dyn BackendApi>,
        renderer: Arc<dyn PdfRenderer>,
        registry: CertificateRegistry,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            titles: AssessmentTitleResolver::new(api.clone()),
            fetcher: PerAssessmentResultFetcher::new(api.clone()),
            api,
            renderer,
            registry,
            issuer: issuer.into(),
        }
    }

    pub fn registry(&self) -> &CertificateRegistry {
        &self.registry
    }

    /// Certificates-tab activation. Runs the check at most once per tab visit and never twice
    /// at the same time for one candidate.
    #[instrument(skip(self))]
    pub async fn activate(&self, candidate_id: &str) -> Result<ProvisionOutcome> {
        match self.registry.try_begin(candidate_id) {
            Begin::AlreadyRunning => {
                info!("Certificate provisioning already running");
                return Ok(ProvisionOutcome::AlreadyRunning);
            }
            Begin::AlreadyChecked => return Ok(ProvisionOutcome::AlreadyChecked),
            Begin::Started => {}
        }

        let guard = RunGuard {
            registry: &self.registry,
            candidate_id,
            finished: false,
        };

        match self.run(candidate_id).await {
            Ok(report) => {
                guard.finish(Some(report.generated.len()));
                Ok(ProvisionOutcome::Ran(report))
            }
            Err(err) => {
                error!(error = %err, "Certificate check failed");
                guard.finish(None);
                Err(err)
            }
        }
    }

    pub fn deactivate(&self, candidate_id: &str) {
        self.registry.deactivate(candidate_id);
    }

    /// Existing certificates for the candidate as the backend reports them.
    pub async fn existing(&self, candidate_id: &str) -> Result<Vec<Certificate>> {
        let candidate = self.candidate(candidate_id).await?;
        let user_id = self.user_id_for(&candidate).await;
        self.certificates_of(&user_id).await
    }

    async fn candidate(&self, candidate_id: &str) -> Result<Candidate> {
        self.api
            .fetch_candidate(candidate_id)
            .await?
            .map(ResponseNormalizer::candidate)
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }

    /// Certificates are stored under the backend user id, which is looked up through the first
    /// interview. Falls back to the candidate id when there is no interview or the lookup fails.
    async fn user_id_for(&self, candidate: &Candidate) -> String {
        let Some((_, interview_id)) = candidate.interviews().next() else {
            return candidate.id.clone();
        };
        match self.api.resolve_user_id(interview_id).await {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(%interview_id, error = %err, "User id lookup failed; using candidate id");
                candidate.id.clone()
            }
        }
    }

    async fn certificates_of(&self, user_id: &str) -> Result<Vec<Certificate>> {
        let envelope = self.api.fetch_certificates(user_id).await?;
        Ok(ResponseNormalizer::certificates(envelope))
    }

    async fn run(&self, candidate_id: &str) -> Result<ProvisionReport> {
        let candidate = self.candidate(candidate_id).await?;
        let user_id = self.user_id_for(&candidate).await;
        let backend = self.certificates_of(&user_id).await?;
        let pending = pending_assessments(
            &candidate,
            &self.registry.known(candidate_id),
            &backend,
        );

        let mut report = ProvisionReport {
            generated: Vec::new(),
            failures: Vec::new(),
            refreshed: None,
        };

        if pending.is_empty() {
            info!("All paid assessments already have certificates");
            return Ok(report);
        }

        let titles = match self.titles.resolve(candidate_id).await {
            Ok(titles) => titles,
            Err(err) => {
                warn!(error = %err, "Title lookup failed; certificates use a generic title");
                AssessmentTitleMap::new()
            }
        };

        let total = pending.len();
        for (index, (paid, interview_id)) in pending.into_iter().enumerate() {
            self.registry.set_state(
                candidate_id,
                ProvisionState::Generating {
                    interview_id: interview_id.clone(),
                    remaining: total - index,
                },
            );

            match self.generate(&candidate, &paid, &interview_id, &titles).await {
                Ok(certificate) => {
                    info!(%interview_id, certificate_id = %certificate.certificate_id, "Certificate generated");
                    self.registry.remember(candidate_id, certificate.clone());
                    report.generated.push(certificate);
                }
                Err(err) => {
                    warn!(%interview_id, error = %err, "Certificate generation failed");
                    report.failures.push(ProvisionFailure {
                        interview_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        if !report.generated.is_empty() {
            report.refreshed = match self.api.fetch_candidate(candidate_id).await {
                Ok(raw) => raw.map(ResponseNormalizer::candidate),
                Err(err) => {
                    warn!(error = %err, "Failed to refresh candidate after generation");
                    None
                }
            };
        }

        Ok(report)
    }

    #[instrument(skip(self, candidate, paid, titles), fields(candidate_id = %candidate.id))]
    async fn generate(
        &self,
        candidate: &Candidate,
        paid: &PaidAssessment,
        interview_id: &str,
        titles: &AssessmentTitleMap,
    ) -> Result<Certificate> {
        let title = titles.title_for(&paid.assessment_id);
        let score = self
            .fetcher
            .probe(&InterviewRef {
                interview_id: interview_id.to_string(),
                assessment_id: paid.assessment_id.clone(),
                title: title.clone(),
            })
            .await
            .and_then(|result| result.overall_score);

        let cert_id = certificate_id(interview_id, current_year());
        let issued_on = chrono::Utc::now().format("%B %-d, %Y").to_string();
        let html = render_certificate_html(&CertificateContent {
            issuer: &self.issuer,
            candidate_name: &candidate.name,
            assessment_title: &title,
            score,
            certificate_id: &cert_id,
            issued_on: &issued_on,
        });

        let pdf = self.renderer.render(&html).await?;
        let link = self
            .api
            .upload_pdf(&format!("{}.pdf", cert_id), pdf)
            .await?;
        let user_id = self.api.resolve_user_id(interview_id).await?;

        let record_id = self
            .api
            .create_certificate(&CreateCertificateRequest {
                user_id: user_id.clone(),
                interview_id: interview_id.to_string(),
                assessment_id: paid.assessment_id.clone(),
                assessment_title: title,
                certificate_link: link.clone(),
                certificate_id: cert_id.clone(),
                score,
            })
            .await?;

        self.api
            .link_certificate(&LinkCertificateRequest {
                user_id,
                interview_id: interview_id.to_string(),
                certificate_id: record_id.clone(),
            })
            .await?;

        Ok(Certificate {
            id: Some(record_id),
            interview_id: interview_id.to_string(),
            assessment_id: paid.assessment_id.clone(),
            certificate_link: link,
            certificate_id: cert_id,
        })
    }
}

/// Paid assessments with an interview id that neither the local cache, the candidate record
/// nor the backend list covers. Order follows `assessments_paid`.
fn pending_assessments(
    candidate: &Candidate,
    known: &[Certificate],
    backend: &[Certificate],
) -> Vec<(PaidAssessment, String)> {
    let covered: HashSet<&str> = known
        .iter()
        .chain(backend)
        .map(|c| c.interview_id.as_str())
        .chain(candidate.certificates.iter().map(|l| l.interview_id.as_str()))
        .collect();

    let mut seen = HashSet::new();
    candidate
        .interviews()
        .filter(|(_, interview_id)| !covered.contains(interview_id))
        .filter(|(_, interview_id)| seen.insert(interview_id.to_string()))
        .map(|(paid, interview_id)| (paid.clone(), interview_id.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake::{FakeBackendApi, FakePdfRenderer};
    use crate::services::pdf_service::UnconfiguredPdfRenderer;
    use serde_json::json;
    use std::time::Duration;

    fn backend() -> FakeBackendApi {
        FakeBackendApi::new()
            .with_candidate(json!({
                "_id": "c1",
                "name": "Jane Roe",
                "assessmentsPaid": [
                    { "assessmentId": "a1", "interviewId": "interview-0001" },
                    { "assessmentId": "a2", "interviewId": "interview-0002" },
                    { "assessmentId": "a3" }
                ]
            }))
            .with_titles("c1", json!([ { "_id": "a1", "title": "SQL Test" },
                                       { "_id": "a2", "title": "Rust Test" } ]))
            .with_result("interview-0001", json!({
                "success": true,
                "data": { "report": { "reportSkills": [ { "score": 8 } ] } }
            }))
            .with_user_id("interview-0001", "c1")
            .with_user_id("interview-0002", "c1")
    }

    fn provisioner(api: &FakeBackendApi, renderer: &FakePdfRenderer) -> CertificateProvisioner {
        CertificateProvisioner::new(
            Arc::new(api.clone()),
            Arc::new(renderer.clone()),
            CertificateRegistry::new(),
            "Candidate Portal",
        )
    }

    #[tokio::test]
    async fn generates_missing_certificates_and_refreshes() {
        let api = backend().with_certificate(
            "c1",
            json!({ "_id": "old", "interviewId": "interview-0002", "certificateId": "EJ-CERT-2025-intervie" }),
        );
        let renderer = FakePdfRenderer::new();
        let provisioner = provisioner(&api, &renderer);

        let ProvisionOutcome::Ran(report) = provisioner.activate("c1").await.unwrap() else {
            panic!("expected a run");
        };

        assert_eq!(report.generated.len(), 1);
        let cert = &report.generated[0];
        assert_eq!(cert.interview_id, "interview-0001");
        assert!(cert.certificate_id.starts_with("EJ-CERT-"));
        assert!(cert.certificate_id.ends_with("-intervie"));
        assert!(cert.certificate_link.ends_with(".pdf"));
        assert!(report.failures.is_empty());

        let refreshed = report.refreshed.expect("candidate refreshed");
        assert_eq!(refreshed.certificates.len(), 1);
        assert!(renderer.rendered()[0].contains("SQL Test"));
        assert_eq!(
            provisioner.registry().state("c1"),
            ProvisionState::Done { generated: 1 }
        );
    }

    #[tokio::test]
    async fn second_activation_in_same_visit_is_a_no_op() {
        let api = backend();
        let renderer = FakePdfRenderer::new();
        let provisioner = provisioner(&api, &renderer);

        assert!(matches!(provisioner.activate("c1").await.unwrap(), ProvisionOutcome::Ran(_)));
        assert_eq!(
            provisioner.activate("c1").await.unwrap(),
            ProvisionOutcome::AlreadyChecked
        );
        assert_eq!(api.call_count("create:"), 2);
    }

    #[tokio::test]
    async fn concurrent_activation_runs_once() {
        let api = backend();
        api.set_upload_delay(Duration::from_millis(50));
        let renderer = FakePdfRenderer::new();
        let provisioner = provisioner(&api, &renderer);

        let (first, second) = tokio::join!(provisioner.activate("c1"), provisioner.activate("c1"));
        let outcomes = [first.unwrap(), second.unwrap()];

        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, ProvisionOutcome::Ran(_)))
                .count(),
            1
        );
        assert!(outcomes.contains(&ProvisionOutcome::AlreadyRunning));
        assert_eq!(api.call_count("create:interview-0001"), 1);
        assert_eq!(api.call_count("create:interview-0002"), 1);
    }

    #[tokio::test]
    async fn leaving_the_tab_allows_a_new_check_without_duplicates() {
        let api = backend();
        let renderer = FakePdfRenderer::new();
        let provisioner = provisioner(&api, &renderer);

        provisioner.activate("c1").await.unwrap();
        provisioner.deactivate("c1");
        assert_eq!(provisioner.registry().state("c1"), ProvisionState::Idle);

        let ProvisionOutcome::Ran(report) = provisioner.activate("c1").await.unwrap() else {
            panic!("expected a second run after leaving the tab");
        };
        assert!(report.generated.is_empty());
        assert_eq!(api.call_count("create:"), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_chain() {
        let api = backend();
        api.fake_fail("create:interview-0001");
        let renderer = FakePdfRenderer::new();
        let provisioner = provisioner(&api, &renderer);

        let ProvisionOutcome::Ran(report) = provisioner.activate("c1").await.unwrap() else {
            panic!("expected a run");
        };
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].interview_id, "interview-0001");
        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.generated[0].interview_id, "interview-0002");
    }

    #[tokio::test]
    async fn check_failure_resets_to_idle() {
        let api = backend();
        api.fake_fail("certificates:c1");
        let renderer = FakePdfRenderer::new();
        let provisioner = provisioner(&api, &renderer);

        assert!(provisioner.activate("c1").await.is_err());
        assert_eq!(provisioner.registry().state("c1"), ProvisionState::Idle);

        api.fake_reset("certificates:c1");
        assert!(matches!(provisioner.activate("c1").await.unwrap(), ProvisionOutcome::Ran(_)));
    }

    #[tokio::test]
    async fn existence_check_uses_the_backend_user_id() {
        let api = backend()
            .with_user_id("interview-0001", "u1")
            .with_user_id("interview-0002", "u1");

        // Separate registries stand for a restart between the two visits.
        for _ in 0..2 {
            let renderer = FakePdfRenderer::new();
            provisioner(&api, &renderer).activate("c1").await.unwrap();
        }

        assert_eq!(api.call_count("create:interview-0001"), 1);
        assert_eq!(api.call_count("create:interview-0002"), 1);
        assert_eq!(api.stored_certificates("u1").len(), 2);
        assert!(api.calls().iter().any(|call| call == "certificates:u1"));
        assert!(!api.calls().iter().any(|call| call == "certificates:c1"));
    }

    #[tokio::test]
    async fn existing_falls_back_to_candidate_id_when_user_lookup_fails() {
        let api = backend().with_certificate(
            "c1",
            json!({ "_id": "old", "interviewId": "interview-0002", "certificateId": "EJ-CERT-2025-intervie" }),
        );
        api.fake_fail("user:interview-0001");
        let provisioner = provisioner(&api, &FakePdfRenderer::new());

        let existing = provisioner.existing("c1").await.unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].interview_id, "interview-0002");
        assert_eq!(api.call_count("certificates:c1"), 1);
    }

    #[tokio::test]
    async fn missing_renderer_fails_every_item() {
        let api = backend();
        let provisioner = CertificateProvisioner::new(
            Arc::new(api.clone()),
            Arc::new(UnconfiguredPdfRenderer),
            CertificateRegistry::new(),
            "Candidate Portal",
        );

        let ProvisionOutcome::Ran(report) = provisioner.activate("c1").await.unwrap() else {
            panic!("expected a run");
        };

        assert!(report.generated.is_empty());
        assert!(report.refreshed.is_none());
        let failed: Vec<&str> = report
            .failures
            .iter()
            .map(|f| f.interview_id.as_str())
            .collect();
        assert_eq!(failed, vec!["interview-0001", "interview-0002"]);
        assert!(report
            .failures
            .iter()
            .all(|f| f.error.contains("PDF_RENDERER_URL")));
        assert_eq!(
            provisioner.registry().state("c1"),
            ProvisionState::Done { generated: 0 }
        );
        assert_eq!(api.call_count("upload"), 0);
        assert_eq!(api.call_count("create:"), 0);
    }

    #[tokio::test]
    async fn renderer_outage_is_retried_on_next_visit() {
        let api = backend();
        let renderer = FakePdfRenderer::new();
        renderer.fake_fail(true);
        let provisioner = provisioner(&api, &renderer);

        let ProvisionOutcome::Ran(report) = provisioner.activate("c1").await.unwrap() else {
            panic!("expected a run");
        };
        assert_eq!(report.failures.len(), 2);
        assert_eq!(api.call_count("upload"), 0);

        renderer.fake_fail(false);
        provisioner.deactivate("c1");
        let ProvisionOutcome::Ran(report) = provisioner.activate("c1").await.unwrap() else {
            panic!("expected a second run");
        };
        assert_eq!(report.generated.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn deactivate_during_run_defers_reset() {
        let registry = CertificateRegistry::new();
        assert!(matches!(registry.try_begin("c1"), Begin::Started));
        registry.deactivate("c1");
        assert_eq!(registry.state("c1"), ProvisionState::Checking);
        assert!(matches!(registry.try_begin("c1"), Begin::AlreadyRunning));

        registry.finish("c1", Some(2));
        assert_eq!(registry.state("c1"), ProvisionState::Idle);
    }

    #[test]
    fn pending_skips_covered_and_interviewless_entries() {
        let candidate = ResponseNormalizer::candidate(
            serde_json::from_value(json!({
                "_id": "c1",
                "assessmentsPaid": [
                    { "assessmentId": "a1", "interviewId": "i1" },
                    { "assessmentId": "a2", "interviewId": "i2" },
                    { "assessmentId": "a3", "interviewId": "i3" },
                    { "assessmentId": "a4" }
                ],
                "certificates": [ { "interviewId": "i3", "certificateId": "x" } ]
            }))
            .unwrap(),
        );
        let known = vec![Certificate {
            id: None,
            interview_id: "i1".into(),
            assessment_id: "a1".into(),
            certificate_link: String::new(),
            certificate_id: "EJ-CERT-2026-i1".into(),
        }];

        let pending = pending_assessments(&candidate, &known, &[]);
        let ids: Vec<&str> = pending.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(ids, vec!["i2"]);
    }
}
