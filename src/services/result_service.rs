use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::models::assessment::AssessmentResult;
use crate::models::recording::Recording;
use crate::services::backend_service::BackendApi;
use crate::services::normalizer_service::ResponseNormalizer;

/// What one interview contributed. `result` is `None` when the report is missing or its fetch
/// failed; `recording` is always present, with `url: None` when there is nothing to play.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewData {
    pub result: Option<AssessmentResult>,
    pub recording: Recording,
}

/// Identifies one paid assessment attempt to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewRef {
    pub interview_id: String,
    pub assessment_id: String,
    pub title: String,
}

#[derive(Clone)]
pub struct PerAssessmentResultFetcher {
    api: Arc<dyn BackendApi>,
}

impl PerAssessmentResultFetcher {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self { api }
    }

    /// Result and recording are fetched side by side; a failure of one never hides the other.
    #[instrument(skip(self, interview), fields(interview_id = %interview.interview_id))]
    pub async fn fetch(&self, interview: &InterviewRef) -> InterviewData {
        let id = interview.interview_id.as_str();
        let (result, recording) = tokio::join!(
            self.api.fetch_assessment_result(id),
            self.api.fetch_recording(id)
        );

        let result = match result {
            Ok(envelope) => {
                let normalized = ResponseNormalizer::result(
                    id,
                    &interview.assessment_id,
                    &interview.title,
                    envelope,
                );
                if normalized.is_none() {
                    debug!("No scored report for interview");
                }
                normalized
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch assessment result");
                None
            }
        };

        let recording = match recording {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!(error = %err, "Failed to fetch recording");
                None
            }
        };

        InterviewData {
            result,
            recording: ResponseNormalizer::recording(id, &interview.title, recording),
        }
    }

    /// Result-only fetch used by the list, which needs the report but not the recording.
    pub async fn probe(&self, interview: &InterviewRef) -> Option<AssessmentResult> {
        match self.api.fetch_assessment_result(&interview.interview_id).await {
            Ok(envelope) => ResponseNormalizer::result(
                &interview.interview_id,
                &interview.assessment_id,
                &interview.title,
                envelope,
            ),
            Err(err) => {
                warn!(interview_id = %interview.interview_id, error = %err, "Result probe failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::backend_dto::ApiEnvelope;
    use crate::error::Error;
    use crate::services::backend_service::MockBackendApi;
    use serde_json::json;

    fn interview() -> InterviewRef {
        InterviewRef {
            interview_id: "i1".into(),
            assessment_id: "a1".into(),
            title: "SQL Test".into(),
        }
    }

    fn upstream(status: u16) -> Error {
        Error::Upstream {
            endpoint: "browseCandidates".into(),
            status,
        }
    }

    fn valid_result() -> ApiEnvelope<crate::dto::backend_dto::RawResultData> {
        serde_json::from_value(json!({
            "success": true,
            "data": { "report": { "reportSkills": [ { "title": "Joins", "score": 8 } ] } }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn recording_failure_keeps_result() {
        let mut api = MockBackendApi::new();
        api.expect_fetch_assessment_result()
            .returning(|_| Ok(valid_result()));
        api.expect_fetch_recording()
            .returning(|_| Err(upstream(500)));

        let data = PerAssessmentResultFetcher::new(Arc::new(api))
            .fetch(&interview())
            .await;
        let result = data.result.expect("result survives recording failure");
        assert_eq!(result.overall_score, Some(8.0));
        assert_eq!(result.title, "SQL Test");
        assert_eq!(data.recording.url, None);
        assert_eq!(data.recording.assessment_title, "SQL Test");
    }

    #[tokio::test]
    async fn result_failure_keeps_recording() {
        let mut api = MockBackendApi::new();
        api.expect_fetch_assessment_result()
            .returning(|_| Err(upstream(404)));
        api.expect_fetch_recording().returning(|_| {
            Ok(serde_json::from_value(json!({ "success": true, "data": "https://cdn.test/v.mp4" }))
                .unwrap())
        });

        let data = PerAssessmentResultFetcher::new(Arc::new(api))
            .fetch(&interview())
            .await;
        assert!(data.result.is_none());
        assert_eq!(data.recording.url.as_deref(), Some("https://cdn.test/v.mp4"));
    }

    #[tokio::test]
    async fn probe_rejects_reports_without_skills() {
        let mut api = MockBackendApi::new();
        api.expect_fetch_assessment_result().returning(|_| {
            Ok(serde_json::from_value(json!({ "success": true, "data": { "report": {} } })).unwrap())
        });

        let fetcher = PerAssessmentResultFetcher::new(Arc::new(api));
        assert!(fetcher.probe(&interview()).await.is_none());
    }
}
