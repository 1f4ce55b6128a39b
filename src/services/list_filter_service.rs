use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::models::assessment::{AssessmentResult, AssessmentTitleMap};
use crate::models::candidate::Candidate;
use crate::services::backend_service::BackendApi;
use crate::services::normalizer_service::ResponseNormalizer;
use crate::services::result_service::{InterviewRef, PerAssessmentResultFetcher};
use crate::services::title_service::AssessmentTitleResolver;
use crate::utils::fanout::map_bounded;

/// A candidate kept on the browse page, with the first valid report found for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedCandidate {
    pub candidate: Candidate,
    pub preview: AssessmentResult,
}

#[derive(Clone)]
pub struct CandidateListFilter {
    api: Arc<dyn BackendApi>,
    titles: AssessmentTitleResolver,
    fetcher: PerAssessmentResultFetcher,
    concurrency: usize,
}

impl CandidateListFilter {
    pub fn new(api: Arc<dyn BackendApi>, concurrency: usize) -> Self {
        Self {
            titles: AssessmentTitleResolver::new(api.clone()),
            fetcher: PerAssessmentResultFetcher::new(api.clone()),
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches the full list and keeps candidates with at least one valid report. Only the
    /// list call itself can fail.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ListedCandidate>> {
        let envelope = self.api.list_candidates().await?;
        let candidates = ResponseNormalizer::candidates(envelope);
        Ok(self.filter(candidates).await)
    }

    /// Output keeps the input order; excluded candidates are simply missing.
    pub async fn filter(&self, candidates: Vec<Candidate>) -> Vec<ListedCandidate> {
        let total = candidates.len();
        let this = self.clone();
        let probed = map_bounded(candidates, self.concurrency, move |candidate| {
            let this = this.clone();
            async move {
                let preview = this.first_valid_report(&candidate).await?;
                Some(ListedCandidate { candidate, preview })
            }
        })
        .await;

        let listed: Vec<ListedCandidate> = probed.into_iter().flatten().flatten().collect();
        info!(total, included = listed.len(), "Filtered candidate list");
        listed
    }

    /// Probes paid assessments in order and stops at the first valid report.
    #[instrument(skip(self, candidate), fields(candidate_id = %candidate.id))]
    async fn first_valid_report(&self, candidate: &Candidate) -> Option<AssessmentResult> {
        if !candidate.has_paid_assessments() {
            debug!("Excluded: no paid assessments");
            return None;
        }

        let titles = match self.titles.resolve(&candidate.id).await {
            Ok(titles) => titles,
            Err(err) => {
                warn!(error = %err, "Title lookup failed; probing without titles");
                AssessmentTitleMap::new()
            }
        };

        for (paid, interview_id) in candidate.interviews() {
            let interview = InterviewRef {
                interview_id: interview_id.to_string(),
                assessment_id: paid.assessment_id.clone(),
                title: titles.title_for(&paid.assessment_id),
            };
            if let Some(result) = self.fetcher.probe(&interview).await {
                return Some(result);
            }
        }

        debug!("Excluded: no assessment produced a valid report");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::backend_dto::TitlesResponse;
    use crate::error::Error;
    use crate::services::backend_service::MockBackendApi;
    use serde_json::json;

    fn valid() -> serde_json::Value {
        json!({ "success": true, "data": { "report": { "reportSkills": [ { "score": 7 } ] } } })
    }

    #[tokio::test]
    async fn list_failure_is_a_hard_error() {
        let mut api = MockBackendApi::new();
        api.expect_list_candidates()
            .returning(|| Err(Error::Upstream { endpoint: "candidates".into(), status: 502 }));

        let filter = CandidateListFilter::new(Arc::new(api), 2);
        assert!(filter.list().await.is_err());
    }

    #[tokio::test]
    async fn title_failure_does_not_exclude_candidate() {
        let mut api = MockBackendApi::new();
        api.expect_list_candidates().returning(|| {
            Ok(serde_json::from_value(json!({
                "success": true,
                "data": [ { "_id": "c1", "name": "Ann Lee",
                            "assessmentsPaid": [ { "assessmentId": "a1", "interviewId": "i1" } ] } ]
            }))
            .unwrap())
        });
        api.expect_fetch_assessment_titles()
            .returning(|_| Err(Error::Upstream { endpoint: "t".into(), status: 500 }));
        api.expect_fetch_assessment_result()
            .returning(|_| Ok(serde_json::from_value(valid()).unwrap()));

        let filter = CandidateListFilter::new(Arc::new(api), 2);
        let listed = filter.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].preview.title, "Untitled Assessment");
    }

    #[tokio::test]
    async fn stops_probing_after_first_valid_report() {
        let mut api = MockBackendApi::new();
        api.expect_fetch_assessment_titles()
            .returning(|_| Ok(TitlesResponse::default()));
        api.expect_fetch_assessment_result()
            .withf(|id| id == "i1")
            .times(1)
            .returning(|_| Ok(serde_json::from_value(valid()).unwrap()));
        api.expect_fetch_assessment_result()
            .withf(|id| id == "i2")
            .never();

        let candidate = ResponseNormalizer::candidate(
            serde_json::from_value(json!({
                "_id": "c1",
                "assessmentsPaid": [ { "assessmentId": "a1", "interviewId": "i1" },
                                     { "assessmentId": "a2", "interviewId": "i2" } ]
            }))
            .unwrap(),
        );

        let filter = CandidateListFilter::new(Arc::new(api), 1);
        assert_eq!(filter.filter(vec![candidate]).await.len(), 1);
    }
}
