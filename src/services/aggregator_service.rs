use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::assessment::{AssessmentResult, AssessmentTitleMap};
use crate::models::candidate::Candidate;
use crate::models::recording::Recording;
use crate::services::backend_service::BackendApi;
use crate::services::normalizer_service::ResponseNormalizer;
use crate::services::result_service::{InterviewRef, PerAssessmentResultFetcher};
use crate::services::title_service::AssessmentTitleResolver;
use crate::utils::fanout::map_bounded;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedProfile {
    pub candidate: Candidate,
    pub titles: AssessmentTitleMap,
    /// In `assessments_paid` order; empty when nothing has been completed yet.
    pub results: Vec<AssessmentResult>,
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    /// Empty state: the candidate has not bought any assessment.
    NoAssessments { candidate: Candidate },
    Aggregated(AggregatedProfile),
}

impl ProfileOutcome {
    pub fn candidate(&self) -> &Candidate {
        match self {
            ProfileOutcome::NoAssessments { candidate } => candidate,
            ProfileOutcome::Aggregated(profile) => &profile.candidate,
        }
    }
}

#[derive(Clone)]
pub struct CandidateAggregator {
    api: Arc<dyn BackendApi>,
    titles: AssessmentTitleResolver,
    fetcher: PerAssessmentResultFetcher,
    concurrency: usize,
}

impl CandidateAggregator {
    pub fn new(api: Arc<dyn BackendApi>, concurrency: usize) -> Self {
        Self {
            titles: AssessmentTitleResolver::new(api.clone()),
            fetcher: PerAssessmentResultFetcher::new(api.clone()),
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Looks the candidate up first; an unknown id is [`Error::NotFound`].
    #[instrument(skip(self))]
    pub async fn aggregate_by_id(&self, candidate_id: &str) -> Result<ProfileOutcome> {
        let raw = self
            .api
            .fetch_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))?;
        self.aggregate(ResponseNormalizer::candidate(raw)).await
    }

    /// Only a title lookup failure is an error. Missing results or recordings of single
    /// interviews are logged and left out.
    #[instrument(skip(self, candidate), fields(candidate_id = %candidate.id))]
    pub async fn aggregate(&self, candidate: Candidate) -> Result<ProfileOutcome> {
        if !candidate.has_paid_assessments() {
            info!("Candidate has no paid assessments");
            return Ok(ProfileOutcome::NoAssessments { candidate });
        }

        let titles = self.titles.resolve(&candidate.id).await?;

        let mut interviews = Vec::with_capacity(candidate.assessments_paid.len());
        for paid in &candidate.assessments_paid {
            match &paid.interview_id {
                Some(interview_id) => interviews.push(InterviewRef {
                    interview_id: interview_id.clone(),
                    assessment_id: paid.assessment_id.clone(),
                    title: titles.title_for(&paid.assessment_id),
                }),
                None => warn!(
                    assessment_id = %paid.assessment_id,
                    "Skipping paid assessment without interview id"
                ),
            }
        }

        let fetcher = self.fetcher.clone();
        let fetched = map_bounded(interviews, self.concurrency, move |interview| {
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&interview).await }
        })
        .await;

        let mut results = Vec::new();
        let mut recordings = Vec::new();
        for data in fetched.into_iter().flatten() {
            if let Some(result) = data.result {
                results.push(result);
            }
            recordings.push(data.recording);
        }

        info!(
            results = results.len(),
            recordings = recordings.len(),
            "Aggregated candidate profile"
        );

        Ok(ProfileOutcome::Aggregated(AggregatedProfile {
            candidate,
            titles,
            results,
            recordings,
        }))
    }
}
