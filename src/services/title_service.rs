use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::assessment::AssessmentTitleMap;
use crate::services::backend_service::BackendApi;
use crate::services::normalizer_service::ResponseNormalizer;

#[derive(Clone)]
pub struct AssessmentTitleResolver {
    api: Arc<dyn BackendApi>,
}

impl AssessmentTitleResolver {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self { api }
    }

    /// One request per call; a non-2xx answer becomes [`Error::TitleFetch`].
    #[instrument(skip(self))]
    pub async fn resolve(&self, candidate_id: &str) -> Result<AssessmentTitleMap> {
        let response = self
            .api
            .fetch_assessment_titles(candidate_id)
            .await
            .map_err(|err| match err {
                Error::Upstream { status, .. } => Error::TitleFetch { status },
                other => other,
            })?;

        let titles = ResponseNormalizer::titles(response);
        if titles.is_empty() {
            warn!(candidate_id, "No assessment titles returned");
        } else {
            info!(candidate_id, count = titles.len(), "Resolved assessment titles");
        }
        Ok(titles)
    }
}
