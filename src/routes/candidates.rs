use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::dto::view_dto::{
    format_score, AssessmentResultView, CandidateCard, CandidateListItem, CertificateFailureView,
    CertificateView, ProfileQuery, ProfileView, ProvisionResponse, RecordingView,
};
use crate::error::Result;
use crate::services::aggregator_service::ProfileOutcome;
use crate::services::certificate_service::ProvisionOutcome;
use crate::utils::pagination::{paginate, RESULTS_PAGE_SIZE};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_candidates(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let listed = state.list_filter.list().await?;

    let items: Vec<CandidateListItem> = listed
        .iter()
        .map(|entry| CandidateListItem {
            candidate: CandidateCard::from(&entry.candidate),
            assessment_count: entry.candidate.assessments_paid.len(),
            preview_title: entry.preview.title.clone(),
            preview_score: format_score(entry.preview.overall_score),
        })
        .collect();

    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let page = query.page.unwrap_or(1);

    let view = match state.aggregator.aggregate_by_id(&id).await? {
        ProfileOutcome::NoAssessments { candidate } => ProfileView::NoAssessments {
            candidate: CandidateCard::from(&candidate),
        },
        ProfileOutcome::Aggregated(profile) => ProfileView::Ready {
            candidate: CandidateCard::from(&profile.candidate),
            results: paginate(&profile.results, page, RESULTS_PAGE_SIZE)
                .map(|result| AssessmentResultView::from(&result)),
            recordings: profile.recordings.iter().map(RecordingView::from).collect(),
        },
    };

    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn get_recordings(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let recordings: Vec<RecordingView> = match state.aggregator.aggregate_by_id(&id).await? {
        ProfileOutcome::NoAssessments { .. } => Vec::new(),
        ProfileOutcome::Aggregated(profile) => {
            profile.recordings.iter().map(RecordingView::from).collect()
        }
    };
    Ok(Json(recordings))
}

#[axum::debug_handler]
pub async fn list_certificates(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let certificates = state.certificates.existing(&id).await?;
    let views: Vec<CertificateView> = certificates.iter().map(CertificateView::from).collect();
    Ok(Json(views))
}

#[axum::debug_handler]
pub async fn activate_certificates_tab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    tracing::info!(candidate_id = %id, "Certificates tab activated");

    let response = match state.certificates.activate(&id).await? {
        ProvisionOutcome::Ran(report) => ProvisionResponse {
            outcome: "ran",
            generated: report.generated.iter().map(CertificateView::from).collect(),
            failures: report
                .failures
                .into_iter()
                .map(|failure| CertificateFailureView {
                    interview_id: failure.interview_id,
                    error: failure.error,
                })
                .collect(),
            candidate: report.refreshed.as_ref().map(CandidateCard::from),
        },
        ProvisionOutcome::AlreadyRunning => ProvisionResponse {
            outcome: "already_running",
            generated: Vec::new(),
            failures: Vec::new(),
            candidate: None,
        },
        ProvisionOutcome::AlreadyChecked => ProvisionResponse {
            outcome: "already_checked",
            generated: Vec::new(),
            failures: Vec::new(),
            candidate: None,
        },
    };

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn deactivate_certificates_tab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.certificates.deactivate(&id);
    axum::http::StatusCode::NO_CONTENT
}
