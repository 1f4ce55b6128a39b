//! Display models served to the UI. This is the only place where missing values turn into
//! `"N/A"` and durations into `m:ss`.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::assessment::{AssessmentResult, SkillResult};
use crate::models::candidate::Candidate;
use crate::models::certificate::Certificate;
use crate::models::recording::Recording;
use crate::utils::pagination::Page;
use crate::utils::time::format_time;

pub const NOT_AVAILABLE: &str = "N/A";

/// One decimal, trailing `.0` dropped; `"N/A"` when absent.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(value) if value.is_finite() => {
            let rounded = (value * 10.0).round() / 10.0;
            if rounded.fract() == 0.0 {
                format!("{}", rounded as i64)
            } else {
                format!("{:.1}", rounded)
            }
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfileQuery {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateCard {
    pub id: String,
    pub name: String,
    pub initials: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub skills: Vec<String>,
    pub work_mode: Option<String>,
}

impl From<&Candidate> for CandidateCard {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            initials: candidate.initials(),
            avatar_url: candidate.avatar_url.clone(),
            bio: candidate.profile.bio.clone(),
            skills: candidate.profile.skills.clone(),
            work_mode: candidate
                .profile
                .professional_info
                .as_ref()
                .and_then(|info| info.work_mode.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillView {
    pub title: String,
    pub score: String,
    pub status: &'static str,
    pub time_consumed: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl From<&SkillResult> for SkillView {
    fn from(skill: &SkillResult) -> Self {
        Self {
            title: skill.title.clone(),
            score: format_score(skill.score),
            status: skill.status.label(),
            time_consumed: format_time(skill.time_consumed_secs),
            strengths: skill.strengths.clone(),
            weaknesses: skill.weaknesses.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentResultView {
    pub interview_id: String,
    pub assessment_id: String,
    pub title: String,
    pub overall_score: String,
    pub report_score: String,
    pub communication_score: String,
    pub proctoring_score: String,
    pub overall_summary: String,
    pub skills: Vec<SkillView>,
}

impl From<&AssessmentResult> for AssessmentResultView {
    fn from(result: &AssessmentResult) -> Self {
        Self {
            interview_id: result.interview_id.clone(),
            assessment_id: result.assessment_id.clone(),
            title: result.title.clone(),
            overall_score: format_score(result.overall_score),
            report_score: format_score(result.report_score),
            communication_score: format_score(result.communication_score),
            proctoring_score: format_score(result.proctoring_score),
            overall_summary: result.overall_summary.clone(),
            skills: result.skills.iter().map(SkillView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingView {
    pub interview_id: String,
    pub assessment_title: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub available: bool,
}

impl From<&Recording> for RecordingView {
    fn from(recording: &Recording) -> Self {
        Self {
            interview_id: recording.interview_id.clone(),
            assessment_title: recording.assessment_title.clone(),
            url: recording.url.clone(),
            kind: "video",
            available: recording.has_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProfileView {
    /// The candidate has no paid assessments at all.
    NoAssessments { candidate: CandidateCard },
    Ready {
        candidate: CandidateCard,
        results: Page<AssessmentResultView>,
        recordings: Vec<RecordingView>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateListItem {
    pub candidate: CandidateCard,
    pub assessment_count: usize,
    pub preview_title: String,
    pub preview_score: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateView {
    pub interview_id: String,
    pub assessment_id: String,
    pub certificate_id: String,
    pub certificate_link: String,
}

impl From<&Certificate> for CertificateView {
    fn from(certificate: &Certificate) -> Self {
        Self {
            interview_id: certificate.interview_id.clone(),
            assessment_id: certificate.assessment_id.clone(),
            certificate_id: certificate.certificate_id.clone(),
            certificate_link: certificate.certificate_link.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateFailureView {
    pub interview_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionResponse {
    /// `ran`, `already_running` or `already_checked`.
    pub outcome: &'static str,
    pub generated: Vec<CertificateView>,
    pub failures: Vec<CertificateFailureView>,
    pub candidate: Option<CandidateCard>,
}
