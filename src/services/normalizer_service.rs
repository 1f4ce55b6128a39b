use crate::dto::backend_dto::{
    ApiEnvelope, CertificateList, RawCandidate, RawRecording, RawReportSkill, RawResultData,
    TitlesResponse,
};
use crate::models::assessment::{
    overall_score, AssessmentResult, AssessmentTitleMap, SkillResult, SkillStatus,
};
use crate::models::candidate::{
    Candidate, CandidateProfile, CertificateLink, PaidAssessment, ProfessionalInfo,
};
use crate::models::certificate::Certificate;
use crate::models::recording::{Recording, RecordingKind};

const MAX_SCORE: f64 = 10.0;

/// Turns raw backend payloads into fully populated models.
///
/// Missing lists become empty lists, missing text becomes an empty string and missing scores
/// become `None`. Nothing here fails: a payload that lacks the data we need normalizes to
/// "no data" (`None` / empty), and transport or parse errors are raised by the client before
/// a payload ever reaches this point.
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn candidate(raw: RawCandidate) -> Candidate {
        let profile = raw.profile.unwrap_or_default();
        let assessments_paid: Vec<PaidAssessment> = raw
            .assessments_paid
            .unwrap_or_default()
            .into_iter()
            .filter_map(|paid| {
                let interview_id = paid.interview_id.filter(|id| !id.is_empty());
                let assessment_id = match paid.assessment_id.filter(|id| !id.is_empty()) {
                    Some(id) => id,
                    // Keeps the interview reachable; its title resolves to the generic one.
                    None if interview_id.is_some() => {
                        tracing::warn!(
                            candidate_id = %raw.id,
                            interview_id = ?interview_id,
                            "Paid assessment without assessment id"
                        );
                        String::new()
                    }
                    None => {
                        tracing::warn!(
                            candidate_id = %raw.id,
                            "Dropping paid assessment with neither assessment nor interview id"
                        );
                        return None;
                    }
                };
                Some(PaidAssessment {
                    assessment_id,
                    interview_id,
                    assessment_id_velox: paid.assessment_id_velox,
                })
            })
            .collect();

        Candidate {
            id: raw.id,
            name: clean_text(raw.name),
            avatar_url: raw.avatar.filter(|url| !url.trim().is_empty()),
            profile: CandidateProfile {
                bio: clean_text(profile.bio),
                skills: profile.skills,
                professional_info: profile.professional_info.map(|info| ProfessionalInfo {
                    work_mode: info.work_mode.filter(|mode| !mode.trim().is_empty()),
                }),
            },
            assessments_paid,
            certificates: raw
                .certificates
                .unwrap_or_default()
                .into_iter()
                .filter_map(|link| {
                    Some(CertificateLink {
                        interview_id: link.interview_id?,
                        certificate_id: link.certificate_id?,
                    })
                })
                .collect(),
        }
    }

    pub fn candidates(envelope: ApiEnvelope<Vec<RawCandidate>>) -> Vec<Candidate> {
        if !envelope.success {
            tracing::warn!(
                message = ?envelope.message,
                "Candidate list response not marked successful; treating as empty"
            );
            return Vec::new();
        }
        envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Self::candidate)
            .collect()
    }

    /// Entries are applied in received order, so a repeated id keeps its last title.
    pub fn titles(response: TitlesResponse) -> AssessmentTitleMap {
        response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|entry| (entry.id, clean_text(entry.title)))
            .collect()
    }

    /// A report counts only when the call succeeded and `reportSkills` is present.
    pub fn has_valid_report(envelope: &ApiEnvelope<RawResultData>) -> bool {
        envelope.success
            && envelope
                .data
                .as_ref()
                .and_then(|data| data.report.as_ref())
                .is_some_and(|report| report.report_skills.is_some())
    }

    pub fn result(
        interview_id: &str,
        assessment_id: &str,
        title: &str,
        envelope: ApiEnvelope<RawResultData>,
    ) -> Option<AssessmentResult> {
        if !Self::has_valid_report(&envelope) {
            return None;
        }
        let data = envelope.data?;
        let report = data.report?;
        let fallback_status = data.status;

        let skills: Vec<SkillResult> = report
            .report_skills
            .unwrap_or_default()
            .into_iter()
            .map(|skill| Self::skill(skill, fallback_status))
            .collect();

        Some(AssessmentResult {
            interview_id: interview_id.to_string(),
            assessment_id: assessment_id.to_string(),
            title: title.to_string(),
            overall_score: overall_score(&skills),
            report_score: clamp_score(report.score),
            communication_score: clamp_score(report.communication_score),
            proctoring_score: clamp_score(
                data.proctoring_events_data
                    .and_then(|p| p.proctoring_score),
            ),
            overall_summary: clean_text(report.overall_summary),
            skills,
        })
    }

    fn skill(raw: RawReportSkill, fallback_status: Option<i64>) -> SkillResult {
        SkillResult {
            title: clean_text(raw.title),
            score: clamp_score(raw.score),
            status: SkillStatus::from_code(raw.status.or(fallback_status)),
            time_consumed_secs: raw.time_consumed.filter(|secs| *secs >= 0.0),
            strengths: raw.strengths,
            weaknesses: raw.weaknesses,
        }
    }

    /// `envelope` is `None` when the recording call itself failed.
    pub fn recording(
        interview_id: &str,
        assessment_title: &str,
        envelope: Option<ApiEnvelope<RawRecording>>,
    ) -> Recording {
        let url = envelope
            .filter(|env| env.success)
            .and_then(|env| env.data)
            .and_then(|data| match data {
                RawRecording::Url(url) => Some(url),
                RawRecording::Object { url } => url,
            })
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Recording {
            interview_id: interview_id.to_string(),
            assessment_title: assessment_title.to_string(),
            url,
            kind: RecordingKind::Video,
        }
    }

    /// Records missing an interview id or certificate id cannot be matched and are dropped.
    pub fn certificates(envelope: ApiEnvelope<CertificateList>) -> Vec<Certificate> {
        envelope
            .data
            .map(|list| list.certificates)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                Some(Certificate {
                    id: raw.id,
                    interview_id: raw.interview_id.filter(|id| !id.is_empty())?,
                    assessment_id: raw.assessment_id.unwrap_or_default(),
                    certificate_link: raw.certificate_link.unwrap_or_default(),
                    certificate_id: raw.certificate_id.filter(|id| !id.is_empty())?,
                })
            })
            .collect()
    }
}

fn clean_text(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}

fn clamp_score(score: Option<f64>) -> Option<f64> {
    score
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, MAX_SCORE))
}
