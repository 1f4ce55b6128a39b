//! Wire shapes of the recruitment backend. Every field the backend may omit is optional or
//! defaulted here; `services::normalizer_service` turns these into the typed models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

fn deserialize_number_flexible<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
        Other(JsonValue),
    }

    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(NumberOrText::Other(_)) | None => None,
    }
    .filter(|n| n.is_finite()))
}

fn deserialize_code_flexible<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_number_flexible(deserializer)?
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64))
}

fn deserialize_string_list_flexible<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrText {
        List(Vec<JsonValue>),
        Text(String),
        Other(JsonValue),
    }

    Ok(match Option::<ListOrText>::deserialize(deserializer)? {
        Some(ListOrText::List(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::String(s) => Some(s),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(ListOrText::Text(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

/// `{success, data, message}` envelope used by most endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    #[serde(default, alias = "avatarUrl", alias = "profilePicture")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub profile: Option<RawProfile>,
    #[serde(default)]
    pub assessments_paid: Option<Vec<RawPaidAssessment>>,
    #[serde(default)]
    pub certificates: Option<Vec<RawCertificateLink>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_list_flexible")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub professional_info: Option<RawProfessionalInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfessionalInfo {
    #[serde(default)]
    pub work_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPaidAssessment {
    #[serde(default)]
    pub assessment_id: Option<String>,
    #[serde(default)]
    pub interview_id: Option<String>,
    #[serde(default)]
    pub assessment_id_velox: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCertificateLink {
    #[serde(default)]
    pub interview_id: Option<String>,
    #[serde(default)]
    pub certificate_id: Option<String>,
}

/// Titles endpoint: `{data: [{_id, title}]}`, no success flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitlesResponse {
    #[serde(default)]
    pub data: Option<Vec<RawAssessmentTitle>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAssessmentTitle {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResultData {
    #[serde(default)]
    pub report: Option<RawReport>,
    #[serde(default, deserialize_with = "deserialize_code_flexible")]
    pub status: Option<i64>,
    #[serde(default)]
    pub proctoring_events_data: Option<RawProctoring>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    /// `None` when the backend omitted the key entirely; that is "no valid report".
    #[serde(default)]
    pub report_skills: Option<Vec<RawReportSkill>>,
    #[serde(default, deserialize_with = "deserialize_number_flexible")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_number_flexible")]
    pub communication_score: Option<f64>,
    #[serde(default)]
    pub overall_summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReportSkill {
    #[serde(default, alias = "skillName", alias = "skill")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number_flexible")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_code_flexible")]
    pub status: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_number_flexible")]
    pub time_consumed: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_string_list_flexible")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_list_flexible")]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProctoring {
    #[serde(default, alias = "score", deserialize_with = "deserialize_number_flexible")]
    pub proctoring_score: Option<f64>,
}

/// Recording payload: a bare URL string, `null`, or `{url}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRecording {
    Url(String),
    Object {
        #[serde(default, alias = "recordingUrl")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateList {
    #[serde(default)]
    pub certificates: Vec<RawCertificate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCertificate {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub interview_id: Option<String>,
    #[serde(default)]
    pub assessment_id: Option<String>,
    #[serde(default)]
    pub certificate_link: Option<String>,
    #[serde(default)]
    pub certificate_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateRequest {
    pub user_id: String,
    pub interview_id: String,
    pub assessment_id: String,
    pub assessment_title: String,
    pub certificate_link: String,
    pub certificate_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCertificateResponse {
    pub data: CreatedCertificateData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedCertificateData {
    pub certificate: CreatedCertificate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedCertificate {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCertificateRequest {
    pub user_id: String,
    pub interview_id: String,
    pub certificate_id: String,
}

/// The upload endpoint answers with either a bare URL or `{fileUrl}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Url(String),
    Object {
        #[serde(rename = "fileUrl")]
        file_url: String,
    },
}

impl UploadResponse {
    pub fn into_url(self) -> String {
        match self {
            UploadResponse::Url(url) => url,
            UploadResponse::Object { file_url } => file_url,
        }
    }
}

/// `data` of the user-id lookup: `{userId}` or a bare id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawUserId {
    Id(String),
    Object {
        #[serde(rename = "userId", alias = "_id")]
        user_id: String,
    },
}

impl RawUserId {
    pub fn into_id(self) -> String {
        match self {
            RawUserId::Id(id) => id,
            RawUserId::Object { user_id } => user_id,
        }
    }
}
