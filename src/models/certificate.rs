use serde::{Deserialize, Serialize};

pub const CERTIFICATE_ID_PREFIX: &str = "EJ-CERT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// Backend record id, unknown until the record is created.
    pub id: Option<String>,
    pub interview_id: String,
    pub assessment_id: String,
    pub certificate_link: String,
    pub certificate_id: String,
}

/// `EJ-CERT-<year>-<first 8 chars of the interview id>`
pub fn certificate_id(interview_id: &str, year: i32) -> String {
    let short: String = interview_id.chars().take(8).collect();
    format!("{}-{}-{}", CERTIFICATE_ID_PREFIX, year, short)
}
