use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    #[default]
    Video,
}

/// A missing `url` is the "no recording" state, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub interview_id: String,
    pub assessment_title: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: RecordingKind,
}

impl Recording {
    pub fn has_url(&self) -> bool {
        self.url.is_some()
    }
}
