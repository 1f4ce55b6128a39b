use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const UNTITLED_ASSESSMENT: &str = "Untitled Assessment";

/// assessmentId -> human readable title, scoped to one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentTitleMap(HashMap<String, String>);

impl AssessmentTitleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries for the same assessment id replace earlier ones.
    pub fn insert(&mut self, assessment_id: impl Into<String>, title: impl Into<String>) {
        self.0.insert(assessment_id.into(), title.into());
    }

    pub fn get(&self, assessment_id: &str) -> Option<&str> {
        self.0.get(assessment_id).map(String::as_str)
    }

    pub fn title_for(&self, assessment_id: &str) -> String {
        self.get(assessment_id)
            .unwrap_or(UNTITLED_ASSESSMENT)
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AssessmentTitleMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, title) in iter {
            map.insert(id, title);
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillStatus {
    Completed,
    InProgress,
}

impl SkillStatus {
    const COMPLETED_CODE: i64 = 2;

    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(Self::COMPLETED_CODE) => SkillStatus::Completed,
            _ => SkillStatus::InProgress,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SkillStatus::Completed => "Completed",
            SkillStatus::InProgress => "In Progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    pub title: String,
    pub score: Option<f64>,
    pub status: SkillStatus,
    pub time_consumed_secs: Option<f64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Scored report for one interview. Scores live in `0.0..=10.0`; `None` means not available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub interview_id: String,
    pub assessment_id: String,
    pub title: String,
    pub overall_score: Option<f64>,
    pub report_score: Option<f64>,
    pub communication_score: Option<f64>,
    pub proctoring_score: Option<f64>,
    pub overall_summary: String,
    pub skills: Vec<SkillResult>,
}

/// Unweighted mean of the skills that carry a score.
pub fn overall_score(skills: &[SkillResult]) -> Option<f64> {
    let scores: Vec<f64> = skills.iter().filter_map(|s| s.score).collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(score: Option<f64>) -> SkillResult {
        SkillResult {
            title: "SQL".into(),
            score,
            status: SkillStatus::Completed,
            time_consumed_secs: None,
            strengths: vec![],
            weaknesses: vec![],
        }
    }

    #[test]
    fn overall_score_is_none_without_skills() {
        assert_eq!(overall_score(&[]), None);
        assert_eq!(overall_score(&[skill(None)]), None);
    }

    #[test]
    fn overall_score_is_plain_mean() {
        let skills = vec![skill(Some(6.0)), skill(Some(9.0)), skill(None)];
        assert_eq!(overall_score(&skills), Some(7.5));
        assert_eq!(overall_score(&[skill(Some(0.0))]), Some(0.0));
    }

    #[test]
    fn status_code_two_is_completed() {
        assert_eq!(SkillStatus::from_code(Some(2)), SkillStatus::Completed);
        assert_eq!(SkillStatus::from_code(Some(1)), SkillStatus::InProgress);
        assert_eq!(SkillStatus::from_code(None), SkillStatus::InProgress);
    }

    #[test]
    fn duplicate_titles_keep_separate_entries() {
        let map: AssessmentTitleMap = [("a1", "SQL Test"), ("a2", "SQL Test")]
            .into_iter()
            .collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a1"), Some("SQL Test"));
        assert_eq!(map.get("a2"), Some("SQL Test"));
        assert_eq!(map.title_for("a3"), UNTITLED_ASSESSMENT);
    }

    #[test]
    fn later_duplicate_ids_win() {
        let map: AssessmentTitleMap = [("a1", "Old"), ("a1", "New")].into_iter().collect();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a1"), Some("New"));
    }
}
