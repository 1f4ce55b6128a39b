use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub profile: CandidateProfile,
    pub assessments_paid: Vec<PaidAssessment>,
    pub certificates: Vec<CertificateLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub bio: String,
    pub skills: Vec<String>,
    pub professional_info: Option<ProfessionalInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalInfo {
    pub work_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidAssessment {
    pub assessment_id: String,
    pub interview_id: Option<String>,
    pub assessment_id_velox: Option<String>,
}

/// Certificate reference stored on the candidate record by the link call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateLink {
    pub interview_id: String,
    pub certificate_id: String,
}

impl Candidate {
    pub fn initials(&self) -> String {
        initials(Some(&self.name))
    }

    pub fn has_paid_assessments(&self) -> bool {
        !self.assessments_paid.is_empty()
    }

    /// Paid assessments that carry an interview id, in purchase order.
    pub fn interviews(&self) -> impl Iterator<Item = (&PaidAssessment, &str)> {
        self.assessments_paid
            .iter()
            .filter_map(|a| a.interview_id.as_deref().map(|id| (a, id)))
    }
}

/// Uppercased first letters of up to two name tokens, `"NA"` when there is no name.
pub fn initials(name: Option<&str>) -> String {
    let letters: String = name
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|token| token.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();

    if letters.is_empty() {
        "NA".to_string()
    } else {
        letters
    }
}
