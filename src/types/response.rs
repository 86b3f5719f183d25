// src/types/response.rs
use serde::{Deserialize, Serialize};

/// Eligibility attached to a match result.
///
/// Only the exact string `"Eligible"` is positive. Any other text the matcher
/// sends is kept verbatim for display; nothing at all (or an empty string)
/// is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Eligibility {
    Eligible,
    NotEligible,
    Other(String),
    #[default]
    Unknown,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Eligible => "Eligible",
            Self::NotEligible => "Not Eligible",
            Self::Other(text) => text,
            Self::Unknown => "Processing",
        }
    }
}

impl From<Option<String>> for Eligibility {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("Eligible") => Self::Eligible,
            Some("Not Eligible") => Self::NotEligible,
            None | Some("") => Self::Unknown,
            Some(_) => Self::Other(value.unwrap_or_default()),
        }
    }
}

impl From<Eligibility> for Option<String> {
    fn from(value: Eligibility) -> Self {
        match value {
            Eligibility::Eligible => Some("Eligible".to_string()),
            Eligibility::NotEligible => Some("Not Eligible".to_string()),
            Eligibility::Other(text) => Some(text),
            Eligibility::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    #[serde(default)]
    pub matched_skills: Vec<String>,
    pub skill_match: Option<f64>,
    pub experience_match: Option<f64>,
    pub role_similarity: Option<f64>,
    pub semantic_score: Option<f64>,
    pub years_of_experience: Option<f64>,
}

/// One candidate as ranked by the remote matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub filename: Option<String>,
    pub match_score: Option<f64>,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub details: MatchDetails,
    #[serde(alias = "file_url")]
    pub resume_file_url: Option<String>,
    pub resume_index: Option<usize>,
}

impl MatchResult {
    pub fn matched_skills(&self) -> &[String] {
        &self.details.matched_skills
    }

    /// Score rounded for display; missing or non-finite scores display as 0.
    pub fn display_score(&self) -> i64 {
        self.match_score
            .filter(|score| score.is_finite())
            .map(|score| score.round() as i64)
            .unwrap_or(0)
    }
}

/// Body of `POST /match-resumes`.
///
/// The matcher answers with a bare array on success, `{"error": ..}` for an
/// unknown job and `{"message": ..}` when the user has no résumés yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MatchResponse {
    Results(Vec<MatchResult>),
    Failure { error: String },
    Notice { message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: Option<String>,
    pub file_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_result_from_backend_shape() {
        let json = r#"[{
            "resume_index": 0,
            "filename": "alice.pdf",
            "match_score": 87.4,
            "eligibility": "Eligible",
            "details": {"matched_skills": ["Go", "SQL"], "skill_match": 90.0}
        }]"#;

        let response: MatchResponse = serde_json::from_str(json).unwrap();
        let MatchResponse::Results(results) = response else {
            panic!("expected results");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename.as_deref(), Some("alice.pdf"));
        assert_eq!(results[0].eligibility, Eligibility::Eligible);
        assert_eq!(results[0].matched_skills(), ["Go", "SQL"]);
        assert_eq!(results[0].display_score(), 87);
    }

    #[test]
    fn test_missing_fields_default() {
        let result: MatchResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result.eligibility, Eligibility::Unknown);
        assert!(result.matched_skills().is_empty());
        assert_eq!(result.display_score(), 0);
    }

    #[test]
    fn test_eligibility_is_exact_match() {
        let result: MatchResult =
            serde_json::from_str(r#"{"eligibility": "eligible"}"#).unwrap();
        assert!(!result.eligibility.is_eligible());
        assert_eq!(result.eligibility.label(), "eligible");

        let result: MatchResult =
            serde_json::from_str(r#"{"eligibility": "Needs Review"}"#).unwrap();
        assert_eq!(
            result.eligibility,
            Eligibility::Other("Needs Review".to_string())
        );
        assert_eq!(result.eligibility.label(), "Needs Review");

        let result: MatchResult = serde_json::from_str(r#"{"eligibility": ""}"#).unwrap();
        assert_eq!(result.eligibility.label(), "Processing");

        let result: MatchResult =
            serde_json::from_str(r#"{"eligibility": "Not Eligible"}"#).unwrap();
        assert_eq!(result.eligibility, Eligibility::NotEligible);
    }

    #[test]
    fn test_file_url_alias() {
        let result: MatchResult =
            serde_json::from_str(r#"{"file_url": "https://cdn/r.pdf"}"#).unwrap();
        assert_eq!(result.resume_file_url.as_deref(), Some("https://cdn/r.pdf"));
    }

    #[test]
    fn test_non_array_bodies() {
        let response: MatchResponse =
            serde_json::from_str(r#"{"error": "Job not found"}"#).unwrap();
        assert_eq!(
            response,
            MatchResponse::Failure {
                error: "Job not found".to_string()
            }
        );

        let response: MatchResponse =
            serde_json::from_str(r#"{"message": "No resumes found to match against."}"#)
                .unwrap();
        assert!(matches!(response, MatchResponse::Notice { .. }));

        assert!(serde_json::from_str::<MatchResponse>(r#"{"unexpected": true}"#).is_err());
    }

    #[test]
    fn test_rounding() {
        let result = MatchResult {
            match_score: Some(74.5),
            ..Default::default()
        };
        assert_eq!(result.display_score(), 75);

        let result = MatchResult {
            match_score: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(result.display_score(), 0);
    }
}
