// src/types/job.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    #[default]
    Description,
    Keywords,
}

/// Job criteria frozen at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCriteria {
    pub job_id: String,
    pub mode: JobMode,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub min_experience_years: u32,
}

impl JobCriteria {
    /// Wire payload for `POST /parse-job`. Only the active mode's input is sent.
    pub fn to_payload(&self) -> JobPayload {
        let (description, keywords) = match self.mode {
            JobMode::Description => (self.description.clone(), Vec::new()),
            JobMode::Keywords => (None, self.keywords.clone()),
        };

        JobPayload {
            job_id: self.job_id.clone(),
            description,
            keywords,
            min_experience: self.min_experience_years,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub job_id: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub min_experience: u32,
}
