// src/composer.rs
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{InputLimits, RegistrationPolicy};
use crate::core::service_client::MatchBackend;
use crate::error::{ClientError, ValidationError};
use crate::session::SessionGuard;
use crate::types::{JobCriteria, JobMode};

/// Collects job criteria and registers them with the backend.
///
/// Both modes keep their input while the other one is active, so switching
/// back restores what was typed.
#[derive(Debug)]
pub struct JobComposer {
    mode: JobMode,
    description: String,
    keywords: Vec<String>,
    pending_keyword: String,
    min_experience_input: String,
    limits: InputLimits,
    policy: RegistrationPolicy,
    submitting: bool,
    last_job_millis: i64,
    last_error: Option<String>,
}

impl Default for JobComposer {
    fn default() -> Self {
        Self::new(InputLimits::default(), RegistrationPolicy::default())
    }
}

impl JobComposer {
    pub fn new(limits: InputLimits, policy: RegistrationPolicy) -> Self {
        Self {
            mode: JobMode::Description,
            description: String::new(),
            keywords: Vec::new(),
            pending_keyword: String::new(),
            min_experience_input: "0".to_string(),
            limits,
            policy,
            submitting: false,
            last_job_millis: 0,
            last_error: None,
        }
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: JobMode) {
        self.mode = mode;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, text: &str) -> Result<(), ValidationError> {
        let max = self.limits.max_description_chars;
        if text.chars().count() > max {
            return Err(ValidationError::TooLong {
                field: "description",
                max,
            });
        }
        self.description = text.to_string();
        Ok(())
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn pending_keyword(&self) -> &str {
        &self.pending_keyword
    }

    pub fn set_pending_keyword(&mut self, text: &str) {
        self.pending_keyword = text.to_string();
    }

    /// Append a keyword. Empty or already present (exact, case-sensitive)
    /// keywords are ignored and `Ok(false)` is returned.
    pub fn add_keyword(&mut self, text: &str) -> Result<bool, ValidationError> {
        let keyword = text.trim();
        if keyword.is_empty() || self.keywords.iter().any(|k| k == keyword) {
            return Ok(false);
        }

        let max = self.limits.max_keyword_chars;
        if keyword.chars().count() > max {
            return Err(ValidationError::TooLong {
                field: "keyword",
                max,
            });
        }
        if self.keywords.len() >= self.limits.max_keywords {
            return Err(ValidationError::TooLong {
                field: "keywords",
                max: self.limits.max_keywords,
            });
        }

        self.keywords.push(keyword.to_string());
        self.pending_keyword.clear();
        Ok(true)
    }

    /// Commit whatever is in the pending keyword field.
    pub fn add_pending_keyword(&mut self) -> Result<bool, ValidationError> {
        let pending = self.pending_keyword.clone();
        self.add_keyword(&pending)
    }

    /// Remove a keyword, matched the same way `add_keyword` stores it.
    pub fn remove_keyword(&mut self, text: &str) -> bool {
        let keyword = text.trim();
        let before = self.keywords.len();
        self.keywords.retain(|k| k != keyword);
        self.keywords.len() != before
    }

    pub fn min_experience_input(&self) -> &str {
        &self.min_experience_input
    }

    pub fn set_min_experience(&mut self, text: &str) {
        self.min_experience_input = text.to_string();
    }

    pub fn min_experience_years(&self) -> u32 {
        parse_min_experience(&self.min_experience_input)
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Freeze the current input under `job_id`, checking the active mode has input.
    pub fn criteria(&self, job_id: &str) -> Result<JobCriteria, ValidationError> {
        match self.mode {
            JobMode::Description if self.description.trim().is_empty() => {
                return Err(ValidationError::EmptyField("description"));
            }
            JobMode::Keywords if self.keywords.is_empty() => {
                return Err(ValidationError::EmptyField("keywords"));
            }
            _ => {}
        }

        Ok(JobCriteria {
            job_id: job_id.to_string(),
            mode: self.mode,
            description: match self.mode {
                JobMode::Description => Some(self.description.clone()),
                JobMode::Keywords => None,
            },
            keywords: self.keywords.clone(),
            min_experience_years: self.min_experience_years(),
        })
    }

    /// `job_<unix millis>`, strictly increasing for this composer.
    pub fn next_job_id(&mut self) -> String {
        let millis = Utc::now()
            .timestamp_millis()
            .max(self.last_job_millis + 1);
        self.last_job_millis = millis;
        format!("job_{}", millis)
    }

    /// Register the job and return the frozen criteria for analysis.
    ///
    /// Under `RegistrationPolicy::Optimistic` a rejected registration is only
    /// logged; a transport failure always aborts.
    pub async fn submit(
        &mut self,
        guard: &SessionGuard,
        backend: &dyn MatchBackend,
    ) -> Result<JobCriteria, ClientError> {
        if self.submitting {
            return Err(ClientError::Busy("Job submission"));
        }

        let job_id = self.next_job_id();
        let criteria = self.criteria(&job_id)?;
        let token = guard.fresh_token().await?;

        let outcome = {
            let _submitting = SubmitFlag::raise(&mut self.submitting);
            backend.register_job(&token, &criteria.to_payload()).await
        };

        match outcome {
            Ok(ack) if ack.accepted() => {
                info!("Job {} registered", job_id);
                self.last_error = None;
                Ok(criteria)
            }
            Ok(ack) => {
                let detail = ack
                    .detail
                    .unwrap_or_else(|| "registration rejected".to_string());
                match self.policy {
                    RegistrationPolicy::Confirmed => {
                        error!("Job {} registration rejected ({}): {}", job_id, ack.status, detail);
                        let err = ClientError::Remote {
                            status: ack.status,
                            detail,
                        };
                        self.last_error = Some(err.to_string());
                        Err(err)
                    }
                    RegistrationPolicy::Optimistic => {
                        warn!(
                            "Job {} registration answered {} ({}); continuing optimistically",
                            job_id, ack.status, detail
                        );
                        self.last_error = None;
                        Ok(criteria)
                    }
                }
            }
            Err(e) => {
                error!("Error saving job {}: {}", job_id, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// Holds `submitting` up while registration is in flight. Lowered on drop, so
/// an abandoned submit leaves the composer retryable.
struct SubmitFlag<'a>(&'a mut bool);

impl<'a> SubmitFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for SubmitFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Leading integer of `text`; empty, non-numeric or negative input is 0.
pub fn parse_min_experience(text: &str) -> u32 {
    let trimmed = text.trim();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if negative || digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(u32::MAX)
}
