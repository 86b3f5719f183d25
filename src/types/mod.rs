// src/types/mod.rs
pub mod job;
pub mod response;

pub use job::{JobCriteria, JobMode, JobPayload};
pub use response::{Eligibility, MatchDetails, MatchResponse, MatchResult, UploadResponse};
