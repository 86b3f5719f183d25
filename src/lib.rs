// src/lib.rs
//! Client-side résumé screening: session handling, résumé upload, job
//! criteria, match runs and result rendering against the matching API.

pub mod analysis;
pub mod cli;
pub mod composer;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod environment;
pub mod error;
pub mod router;
pub mod session;
pub mod types;
pub mod uploader;
pub mod view;

#[cfg(test)]
mod testing;

pub use analysis::{AnalysisController, BoardSnapshot, ResultsBoard, RunOutcome};
pub use composer::JobComposer;
pub use config::{ClientConfig, InputLimits, RegistrationPolicy};
pub use dashboard::Dashboard;
pub use environment::EnvironmentConfig;
pub use error::{ClientError, ValidationError};
pub use session::{IdentityProvider, Session, SessionGuard, SessionState};
pub use uploader::{ResumeUploader, UploadStatus};
pub use view::{render, RenderedResults, ResultCard};
