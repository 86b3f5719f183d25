// src/core/service_client.rs
//! HTTP client for the matching backend: résumé upload, job registration and
//! match triggering, all bearer-authenticated.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::error::ClientError;
use crate::types::{JobPayload, MatchResponse, MatchResult, UploadResponse};

const UPLOAD_RESUME_ENDPOINT: &str = "/upload-resume";
const PARSE_JOB_ENDPOINT: &str = "/parse-job";
const MATCH_RESUMES_ENDPOINT: &str = "/match-resumes";

const UPLOAD_FIELD: &str = "file";
const PDF_MIME: &str = "application/pdf";

/// What the backend said about a job registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationAck {
    pub status: u16,
    pub detail: Option<String>,
}

impl RegistrationAck {
    pub fn accepted(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote matching capability.
#[async_trait]
pub trait MatchBackend: Send + Sync {
    async fn upload_resume(
        &self,
        token: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<UploadResponse, ClientError>;

    /// Returns `Ok` for any HTTP answer; only transport faults are errors.
    async fn register_job(
        &self,
        token: &str,
        payload: &JobPayload,
    ) -> Result<RegistrationAck, ClientError>;

    async fn match_resumes(
        &self,
        token: &str,
        job_id: &str,
    ) -> Result<Vec<MatchResult>, ClientError>;
}

pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: crate::config::trim_base_url(base_url),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl MatchBackend for ServiceClient {
    async fn upload_resume(
        &self,
        token: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let url = self.url(UPLOAD_RESUME_ENDPOINT);
        let size = content.len();

        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)
            .map_err(|e| ClientError::Network(format!("Failed to create multipart: {}", e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        info!("Uploading résumé {} ({} bytes) to {}", file_name, size, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        trace!("Upload response status: {}", status);

        if !status.is_success() {
            let detail = error_detail(response).await;
            error!("Upload rejected with {}: {}", status, detail);
            return Err(ClientError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(UploadResponse::default());
        }
        serde_json::from_slice::<UploadResponse>(&body)
            .map_err(|e| ClientError::Decode(format!("Failed to parse upload response: {}", e)))
    }

    async fn register_job(
        &self,
        token: &str,
        payload: &JobPayload,
    ) -> Result<RegistrationAck, ClientError> {
        let url = self.url(PARSE_JOB_ENDPOINT);
        debug!("Registering job {} at {}", payload.job_id, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let detail = if status.is_success() {
            None
        } else {
            Some(error_detail(response).await)
        };

        Ok(RegistrationAck {
            status: status.as_u16(),
            detail,
        })
    }

    async fn match_resumes(
        &self,
        token: &str,
        job_id: &str,
    ) -> Result<Vec<MatchResult>, ClientError> {
        let url = self.url(MATCH_RESUMES_ENDPOINT);
        info!("Calling matching service for job {}", job_id);

        let response = self
            .client
            .post(&url)
            .query(&[("job_id", job_id)])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(ClientError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.bytes().await?;
        let parsed: MatchResponse = serde_json::from_slice(&body).map_err(|e| {
            ClientError::Decode(format!(
                "Failed to parse match response: {}. Raw response: {}",
                e,
                String::from_utf8_lossy(&body)
            ))
        })?;

        match parsed {
            MatchResponse::Results(results) => Ok(results),
            MatchResponse::Failure { error } => Err(ClientError::Remote {
                status: StatusCode::OK.as_u16(),
                detail: error,
            }),
            MatchResponse::Notice { message } => {
                info!("Matching service: {}", message);
                Ok(Vec::new())
            }
        }
    }
}

/// `{"detail": ...}` when the backend sends one, otherwise the raw body.
async fn error_detail(response: Response) -> String {
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail").cloned() {
            Some(serde_json::Value::String(detail)) => detail,
            Some(other) => other.to_string(),
            None => serde_json::Value::Object(map).to_string(),
        },
        _ if text.trim().is_empty() => "Unknown error".to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ServiceClient {
        ServiceClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_match_resumes_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/match-resumes"))
            .and(query_param("job_id", "job_1700000000000"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"filename": "bob.pdf", "match_score": 40.0, "eligibility": "Not Eligible"},
                {"filename": "alice.pdf", "match_score": 87.4, "eligibility": "Eligible",
                 "details": {"matched_skills": ["Go", "SQL"]}}
            ])))
            .mount(&server)
            .await;

        let results = client(&server)
            .match_resumes("token-1", "job_1700000000000")
            .await
            .unwrap();

        let names: Vec<_> = results.iter().filter_map(|r| r.filename.as_deref()).collect();
        assert_eq!(names, vec!["bob.pdf", "alice.pdf"]);
    }

    #[tokio::test]
    async fn test_match_resumes_error_body_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/match-resumes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Job not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).match_resumes("t", "job_x").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Remote {
                status: 200,
                detail: "Job not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_match_resumes_notice_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/match-resumes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"message": "No resumes found to match against."}),
            ))
            .mount(&server)
            .await;

        let results = client(&server).match_resumes("t", "job_x").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_match_resumes_garbage_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/match-resumes"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).match_resumes("t", "job_x").await.unwrap_err();
        assert_eq!(err.code(), "DECODE_ERROR");
    }

    #[tokio::test]
    async fn test_upload_rejection_uses_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload-resume"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"detail": "Invalid file type. Only PDF is allowed."}),
            ))
            .mount(&server)
            .await;

        let err = client(&server)
            .upload_resume("token-1", "cv.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Remote {
                status: 400,
                detail: "Invalid file type. Only PDF is allowed.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_upload_rejection_without_detail_keeps_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload-resume"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"code": 42})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .upload_resume("t", "cv.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Remote {
                status: 500,
                detail: r#"{"code":42}"#.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_upload_success_returns_file_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload-resume"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Resume uploaded and saved successfully",
                "file_url": "https://storage/resumes/abc_cv.pdf"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .upload_resume("t", "cv.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();
        assert_eq!(
            response.file_url.as_deref(),
            Some("https://storage/resumes/abc_cv.pdf")
        );
    }

    #[tokio::test]
    async fn test_register_job_sends_payload() {
        let server = MockServer::start().await;
        let payload = JobPayload {
            job_id: "job_1".to_string(),
            description: None,
            keywords: vec!["React".to_string(), "SQL".to_string()],
            min_experience: 3,
        };
        Mock::given(method("POST"))
            .and(path("/parse-job"))
            .and(header("authorization", "Bearer t"))
            .and(body_json(serde_json::json!({
                "job_id": "job_1",
                "description": null,
                "keywords": ["React", "SQL"],
                "min_experience": 3
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "Job saved"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ack = client(&server).register_job("t", &payload).await.unwrap();
        assert!(ack.accepted());
        assert_eq!(ack.detail, None);
    }

    #[tokio::test]
    async fn test_register_job_rejection_is_not_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse-job"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "Auth Error"})),
            )
            .mount(&server)
            .await;

        let payload = JobPayload {
            job_id: "job_2".to_string(),
            description: Some("Rust developer".to_string()),
            keywords: Vec::new(),
            min_experience: 0,
        };
        let ack = client(&server).register_job("t", &payload).await.unwrap();
        assert!(!ack.accepted());
        assert_eq!(ack.detail.as_deref(), Some("Auth Error"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let backend = ServiceClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = backend.match_resumes("t", "job_x").await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_) | ClientError::TimedOut));
    }
}
