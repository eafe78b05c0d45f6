//! Client side of the meet-management backend's DQ submission call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DqRecord;
use crate::util::{compact_text, is_http_url, normalize_text_option};

const SUBMIT_PATH: &str = "/v1/dqs";

/// Payload sent for one DQ; `dedup_key` makes resubmission safe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub dedup_key: String,
    pub event_id: i64,
    pub swimmer_id: i64,
    pub dq_code: String,
}

impl From<&DqRecord> for SubmitRequest {
    fn from(record: &DqRecord) -> Self {
        Self {
            dedup_key: record.dedup_key.as_str(),
            event_id: record.event_id,
            swimmer_id: record.swimmer_id,
            dq_code: record.dq_code.clone(),
        }
    }
}

/// Remote acknowledgement, also returned on idempotent replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub remote_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Timeout, connectivity loss or a transient server fault
    #[error("Retryable sync error: {0}")]
    Retryable(String),
    /// The backend rejected the payload; retrying cannot help
    #[error("Terminal sync error: {0}")]
    Terminal(String),
}

impl SubmitError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(message) | Self::Terminal(message) => message,
        }
    }
}

/// The remote authority that owns the meet's official DQ list.
///
/// Implementations must treat `dedup_key` as an idempotency key: a repeated
/// key returns the original `remote_id` instead of creating a second DQ.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitAck, SubmitError>;
}

/// JSON-over-HTTP client for the backend's DQ endpoint
#[derive(Clone)]
pub struct HttpAuthority {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAuthority {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                SubmitError::Terminal(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self {
            endpoint: format!("{base_url}{SUBMIT_PATH}"),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteAuthority for HttpAuthority {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitAck, SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Idempotency-Key", &request.dedup_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|error| SubmitError::Retryable(format!("request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        // An unreadable ack is retried; the dedup key makes the replay safe.
        let ack = response
            .json::<SubmitAck>()
            .await
            .map_err(|error| SubmitError::Retryable(format!("invalid acknowledgement: {error}")))?;
        if ack.remote_id.trim().is_empty() {
            return Err(SubmitError::Retryable(
                "acknowledgement did not include remote_id".to_string(),
            ));
        }
        Ok(ack)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_EARLY | StatusCode::TOO_MANY_REQUESTS
        )
}

fn classify_status(status: StatusCode, body: &str) -> SubmitError {
    let message = parse_api_error(status, body);
    if is_retryable_status(status) {
        SubmitError::Retryable(message)
    } else {
        SubmitError::Terminal(message)
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String, SubmitError> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        SubmitError::Terminal("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(SubmitError::Terminal(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DedupKey, SyncStatus};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> SubmitRequest {
        SubmitRequest {
            dedup_key: DedupKey::new().as_str(),
            event_id: 101,
            swimmer_id: 505,
            dq_code: "1A".to_string(),
        }
    }

    fn authority(server: &MockServer) -> HttpAuthority {
        HttpAuthority::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("meet.example.com".to_string()).is_err());
    }

    #[test]
    fn endpoint_joins_submit_path() {
        let client =
            HttpAuthority::new("https://meet.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "https://meet.example.com/v1/dqs");
    }

    #[test]
    fn server_faults_and_throttling_are_retryable() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            assert!(classify_status(status, "").is_retryable(), "{status}");
        }
    }

    #[test]
    fn payload_rejections_are_terminal() {
        let error = classify_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error": "unknown dq_code ZZ"}"#,
        );
        assert_eq!(error, SubmitError::Terminal("unknown dq_code ZZ (422)".to_string()));

        let error = classify_status(StatusCode::BAD_REQUEST, "");
        assert_eq!(error.message(), "HTTP 400");
    }

    #[test]
    fn request_carries_dedup_key() {
        let record = DqRecord {
            local_id: 7,
            dedup_key: DedupKey::new(),
            event_id: 101,
            swimmer_id: 505,
            dq_code: "1A".to_string(),
            sync_status: SyncStatus::InFlight,
            attempt_count: 0,
            last_attempt_at: Some(1),
            next_retry_at: None,
            remote_id: None,
            last_error: None,
            created_at: 0,
        };
        let request = SubmitRequest::from(&record);
        assert_eq!(request.dedup_key, record.dedup_key.as_str());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["swimmer_id"], 505);
        assert_eq!(json["dq_code"], "1A");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submit_sends_idempotency_key_and_parses_ack() {
        let server = MockServer::start().await;
        let request = request();
        Mock::given(method("POST"))
            .and(path("/v1/dqs"))
            .and(header("Idempotency-Key", request.dedup_key.as_str()))
            .and(body_json(&request))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "remote_id": "srv-9" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ack = authority(&server).submit(&request).await.unwrap();
        assert_eq!(ack.remote_id, "srv-9");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ack_without_remote_id_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "remote_id": "  " })))
            .mount(&server)
            .await;

        let error = authority(&server).submit(&request()).await.unwrap_err();
        assert!(error.is_retryable());
        assert!(error.message().contains("remote_id"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_ack_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let error = authority(&server).submit(&request()).await.unwrap_err();
        assert!(error.message().starts_with("invalid acknowledgement"));
        assert!(error.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn client_error_response_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({ "message": "unknown dq_code ZZ" })),
            )
            .mount(&server)
            .await;

        let error = authority(&server).submit(&request()).await.unwrap_err();
        assert_eq!(error, SubmitError::Terminal("unknown dq_code ZZ (422)".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_error_response_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let error = authority(&server).submit(&request()).await.unwrap_err();
        assert_eq!(error, SubmitError::Retryable("maintenance (503)".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_server_is_retryable() {
        let server = MockServer::start().await;
        let client = authority(&server);
        drop(server);

        let error = client.submit(&request()).await.unwrap_err();
        assert!(error.is_retryable());
        assert!(error.message().starts_with("request failed"));
    }
}
