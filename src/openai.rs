//! OpenAI HTTP 클라이언트
//!
//! 임베딩과 채팅 완성 호출이 공유하는 얇은 JSON 클라이언트입니다.
//! 재시도는 하지 않습니다. 실패는 호출자가 도메인 에러로 변환합니다.
//!
//! ref: https://platform.openai.com/docs/api-reference

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RagConfig;
use crate::error::{RagError, Result};

// ============================================================================
// Errors
// ============================================================================

/// API 호출 실패
#[derive(Debug, Error)]
pub enum ApiError {
    /// 요청 전송 실패 (연결, 타임아웃)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 2xx 이외의 응답
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// 응답 본문 파싱 실패
    #[error("failed to parse response: {0}")]
    Decode(String),
}

/// OpenAI 에러 응답 본문
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

// ============================================================================
// OpenAiClient
// ============================================================================

/// OpenAI 호환 API 클라이언트
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - API 엔드포인트 (예: https://api.openai.com)
    /// * `api_key` - Bearer 토큰
    /// * `timeout` - 요청 타임아웃
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// 설정에서 생성 (API 키 필수)
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Self::new(&config.base_url, api_key, config.request_timeout)
    }

    /// 엔드포인트 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// JSON POST 요청
    pub(crate) async fn post_json<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
    ) -> std::result::Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error in request to {}: {}", url, e);
                ApiError::Transport(e)
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!("Request to {} failed with status {}", url, status);
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => describe_error(body.error),
                Err(_) => text,
            };
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn describe_error(detail: ErrorDetail) -> String {
    let mut message = detail.message;
    if let Some(kind) = detail.kind {
        message.push_str(&format!(", type: {}", kind));
    }
    if let Some(code) = detail.code.filter(|c| !c.is_null()) {
        message.push_str(&format!(", code: {}", code));
    }
    message
}

// ============================================================================
// Tests
// ============================================================================
