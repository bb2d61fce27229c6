//! 설정 모듈
//!
//! 기본값에서 시작해 환경변수로 덮어쓰는 방식의 파이프라인 설정입니다.
//! CLI 플래그는 이 설정 위에 다시 덮어씁니다.
//!
//! ## 환경변수
//! - `OPENAI_API_KEY`: API 키 (원격 호출 시 필수)
//! - `OPENAI_BASE_URL`: API 엔드포인트 (기본: https://api.openai.com)
//! - `RAG_EMBEDDING_MODEL`, `RAG_CHAT_MODEL`, `RAG_TEMPERATURE`
//! - `RAG_MAX_TOKENS`, `RAG_TOP_K`, `RAG_CONCURRENCY`, `RAG_METRIC`
//! - `RAG_SYSTEM_PROMPT`: 시스템 프롬프트 파일 경로

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{RagError, Result};
use crate::knowledge::Metric;

/// 기본 API 엔드포인트
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
/// 기본 임베딩 모델
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// 기본 생성 모델
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
/// 기본 시스템 프롬프트 파일
pub const DEFAULT_SYSTEM_PROMPT_PATH: &str = "prompts/system.prompt";

const API_KEY_VAR: &str = "OPENAI_API_KEY";

// ============================================================================
// RagConfig
// ============================================================================

/// 파이프라인 설정
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// API 키 (없으면 원격 호출 불가)
    pub api_key: Option<String>,
    /// API 엔드포인트 (검증된 http(s) URL)
    pub base_url: String,
    /// 임베딩 모델 (토크나이저도 이 모델 기준)
    pub embedding_model: String,
    /// 답변 생성 모델
    pub chat_model: String,
    /// 생성 temperature
    pub temperature: f32,
    /// 청크 당 최대 토큰 수
    pub max_tokens: usize,
    /// 검색할 청크 수
    pub top_k: usize,
    /// 동시 임베딩 요청 수
    pub concurrency: usize,
    /// 거리 메트릭
    pub metric: Metric,
    /// 시스템 프롬프트 파일 경로
    pub system_prompt_path: PathBuf,
    /// HTTP 요청 타임아웃
    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 500,
            top_k: 5,
            concurrency: 200,
            metric: Metric::L2,
            system_prompt_path: PathBuf::from(DEFAULT_SYSTEM_PROMPT_PATH),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RagConfig {
    /// 기본값 + 환경변수
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 구성
    ///
    /// 테스트에서 프로세스 환경변수를 건드리지 않기 위해 분리되어 있습니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = get(API_KEY_VAR) {
            config.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.base_url = parse_base_url(&url)?;
        }
        if let Some(model) = get("RAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(model) = get("RAG_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(value) = get("RAG_TEMPERATURE") {
            config.temperature = parse_value("RAG_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("RAG_MAX_TOKENS") {
            config.max_tokens = parse_value("RAG_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("RAG_TOP_K") {
            config.top_k = parse_value("RAG_TOP_K", &value)?;
        }
        if let Some(value) = get("RAG_CONCURRENCY") {
            config.concurrency = parse_value("RAG_CONCURRENCY", &value)?;
        }
        if let Some(value) = get("RAG_METRIC") {
            config.metric = value.parse()?;
        }
        if let Some(path) = get("RAG_SYSTEM_PROMPT") {
            config.system_prompt_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// 값 범위 검증
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::InvalidChunkSize);
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidK(self.top_k));
        }
        if self.concurrency == 0 {
            return Err(RagError::Config("concurrency must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::Config(format!(
                "temperature must be within 0.0..=2.0 (got {})",
                self.temperature
            )));
        }
        Ok(())
    }

    /// API 키 반환 (없으면 에러)
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            RagError::Config(format!(
                "API key not found. Set {} environment variable.",
                API_KEY_VAR
            ))
        })
    }
}

fn parse_base_url(value: &str) -> Result<String> {
    let url = Url::parse(value)
        .map_err(|e| RagError::Config(format!("Invalid OPENAI_BASE_URL '{}': {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RagError::Config(format!(
            "OPENAI_BASE_URL must be http(s): {}",
            value
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::Config(format!("Invalid value for {}: '{}'", key, value)))
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    std::env::var(API_KEY_VAR)
        .map(|key| !key.is_empty())
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
