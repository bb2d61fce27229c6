//! 에러 타입
//!
//! 파이프라인 각 단계에서 발생하는 실패를 하나의 열거형으로 정리합니다.
//! - 추출 에러는 호출자가 로그를 남기고 건너뜁니다.
//! - 임베딩/생성/인덱스 빌드 에러는 호출자에게 그대로 전파됩니다.

use std::path::PathBuf;

use thiserror::Error;

/// RAG 파이프라인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 소스 파일을 읽거나 파싱할 수 없음 (건너뛰고 계속 진행)
    #[error("Failed to extract text from {path:?}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// 원격 임베딩 호출 실패 (네트워크, 인증, rate limit)
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// 원격 생성 모델 호출 실패
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// 벡터 차원 불일치
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 빈 벡터 목록으로 인덱스 빌드 시도
    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// 코퍼스와 벡터 개수 불일치
    #[error("Corpus has {chunks} chunks but {vectors} vectors were supplied")]
    CorpusMismatch { chunks: usize, vectors: usize },

    /// 빈 쿼리
    #[error("Query must not be empty")]
    EmptyQuery,

    /// 잘못된 k 값
    #[error("k must be at least 1 (got {0})")]
    InvalidK(usize),

    /// 잘못된 청크 크기
    #[error("max_tokens must be greater than zero")]
    InvalidChunkSize,

    /// 토크나이저 로드 실패
    #[error("Tokenizer unavailable for model '{model}': {reason}")]
    Tokenizer { model: String, reason: String },

    /// 설정 값 오류
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// 크레이트 공통 Result 타입
pub type Result<T, E = RagError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RagError::DimensionMismatch {
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
        assert_eq!(RagError::InvalidK(0).to_string(), "k must be at least 1 (got 0)");
    }

    #[test]
    fn test_extraction_helper() {
        let err = RagError::extraction("data/missing.pdf", "No such file");
        match err {
            RagError::Extraction { path, reason } => {
                assert_eq!(path, PathBuf::from("data/missing.pdf"));
                assert_eq!(reason, "No such file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
