//! 토크나이저 어댑터
//!
//! 청커가 사용할 토큰 수 계산기입니다.
//! - `TiktokenCounter`: 모델별 BPE 인코딩 (기본)
//! - `WordCounter`: 공백 단위 단어 수 (BPE를 쓸 수 없을 때의 저하된 대체 수단)
//!
//! ref: https://github.com/zurawiki/tiktoken-rs

use tiktoken_rs::CoreBPE;

use crate::error::{RagError, Result};

// ============================================================================
// TokenCounter Trait
// ============================================================================

/// 토큰 수 계산 트레이트
///
/// 모델은 생성 시점에 고정됩니다.
pub trait TokenCounter: Send + Sync {
    /// 텍스트의 토큰 수
    fn count_tokens(&self, text: &str) -> usize;

    /// 계산기 이름
    fn name(&self) -> &str;
}

// ============================================================================
// TiktokenCounter
// ============================================================================

/// tiktoken BPE 기반 토큰 카운터
pub struct TiktokenCounter {
    bpe: CoreBPE,
    model: String,
}

impl TiktokenCounter {
    /// 모델 이름으로 인코딩 선택
    ///
    /// 알 수 없는 모델이면 `cl100k_base`로 대체합니다.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                tracing::warn!(
                    "No tokenizer registered for model '{}' ({}), falling back to cl100k_base",
                    model,
                    e
                );
                tiktoken_rs::cl100k_base().map_err(|e| RagError::Tokenizer {
                    model: model.to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        Ok(Self {
            bpe,
            model: model.to_string(),
        })
    }

    /// 대상 모델 이름
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn name(&self) -> &str {
        "tiktoken"
    }
}

// ============================================================================
// WordCounter
// ============================================================================

/// 공백 기준 단어 수 카운터
///
/// 실제 토큰 비용을 과소/과대 추정하므로 대체 수단으로만 사용합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &str {
        "words"
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 모델용 토큰 카운터 생성
///
/// BPE 로드에 실패하면 단어 카운터로 저하됩니다.
pub fn token_counter_for(model: &str) -> Box<dyn TokenCounter> {
    match TiktokenCounter::for_model(model) {
        Ok(counter) => Box::new(counter),
        Err(e) => {
            tracing::warn!("{}; counting words instead of tokens", e);
            Box::new(WordCounter)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
