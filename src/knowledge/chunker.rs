//! Text Chunking Module
//!
//! 구분자 인식 텍스트 분할을 제공합니다.
//! 문장 경계(구분자)를 유지하면서 토큰 한도 이내의 청크로 묶습니다.
//!
//! 1. 구분자(`.`, `!`, `?`, 줄바꿈)를 만날 때마다 문장을 닫습니다 (구분자 포함).
//! 2. 문장을 순서대로 현재 청크에 채우다가 한도를 넘으면 새 청크를 시작합니다.
//! 3. 한도보다 큰 단일 문장은 그대로 하나의 청크가 됩니다 (잘라내지 않음).

use std::sync::Arc;

use crate::error::{RagError, Result};
use crate::tokenizer::TokenCounter;

/// 기본 문장 구분자
pub const DEFAULT_DELIMITERS: [char; 4] = ['.', '!', '?', '\n'];

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 청크 당 최대 토큰 수 (> 0)
    max_tokens: usize,
    /// 문장을 닫는 구분자
    delimiters: Vec<char>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            delimiters: DEFAULT_DELIMITERS.to_vec(),
        }
    }
}

impl ChunkConfig {
    /// 기본 구분자로 생성
    pub fn new(max_tokens: usize) -> Result<Self> {
        Self::with_delimiters(max_tokens, DEFAULT_DELIMITERS)
    }

    /// 구분자를 지정하여 생성
    pub fn with_delimiters(
        max_tokens: usize,
        delimiters: impl IntoIterator<Item = char>,
    ) -> Result<Self> {
        if max_tokens == 0 {
            return Err(RagError::InvalidChunkSize);
        }

        let mut delimiters: Vec<char> = delimiters.into_iter().collect();
        delimiters.sort_unstable();
        delimiters.dedup();

        Ok(Self {
            max_tokens,
            delimiters,
        })
    }

    /// 최대 토큰 수
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// 구분자 목록
    pub fn delimiters(&self) -> &[char] {
        &self.delimiters
    }

    #[inline]
    fn is_delimiter(&self, c: char) -> bool {
        self.delimiters.binary_search(&c).is_ok()
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// DelimiterChunker
// ============================================================================

/// 구분자 인식 청커
///
/// 토큰 수는 주입된 `TokenCounter`로 계산합니다.
/// 호출 간 공유 상태가 없으므로 결과는 입력에 대해 결정적입니다.
pub struct DelimiterChunker {
    config: ChunkConfig,
    counter: Arc<dyn TokenCounter>,
}

impl DelimiterChunker {
    /// 설정과 토큰 카운터로 생성
    pub fn new(config: ChunkConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    /// 설정 조회
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 텍스트를 문장으로 분할
    ///
    /// 각 문장은 닫는 구분자를 포함하며, 끝에 남은 부분 문장도 하나의 문장입니다.
    /// 모든 문장을 이어 붙이면 원문과 같습니다.
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for (i, c) in text.char_indices() {
            if self.config.is_delimiter(c) {
                let end = i + c.len_utf8();
                sentences.push(&text[start..end]);
                start = end;
            }
        }

        if start < text.len() {
            sentences.push(&text[start..]);
        }

        sentences
    }

    /// 문장을 토큰 한도 내에서 탐욕적으로 묶기
    ///
    /// BPE 토큰은 문장 경계를 넘어 병합될 수 있으므로 문장별 합이 아니라
    /// 이어 붙인 후보 청크 자체의 토큰 수로 판단합니다.
    fn pack_sentences(&self, sentences: &[&str]) -> Vec<String> {
        let max_tokens = self.config.max_tokens;
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            if !current.is_empty() {
                let candidate = format!("{}{}", current, sentence);
                if self.counter.count_tokens(&candidate) <= max_tokens {
                    current = candidate;
                    continue;
                }
                chunks.push(std::mem::take(&mut current));
            }

            let tokens = self.counter.count_tokens(sentence);
            if tokens > max_tokens {
                tracing::debug!(
                    "Sentence of {} tokens exceeds max_tokens={}, keeping it as one chunk",
                    tokens,
                    max_tokens
                );
            }
            current.push_str(sentence);
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

impl Chunker for DelimiterChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![];
        }

        let sentences = self.split_sentences(text);
        let chunks = self.pack_sentences(&sentences);

        tracing::debug!(
            "Chunked {} chars into {} sentences / {} chunks (max_tokens={}, counter={})",
            text.len(),
            sentences.len(),
            chunks.len(),
            self.config.max_tokens,
            self.counter.name()
        );

        chunks
    }

    fn name(&self) -> &'static str {
        "DelimiterChunker"
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 한 번만 쓰는 청킹 호출
///
/// `max_tokens`가 0이면 `InvalidChunkSize`를 반환합니다.
pub fn chunk_text(
    text: &str,
    max_tokens: usize,
    delimiters: impl IntoIterator<Item = char>,
    counter: Arc<dyn TokenCounter>,
) -> Result<Vec<String>> {
    let config = ChunkConfig::with_delimiters(max_tokens, delimiters)?;
    Ok(DelimiterChunker::new(config, counter).chunk(text))
}

/// 기본 구분자 청커 생성
pub fn delimiter_chunker(config: ChunkConfig, counter: Arc<dyn TokenCounter>) -> Box<dyn Chunker> {
    Box::new(DelimiterChunker::new(config, counter))
}

// ============================================================================
// Tests
// ============================================================================
