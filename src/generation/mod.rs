//! 답변 생성 모듈
//!
//! 검색된 청크로 프롬프트를 구성하고 원격 생성 모델을 호출합니다.

mod openai;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use openai::OpenAiChat;

/// 시스템 프롬프트 파일이 없을 때 사용하는 기본 프롬프트
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful virtual assistant. \
Answer the user's question using only the provided context. \
If the context does not contain the answer, say that you do not know.";

// ============================================================================
// Generator Trait
// ============================================================================

/// 생성 모델 트레이트
///
/// 원격 호출 실패는 `RagError::GenerationUnavailable`로 보고합니다.
#[async_trait]
pub trait Generator: Send + Sync {
    /// 시스템/사용자 프롬프트로 답변 생성
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<String>;
}

// ============================================================================
// Prompt Composition
// ============================================================================

/// 사용자 프롬프트 구성
///
/// 청크는 빈 줄로 구분하여 `Context:` 아래에 붙입니다.
pub fn build_user_prompt<S: AsRef<str>>(query: &str, chunks: &[S]) -> String {
    let context = chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Context:\n{}\n\nQuestion: {}", context, query)
}

/// 시스템 프롬프트 파일 읽기
///
/// 읽기에 실패하면 경고를 남기고 기본 프롬프트를 사용합니다.
pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(prompt) if !prompt.trim().is_empty() => prompt,
        Ok(_) => {
            tracing::warn!("System prompt {:?} is empty, using default prompt", path);
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            tracing::warn!("Error reading system prompt {:?}: {}", path, e);
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

// ============================================================================
// Answerer
// ============================================================================

/// 검색 결과 기반 답변기
pub struct Answerer<G: ?Sized> {
    generator: Box<G>,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl<G: Generator + ?Sized> Answerer<G> {
    /// 생성기와 모델 설정으로 생성
    pub fn new(
        generator: Box<G>,
        model: impl Into<String>,
        temperature: f32,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            temperature,
            system_prompt: system_prompt.into(),
        }
    }

    /// 질문과 컨텍스트 청크로 답변 생성
    pub async fn answer<S: AsRef<str> + Sync>(&self, query: &str, chunks: &[S]) -> Result<String> {
        let user_prompt = build_user_prompt(query, chunks);
        tracing::debug!(
            "Generating answer with '{}' ({} context chunks, {} prompt chars)",
            self.model,
            chunks.len(),
            user_prompt.len()
        );

        self.generator
            .generate(&self.system_prompt, &user_prompt, &self.model, self.temperature)
            .await
    }

    /// 시스템 프롬프트
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

// ============================================================================
// Tests
// ============================================================================
