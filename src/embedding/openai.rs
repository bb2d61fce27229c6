//! OpenAI 임베딩 프로바이더
//!
//! ref: https://platform.openai.com/docs/api-reference/embeddings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::openai::OpenAiClient;

const EMBEDDINGS_PATH: &str = "v1/embeddings";

/// OpenAI 임베딩 구현체
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedding {
    /// 클라이언트와 모델로 생성
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// 임베딩 모델 이름
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if let Some(position) = input.iter().position(|t| t.is_empty()) {
            return Err(RagError::EmbeddingUnavailable(format!(
                "Input {} is empty; the embedding API rejects empty strings",
                position
            )));
        }

        let expected = input.len();
        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let response: EmbeddingResponse = self
            .client
            .post_json(EMBEDDINGS_PATH, &request)
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(e.to_string()))?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "Embedded {} input(s) with '{}', used tokens {}-{} (prompt-total)",
                expected,
                self.model,
                usage.prompt_tokens,
                usage.total_tokens
            );
        }

        order_by_index(response.data, expected)
    }
}

/// 응답 항목을 `index` 기준으로 정렬
fn order_by_index(data: Vec<EmbeddingObject>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(RagError::EmbeddingUnavailable(format!(
            "Expected {} embeddings, received {}",
            expected,
            data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for object in data {
        match slots.get_mut(object.index) {
            Some(slot) if slot.is_none() => *slot = Some(object.embedding),
            _ => {
                return Err(RagError::EmbeddingUnavailable(format!(
                    "Unexpected embedding index {} in response",
                    object.index
                )))
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| RagError::EmbeddingUnavailable("Missing embedding in response".to_string()))
        })
        .collect()
}

/// 임베딩 API 요청 본문
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

/// 임베딩 API 응답
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingObject>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    total_tokens: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::EmbeddingUnavailable("Empty embedding response".to_string()))
    }

    /// 한 번의 요청으로 여러 텍스트 임베딩
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.request(texts.to_vec()).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}
