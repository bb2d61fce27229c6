//! 임베딩 모듈 - 원격 API를 통한 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환하는 프로바이더 트레이트와
//! 순서를 보존하는 동시 배치 임베딩(`embed_many`)을 제공합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::new(client, "text-embedding-3-small");
//! let vectors = embed_many(&embedder, &chunks, 200).await?;
//! ```

mod openai;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{RagError, Result};

pub use openai::OpenAiEmbedding;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
/// 원격 호출 실패는 `RagError::EmbeddingUnavailable`로 보고합니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 프로바이더 이름 (모델 식별용)
    fn name(&self) -> &str;
}

// ============================================================================
// Concurrent Batch Embedding
// ============================================================================

/// 동시 요청 수를 제한한 배치 임베딩
///
/// 요청은 최대 `concurrency`개까지 동시에 진행되며 완료 순서는 임의입니다.
/// 각 결과는 요청 위치로 태그되어 미리 할당된 슬롯에 기록되므로
/// 반환 순서는 항상 입력 순서와 같습니다.
/// 첫 실패에서 배치 전체가 실패하고 진행 중인 요청은 버려집니다.
pub async fn embed_many<E>(
    provider: &E,
    texts: &[String],
    concurrency: usize,
) -> Result<Vec<Vec<f32>>>
where
    E: EmbeddingProvider + ?Sized,
{
    let total = texts.len();
    if total == 0 {
        return Ok(vec![]);
    }

    let concurrency = concurrency.max(1);
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; total];
    let mut completed = 0usize;

    tracing::info!(
        "Embedding {} texts with {} (concurrency: {})",
        total,
        provider.name(),
        concurrency
    );

    let mut responses = stream::iter(texts.iter().enumerate())
        .map(|(position, text)| async move {
            provider
                .embed(text)
                .await
                .map(|vector| (position, vector))
                .map_err(|e| (position, e))
        })
        .buffer_unordered(concurrency);

    while let Some(response) = responses.next().await {
        let (position, vector) = match response {
            Ok(ok) => ok,
            Err((position, e)) => {
                tracing::error!("Embedding request {} failed, aborting batch: {}", position, e);
                return Err(into_unavailable(e));
            }
        };

        slots[position] = Some(vector);
        completed += 1;
        tracing::debug!("Embedded {}/{} (position {})", completed, total, position);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.ok_or_else(|| {
                RagError::EmbeddingUnavailable(format!("No embedding returned for text {}", position))
            })
        })
        .collect()
}

/// 임베딩 실패를 `EmbeddingUnavailable`로 통일
pub(crate) fn into_unavailable(err: RagError) -> RagError {
    match err {
        RagError::EmbeddingUnavailable(_) => err,
        other => RagError::EmbeddingUnavailable(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use sha2::{Digest, Sha256};

    use super::*;

    /// 텍스트 해시로 결정되는 벡터를 반환하는 목 임베더
    ///
    /// 해시에 따라 응답 지연이 달라져 완료 순서가 입력 순서와 어긋납니다.
    #[derive(Default)]
    pub(crate) struct HashEmbedder {
        pub calls: AtomicUsize,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub fail_on: Option<String>,
    }

    impl HashEmbedder {
        /// 특정 텍스트에서 실패하는 임베더
        pub(crate) fn failing_on(text: &str) -> Self {
            Self {
                fail_on: Some(text.to_string()),
                ..Default::default()
            }
        }
    }

    pub(crate) fn hash_vector(text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        digest.iter().take(8).map(|b| *b as f32 / 255.0).collect()
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = Sha256::digest(text.as_bytes())[0] as u64 % 15;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.as_deref() == Some(text) {
                return Err(RagError::EmbeddingUnavailable("mock failure".to_string()));
            }
            Ok(hash_vector(text))
        }

        fn name(&self) -> &str {
            "hash-embedder"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("chunk number {}", i)).collect()
    }

    #[tokio::test]
    async fn test_embed_many_preserves_order() {
        let embedder = HashEmbedder::default();
        let inputs = texts(40);

        let vectors = embed_many(&embedder, &inputs, 8)
            .await
            .expect("embedding should succeed");

        assert_eq!(vectors.len(), inputs.len());
        for (text, vector) in inputs.iter().zip(&vectors) {
            assert_eq!(vector, &hash_vector(text));
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 40);
    }

    #[tokio::test]
    async fn test_embed_many_respects_concurrency_bound() {
        let embedder = HashEmbedder::default();
        embed_many(&embedder, &texts(30), 4)
            .await
            .expect("embedding should succeed");

        let max = embedder.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 4, "max in flight was {max}");
        assert!(max >= 1);
    }

    #[tokio::test]
    async fn test_embed_many_zero_concurrency_treated_as_one() {
        let embedder = HashEmbedder::default();
        let vectors = embed_many(&embedder, &texts(5), 0)
            .await
            .expect("embedding should succeed");
        assert_eq!(vectors.len(), 5);
        assert_eq!(embedder.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_embed_many_fails_fast() {
        let embedder = HashEmbedder::failing_on("chunk number 3");

        let result = embed_many(&embedder, &texts(10), 2).await;
        assert!(matches!(result, Err(RagError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_embed_many_empty() {
        let embedder = HashEmbedder::default();
        let vectors = embed_many(&embedder, &[], 4)
            .await
            .expect("empty batch should succeed");
        assert!(vectors.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_default_embed_batch_is_sequential_and_ordered() {
        let embedder = HashEmbedder::default();
        let inputs = texts(6);
        let vectors = embedder
            .embed_batch(&inputs)
            .await
            .expect("embedding should succeed");
        assert_eq!(vectors[5], hash_vector(&inputs[5]));
        assert_eq!(embedder.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_unavailable() {
        let err = into_unavailable(RagError::Config("bad".to_string()));
        assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    }
}
