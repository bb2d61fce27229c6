//! Retriever - 쿼리 임베딩 + Top-k 검색
//!
//! 쿼리를 인덱스를 만든 것과 같은 임베더로 벡터화한 뒤
//! 인덱스가 돌려준 위치를 코퍼스 청크로 되돌립니다.
//!
//! 인덱스와 코퍼스의 순서/개수 일치는 호출자가 보장해야 합니다.
//! `KnowledgeBase`는 둘을 함께 빌드하여 이 조건을 구조적으로 지킵니다.

use crate::embedding::{embed_many, into_unavailable, EmbeddingProvider};
use crate::error::{RagError, Result};

use super::index::{FlatIndex, Metric};

// ============================================================================
// Types
// ============================================================================

/// 검색된 청크
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// 코퍼스 내 위치
    pub position: usize,
    /// 청크 텍스트
    pub text: String,
    /// L2: 제곱 거리, Cosine: 유사도
    pub score: f32,
}

// ============================================================================
// retrieve
// ============================================================================

/// Top-k 청크 검색
///
/// 파라미터 검증은 원격 호출 전에 수행하며, 호출당 임베딩 요청은 정확히 한 번입니다.
/// 결과는 인덱스 순위 순서입니다 (L2: 가까운 순, Cosine: 유사한 순).
pub async fn retrieve<E>(
    query: &str,
    index: &FlatIndex,
    corpus: &[String],
    k: usize,
    embedder: &E,
) -> Result<Vec<RetrievedChunk>>
where
    E: EmbeddingProvider + ?Sized,
{
    if query.trim().is_empty() {
        return Err(RagError::EmptyQuery);
    }
    if k == 0 {
        return Err(RagError::InvalidK(k));
    }

    let query_embedding = embedder.embed(query).await.map_err(into_unavailable)?;
    let neighbors = index.search(&query_embedding, k)?;

    let results: Vec<RetrievedChunk> = neighbors
        .into_iter()
        .filter_map(|neighbor| {
            corpus.get(neighbor.position).map(|text| RetrievedChunk {
                position: neighbor.position,
                text: text.clone(),
                score: neighbor.score,
            })
        })
        .collect();

    tracing::debug!(
        "Retrieved {} chunks (k={}, metric={})",
        results.len(),
        k,
        index.metric()
    );

    Ok(results)
}

// ============================================================================
// KnowledgeBase
// ============================================================================

/// 코퍼스와 인덱스 묶음
///
/// 위치 i의 벡터는 항상 i번째 청크에 대응하며, 빌드 이후 변경되지 않습니다.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    corpus: Vec<String>,
    index: FlatIndex,
    embedder_name: String,
}

impl KnowledgeBase {
    /// 청크를 임베딩하고 인덱스 빌드
    ///
    /// # Arguments
    /// * `chunks` - 순서가 고정될 코퍼스
    /// * `embedder` - 쿼리 시에도 같은 임베더를 사용해야 함
    /// * `metric` - 거리 메트릭
    /// * `concurrency` - 동시 임베딩 요청 수
    pub async fn build<E>(
        chunks: Vec<String>,
        embedder: &E,
        metric: Metric,
        concurrency: usize,
    ) -> Result<Self>
    where
        E: EmbeddingProvider + ?Sized,
    {
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let vectors = embed_many(embedder, &chunks, concurrency).await?;
        let mut kb = Self::from_parts(chunks, &vectors, metric)?;
        kb.embedder_name = embedder.name().to_string();

        tracing::info!(
            "Knowledge base ready: {} chunks, {} dims, metric={}",
            kb.len(),
            kb.index.dimension(),
            metric
        );

        Ok(kb)
    }

    /// 이미 계산된 벡터로 구성
    pub fn from_parts(corpus: Vec<String>, vectors: &[Vec<f32>], metric: Metric) -> Result<Self> {
        if corpus.len() != vectors.len() {
            return Err(RagError::CorpusMismatch {
                chunks: corpus.len(),
                vectors: vectors.len(),
            });
        }

        let index = FlatIndex::build(vectors, metric)?;
        Ok(Self {
            corpus,
            index,
            embedder_name: String::new(),
        })
    }

    /// Top-k 검색
    pub async fn retrieve<E>(&self, query: &str, k: usize, embedder: &E) -> Result<Vec<RetrievedChunk>>
    where
        E: EmbeddingProvider + ?Sized,
    {
        if !self.embedder_name.is_empty() && self.embedder_name != embedder.name() {
            tracing::warn!(
                "Querying with '{}' but the index was built with '{}'; distances may be meaningless",
                embedder.name(),
                self.embedder_name
            );
        }
        retrieve(query, &self.index, &self.corpus, k, embedder).await
    }

    /// 코퍼스 청크
    pub fn corpus(&self) -> &[String] {
        &self.corpus
    }

    /// 인덱스
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// 청크 수
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    /// 비어 있는지 여부 (빌드 규칙상 항상 false)
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::tests::{hash_vector, HashEmbedder};

    /// 고정 벡터 사전을 가진 목 임베더
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RagError::EmbeddingUnavailable("401 Unauthorized".to_string()));
            }
            self.table
                .get(text)
                .cloned()
                .ok_or_else(|| RagError::EmbeddingUnavailable(format!("unknown text {text}")))
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; 5];
        v[i] = 1.0;
        v
    }

    fn five_chunk_fixture() -> (FlatIndex, Vec<String>) {
        let corpus: Vec<String> = (0..5).map(|i| format!("chunk {i}")).collect();
        let vectors: Vec<Vec<f32>> = (0..5).map(axis).collect();
        let index = FlatIndex::build(&vectors, Metric::L2).expect("index should build");
        (index, corpus)
    }

    #[tokio::test]
    async fn test_retrieve_top3_of_5() {
        let (index, corpus) = five_chunk_fixture();
        let embedder = TableEmbedder::new(&[("near three", vec![0.1, 0.0, 0.3, 0.95, 0.0])]);

        let results = retrieve("near three", &index, &corpus, 3, &embedder)
            .await
            .expect("retrieval should succeed");

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "chunk 3");
        assert_eq!(results[1].text, "chunk 2");
        assert_eq!(results[2].text, "chunk 0");
        assert!(results.windows(2).all(|w| w[0].score <= w[1].score));

        let mut positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        positions.dedup();
        assert_eq!(positions.len(), 3);
        assert!(results.iter().all(|r| corpus.contains(&r.text)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retrieve_k_clipped_to_corpus() {
        let (index, corpus) = five_chunk_fixture();
        let embedder = TableEmbedder::new(&[("q", axis(1))]);

        let results = retrieve("q", &index, &corpus, 50, &embedder)
            .await
            .expect("retrieval should succeed");
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].position, 1);
    }

    #[tokio::test]
    async fn test_invalid_parameters_rejected_before_embedding() {
        let (index, corpus) = five_chunk_fixture();
        let embedder = TableEmbedder::new(&[]);

        let empty = retrieve("   ", &index, &corpus, 3, &embedder).await;
        assert!(matches!(empty, Err(RagError::EmptyQuery)));

        let zero_k = retrieve("query", &index, &corpus, 0, &embedder).await;
        assert!(matches!(zero_k, Err(RagError::InvalidK(0))));

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_unavailable() {
        let (index, corpus) = five_chunk_fixture();
        let mut embedder = TableEmbedder::new(&[]);
        embedder.fail = true;

        let result = retrieve("query", &index, &corpus, 3, &embedder).await;
        assert!(matches!(result, Err(RagError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let (index, corpus) = five_chunk_fixture();
        let embedder = TableEmbedder::new(&[("q", vec![1.0, 0.0, 0.0])]);

        let result = retrieve("q", &index, &corpus, 1, &embedder).await;
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_knowledge_base_build_and_retrieve() {
        let embedder = HashEmbedder::default();
        let chunks: Vec<String> = (0..12).map(|i| format!("passage {i}.")).collect();

        let kb = KnowledgeBase::build(chunks.clone(), &embedder, Metric::L2, 4)
            .await
            .expect("knowledge base should build");
        assert_eq!(kb.len(), 12);
        assert_eq!(kb.corpus(), chunks.as_slice());

        // 코퍼스 청크 자체로 질의하면 거리 0으로 자기 자신이 1위
        let results = kb
            .retrieve("passage 7.", 2, &embedder)
            .await
            .expect("retrieval should succeed");
        assert_eq!(results[0].position, 7);
        assert_eq!(results[0].score, 0.0);
        assert_eq!(hash_vector("passage 7.").len(), kb.index().dimension());
    }

    #[tokio::test]
    async fn test_knowledge_base_empty() {
        let embedder = HashEmbedder::default();
        let result = KnowledgeBase::build(vec![], &embedder, Metric::Cosine, 4).await;
        assert!(matches!(result, Err(RagError::EmptyCorpus)));
    }

    #[test]
    fn test_from_parts_count_mismatch() {
        let result = KnowledgeBase::from_parts(
            vec!["a".to_string(), "b".to_string()],
            &[vec![1.0, 0.0]],
            Metric::L2,
        );
        assert!(matches!(
            result,
            Err(RagError::CorpusMismatch {
                chunks: 2,
                vectors: 1
            })
        ));
    }
}
