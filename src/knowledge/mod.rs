//! Knowledge 모듈 - 청킹, 벡터 인덱스, 검색
//!
//! - Chunker: 구분자 인식 텍스트 분할
//! - Index: 플랫 최근접 이웃 인덱스 (L2 / Cosine)
//! - Retriever: 쿼리 임베딩 후 Top-k 청크 반환

mod chunker;
mod index;
mod retriever;

// Re-exports
pub use chunker::{
    Chunker, ChunkConfig, DelimiterChunker,
    chunk_text, delimiter_chunker,
    DEFAULT_DELIMITERS,
};
pub use index::{FlatIndex, Metric, Neighbor};
pub use retriever::{KnowledgeBase, RetrievedChunk, retrieve};
