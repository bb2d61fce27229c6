//! docqa-rag - 문서 질의응답 RAG 파이프라인
//!
//! PDF/JSON에서 텍스트를 추출하여 구분자 단위로 청킹하고,
//! 원격 임베딩 API로 벡터화한 뒤 플랫 인덱스에서 최근접 청크를 찾아
//! 생성 모델로 답변합니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod knowledge;
pub mod openai;
pub mod pipeline;
pub mod tokenizer;

// Re-exports
pub use config::{has_api_key, RagConfig};
pub use embedding::{embed_many, EmbeddingProvider, OpenAiEmbedding};
pub use error::{RagError, Result};
pub use extractor::{BoilerplateFilter, ExtractionReport, JsonDocument};
pub use generation::{build_user_prompt, Answerer, Generator, OpenAiChat};
pub use knowledge::{
    chunk_text, delimiter_chunker, retrieve, ChunkConfig, Chunker,
    DelimiterChunker, FlatIndex, KnowledgeBase, Metric, Neighbor, RetrievedChunk,
    DEFAULT_DELIMITERS,
};
pub use openai::OpenAiClient;
pub use pipeline::{gather_text, Answer, Pipeline, SourceSpec, NO_ANSWER};
pub use tokenizer::{token_counter_for, TiktokenCounter, TokenCounter, WordCounter};
