//! RAG 파이프라인
//!
//! 추출 → 필터 → 청킹 → 임베딩 → 인덱스 빌드 (코퍼스당 1회)
//! 쿼리 시: 쿼리 임베딩 → Top-k 검색 → 답변 생성
//!
//! 모든 협력자(임베더, 생성기, 토크나이저)는 생성 시 주입됩니다.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, OpenAiEmbedding};
use crate::error::{RagError, Result};
use crate::extractor::{extract_pdf_text, read_json_documents, BoilerplateFilter};
use crate::generation::{load_system_prompt, Answerer, Generator, OpenAiChat};
use crate::knowledge::{delimiter_chunker, ChunkConfig, Chunker, KnowledgeBase, RetrievedChunk};
use crate::openai::OpenAiClient;
use crate::tokenizer::{token_counter_for, TokenCounter};

/// 검색이나 생성이 실패했을 때의 답변
pub const NO_ANSWER: &str = "Sorry, no answer is available right now. Please try again later.";

// ============================================================================
// Sources
// ============================================================================

/// 지식 베이스 소스 지정
#[derive(Debug, Clone, Default)]
pub struct SourceSpec {
    /// PDF 경로 또는 glob 패턴
    pub pdf_patterns: Vec<String>,
    /// JSON 레코드 파일
    pub json_paths: Vec<PathBuf>,
    /// Boilerplate 참조 파일 (JSON 텍스트에만 적용)
    pub boilerplate_path: Option<PathBuf>,
    /// JSON 레코드 앞에 URL 포함 여부
    pub include_urls: bool,
}

/// 수집된 텍스트
#[derive(Debug, Default)]
pub struct GatheredText {
    /// PDF 텍스트 + `"\n\n"` + JSON 텍스트
    pub text: String,
    /// PDF에서 추출한 문자 수
    pub pdf_chars: usize,
    /// JSON에서 추출한 문자 수 (필터 적용 후)
    pub json_chars: usize,
    /// 건너뛴 소스
    pub skipped: Vec<RagError>,
}

/// 모든 소스에서 텍스트 수집
///
/// 추출 실패는 로그를 남기고 건너뜁니다. Boilerplate 파일을 읽지 못하면
/// 필터 없이 진행합니다.
pub async fn gather_text(spec: &SourceSpec) -> GatheredText {
    let pdf = extract_pdf_text(spec.pdf_patterns.as_slice()).await;
    let mut skipped = pdf.skipped;

    let filter = match &spec.boilerplate_path {
        Some(path) => match BoilerplateFilter::from_file(path) {
            Ok(filter) => Some(filter),
            Err(e) => {
                tracing::warn!("Boilerplate filter disabled: {}", e);
                skipped.push(e);
                None
            }
        },
        None => None,
    };

    let mut json_parts = Vec::new();
    for path in &spec.json_paths {
        match read_json_documents(path) {
            Ok(documents) => {
                json_parts.extend(documents.iter().map(|doc| {
                    let rendered = doc.render(spec.include_urls);
                    match &filter {
                        Some(filter) => filter.filter(&rendered),
                        None => rendered,
                    }
                }));
            }
            Err(e) => {
                tracing::warn!("Skipping source: {}", e);
                skipped.push(e);
            }
        }
    }
    let json_text = json_parts.join("\n\n");

    let gathered = GatheredText {
        pdf_chars: pdf.text.chars().count(),
        json_chars: json_text.chars().count(),
        text: format!("{}\n\n{}", pdf.text, json_text),
        skipped,
    };

    tracing::info!(
        "Gathered {} PDF chars and {} JSON chars ({} sources skipped)",
        gathered.pdf_chars,
        gathered.json_chars,
        gathered.skipped.len()
    );

    gathered
}

// ============================================================================
// Answer
// ============================================================================

/// 질의 결과
#[derive(Debug, Clone)]
pub struct Answer {
    /// 답변 텍스트
    pub text: String,
    /// 답변에 사용된 청크 (순위 순)
    pub sources: Vec<RetrievedChunk>,
}

impl Answer {
    /// 답변 불가 응답
    pub fn unavailable() -> Self {
        Self {
            text: NO_ANSWER.to_string(),
            sources: vec![],
        }
    }

    pub fn is_available(&self) -> bool {
        self.text != NO_ANSWER
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// RAG 파이프라인
pub struct Pipeline {
    config: RagConfig,
    chunker: Box<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    answerer: Answerer<dyn Generator>,
}

impl Pipeline {
    /// 협력자를 주입하여 생성
    ///
    /// 시스템 프롬프트는 `config.system_prompt_path`에서 한 번 읽습니다.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Box<dyn Generator>,
        tokenizer: Arc<dyn TokenCounter>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = delimiter_chunker(ChunkConfig::new(config.max_tokens)?, tokenizer);
        let system_prompt = load_system_prompt(&config.system_prompt_path);
        let answerer = Answerer::new(
            generator,
            config.chat_model.clone(),
            config.temperature,
            system_prompt,
        );

        Ok(Self {
            config,
            chunker,
            embedder,
            answerer,
        })
    }

    /// OpenAI 클라이언트로 구성
    ///
    /// 토큰 수는 임베딩 모델의 토크나이저로 계산합니다.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let client = OpenAiClient::from_config(&config)?;
        let embedder = Arc::new(OpenAiEmbedding::new(
            client.clone(),
            config.embedding_model.clone(),
        ));
        let generator = Box::new(OpenAiChat::new(client));
        let tokenizer: Arc<dyn TokenCounter> = Arc::from(token_counter_for(&config.embedding_model));

        Self::new(config, embedder, generator, tokenizer)
    }

    /// 설정
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// 텍스트 청킹
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.chunker.chunk(text)
    }

    /// 텍스트로 지식 베이스 빌드
    ///
    /// 내용이 없는 (공백뿐인) 청크는 인덱싱하지 않습니다.
    /// 실패 시 에러를 그대로 반환합니다.
    pub async fn build_knowledge_base(&self, text: &str) -> Result<KnowledgeBase> {
        let chunks: Vec<String> = self
            .chunk(text)
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect();

        tracing::info!(
            "Chunked {} chars into {} chunks (max_tokens={})",
            text.len(),
            chunks.len(),
            self.config.max_tokens
        );

        KnowledgeBase::build(
            chunks,
            self.embedder.as_ref(),
            self.config.metric,
            self.config.concurrency,
        )
        .await
    }

    /// 검색 후 답변 생성 (에러 반환)
    pub async fn try_ask(&self, kb: &KnowledgeBase, query: &str, k: usize) -> Result<Answer> {
        let sources = kb.retrieve(query, k, self.embedder.as_ref()).await?;
        let texts: Vec<&str> = sources.iter().map(|chunk| chunk.text.as_str()).collect();
        let text = self.answerer.answer(query, &texts).await?;

        Ok(Answer { text, sources })
    }

    /// 검색 후 답변 생성
    ///
    /// 실패는 로그로 남기고 답변 불가 응답으로 대체합니다.
    pub async fn ask(&self, kb: &KnowledgeBase, query: &str, k: usize) -> Answer {
        match self.try_ask(kb, query, k).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Failed to answer '{}': {}", query, e);
                Answer::unavailable()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
