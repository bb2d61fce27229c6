//! CLI 모듈
//!
//! docqa-rag CLI 명령어 정의 및 구현

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::{has_api_key, RagConfig};
use crate::extractor::dedupe_boilerplate_file;
use crate::knowledge::{chunk_text, KnowledgeBase, Metric, DEFAULT_DELIMITERS};
use crate::pipeline::{gather_text, Answer, Pipeline, SourceSpec};
use crate::tokenizer::{token_counter_for, TokenCounter, WordCounter};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docqa-rag")]
#[command(version, about = "문서 기반 질의응답 RAG 파이프라인", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 문서를 인덱싱하고 질문 하나에 답변
    Ask {
        /// 질문
        query: String,

        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// 문서를 한 번 인덱싱한 뒤 표준 입력으로 질문을 반복해서 받기
    Chat {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// 텍스트 파일 청킹 결과 확인 (API 키 불필요)
    Chunk {
        /// 청킹할 텍스트 파일
        file: PathBuf,

        /// 청크당 최대 토큰 수
        #[arg(long)]
        max_tokens: Option<usize>,

        /// BPE 대신 단어 수로 계산
        #[arg(long)]
        words: bool,
    },

    /// Boilerplate 참조 파일 정리 (공백 제거, 빈 줄/중복 제거)
    Dedupe {
        /// 정리할 파일
        file: PathBuf,
    },

    /// 상태 확인
    Status,
}

/// 지식 베이스 소스 옵션
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// PDF 파일 또는 glob 패턴 (반복 가능)
    #[arg(long = "pdf", default_value = "data/*.pdf")]
    pub pdf: Vec<String>,

    /// JSON 레코드 파일 (반복 가능)
    #[arg(long = "json")]
    pub json: Vec<PathBuf>,

    /// JSON 텍스트에서 제거할 boilerplate 줄 파일
    #[arg(long)]
    pub boilerplate: Option<PathBuf>,

    /// JSON 레코드 앞에 URL 포함
    #[arg(long)]
    pub include_urls: bool,
}

impl SourceArgs {
    fn to_spec(&self) -> SourceSpec {
        SourceSpec {
            pdf_patterns: self.pdf.clone(),
            json_paths: self.json.clone(),
            boilerplate_path: self.boilerplate.clone(),
            include_urls: self.include_urls,
        }
    }
}

/// 검색 옵션
#[derive(Args, Debug, Clone)]
pub struct RetrievalArgs {
    /// 검색할 청크 수 (기본: RAG_TOP_K 또는 5)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// 거리 메트릭 (l2 | cosine)
    #[arg(long)]
    pub metric: Option<Metric>,

    /// 답변에 사용된 청크 출력
    #[arg(long)]
    pub show_chunks: bool,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = RagConfig::from_env().context("설정 로드 실패")?;

    match cli.command {
        Commands::Ask {
            query,
            sources,
            retrieval,
        } => cmd_ask(config, &query, &sources, &retrieval).await,
        Commands::Chat { sources, retrieval } => cmd_chat(config, &sources, &retrieval).await,
        Commands::Chunk {
            file,
            max_tokens,
            words,
        } => cmd_chunk(&config, &file, max_tokens, words).await,
        Commands::Dedupe { file } => cmd_dedupe(&file),
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 질문 명령어 (ask)
async fn cmd_ask(
    config: RagConfig,
    query: &str,
    sources: &SourceArgs,
    retrieval: &RetrievalArgs,
) -> Result<()> {
    let (pipeline, kb) = prepare(config, sources, retrieval).await?;
    let k = retrieval.k.unwrap_or(pipeline.config().top_k);

    println!("[*] 질문 처리 중: '{}'", query);
    let answer = pipeline.ask(&kb, query, k).await;
    print_answer(&answer, retrieval.show_chunks);

    Ok(())
}

/// 대화 명령어 (chat)
///
/// EOF 또는 `exit`/`quit` 입력 시 종료합니다.
async fn cmd_chat(config: RagConfig, sources: &SourceArgs, retrieval: &RetrievalArgs) -> Result<()> {
    let (pipeline, kb) = prepare(config, sources, retrieval).await?;
    let k = retrieval.k.unwrap_or(pipeline.config().top_k);

    println!("[OK] 준비 완료. 질문을 입력하세요 (종료: exit)\n");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        let answer = pipeline.ask(&kb, query, k).await;
        print_answer(&answer, retrieval.show_chunks);
    }

    println!("[OK] 종료");
    Ok(())
}

/// 청킹 명령어 (chunk)
async fn cmd_chunk(
    config: &RagConfig,
    file: &Path,
    max_tokens: Option<usize>,
    words: bool,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("파일 읽기 실패: {:?}", file))?;

    let counter: Arc<dyn TokenCounter> = if words {
        Arc::new(WordCounter)
    } else {
        Arc::from(token_counter_for(&config.embedding_model))
    };
    let max_tokens = max_tokens.unwrap_or(config.max_tokens);

    let chunks = chunk_text(&text, max_tokens, DEFAULT_DELIMITERS, counter.clone())
        .context("청킹 실패")?;

    println!(
        "[OK] {} ({}) -> {} 청크 (max_tokens={}, counter={})\n",
        file.display(),
        format_bytes(text.len()),
        chunks.len(),
        max_tokens,
        counter.name()
    );

    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "  #{:<4} {:>5} tokens | {}",
            i + 1,
            counter.count_tokens(chunk),
            truncate_text(chunk, 60)
        );
    }

    Ok(())
}

/// 중복 제거 명령어 (dedupe)
fn cmd_dedupe(file: &Path) -> Result<()> {
    let report = dedupe_boilerplate_file(file).context("파일 정리 실패")?;

    println!("[OK] '{}' 정리 완료", file.display());
    println!("     - 줄 끝 공백 제거");
    println!("     - 빈 줄 및 중복 줄 제거");
    println!("     - 원본 줄 수: {}", report.original_lines);
    println!("     - 정리 후 줄 수: {}", report.unique_lines);

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &RagConfig) -> Result<()> {
    println!("docqa-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // API 키 상태
    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export OPENAI_API_KEY=your-key");
    }

    println!("[*] API 주소: {}", config.base_url);
    println!("[*] 임베딩 모델: {}", config.embedding_model);
    println!(
        "[*] 생성 모델: {} (temperature {})",
        config.chat_model, config.temperature
    );
    println!(
        "[*] 청크: 최대 {} 토큰 | 검색: top-{} {} | 동시 요청: {}",
        config.max_tokens, config.top_k, config.metric, config.concurrency
    );

    // 시스템 프롬프트 파일
    match std::fs::metadata(&config.system_prompt_path) {
        Ok(meta) => println!(
            "[OK] 시스템 프롬프트: {} ({})",
            config.system_prompt_path.display(),
            format_bytes(meta.len() as usize)
        ),
        Err(_) => println!(
            "[!] 시스템 프롬프트 없음: {} (기본 프롬프트 사용)",
            config.system_prompt_path.display()
        ),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 소스 추출 후 지식 베이스 빌드
async fn prepare(
    mut config: RagConfig,
    sources: &SourceArgs,
    retrieval: &RetrievalArgs,
) -> Result<(Pipeline, KnowledgeBase)> {
    // API 키 확인
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export OPENAI_API_KEY=your-api-key"
        );
    }

    if let Some(metric) = retrieval.metric {
        config.metric = metric;
    }

    let pipeline = Pipeline::from_config(config).context("파이프라인 초기화 실패")?;

    println!("[*] 텍스트 추출 중...");
    let gathered = gather_text(&sources.to_spec()).await;
    println!(
        "[OK] PDF {} 문자, JSON {} 문자 추출",
        gathered.pdf_chars, gathered.json_chars
    );
    for skipped in &gathered.skipped {
        println!("[!] 건너뜀: {}", skipped);
    }

    println!("[*] 지식 베이스 빌드 중 (청킹, 임베딩, 인덱스)...");
    let kb = pipeline
        .build_knowledge_base(&gathered.text)
        .await
        .context("지식 베이스 빌드 실패")?;
    println!(
        "[OK] {} 청크 인덱싱 완료 ({} 차원, {})",
        kb.len(),
        kb.index().dimension(),
        kb.index().metric()
    );

    Ok((pipeline, kb))
}

/// 답변 출력
fn print_answer(answer: &Answer, show_chunks: bool) {
    if show_chunks && !answer.sources.is_empty() {
        println!("\n[OK] 관련 청크 ({} 건):\n", answer.sources.len());
        for (i, chunk) in answer.sources.iter().enumerate() {
            println!(
                "{}. [#{} | 점수: {:.4}] {}",
                i + 1,
                chunk.position,
                chunk.score,
                truncate_text(&chunk.text, 200)
            );
        }
    }

    if answer.is_available() {
        println!("\n[답변]\n{}\n", answer.text);
    } else {
        println!("\n[!] {}\n", answer.text);
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_sources() {
        let cli = Cli::try_parse_from([
            "docqa-rag",
            "ask",
            "What is solar?",
            "--pdf",
            "docs/*.pdf",
            "--pdf",
            "extra.pdf",
            "--json",
            "content.json",
            "--include-urls",
            "-k",
            "7",
            "--metric",
            "cosine",
        ])
        .expect("valid arguments");

        match cli.command {
            Commands::Ask {
                query,
                sources,
                retrieval,
            } => {
                assert_eq!(query, "What is solar?");
                let spec = sources.to_spec();
                assert_eq!(spec.pdf_patterns, vec!["docs/*.pdf", "extra.pdf"]);
                assert_eq!(spec.json_paths, vec![PathBuf::from("content.json")]);
                assert!(spec.include_urls);
                assert_eq!(retrieval.k, Some(7));
                assert_eq!(retrieval.metric, Some(Metric::Cosine));
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn test_default_pdf_pattern() {
        let cli = Cli::try_parse_from(["docqa-rag", "chat"]).expect("valid arguments");
        match cli.command {
            Commands::Chat { sources, retrieval } => {
                assert_eq!(sources.pdf, vec!["data/*.pdf"]);
                assert!(sources.boilerplate.is_none());
                assert!(retrieval.k.is_none());
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_invalid_metric_rejected() {
        let result = Cli::try_parse_from(["docqa-rag", "ask", "q", "--metric", "manhattan"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_truncate_unicode() {
        let romanian = "Întrebare despre panouri";
        assert_eq!(truncate_text(romanian, 9), "Întrebare...");
    }
}
