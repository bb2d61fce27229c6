//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.

use std::path::{Path, PathBuf};

use super::ExtractionReport;
use crate::collector::collect_pdf_paths;
use crate::error::{RagError, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// 빈 페이지는 제외됩니다. 스캔 문서처럼 텍스트가 없으면 빈 벡터를 반환합니다.
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| RagError::extraction(path, e))?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| RagError::extraction(path, e))?;

    // 텍스트가 비어있으면 경고
    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![]);
    }

    Ok(split_pdf_pages(&text))
}

/// 경로/glob 패턴 목록에서 PDF 텍스트 추출
///
/// 각 페이지 텍스트 뒤에 `"\n\n"`을 붙여 이어 붙입니다.
/// 읽을 수 없는 파일은 건너뛰고 보고서에 기록합니다.
pub async fn extract_pdf_text<S: AsRef<str>>(patterns: &[S]) -> ExtractionReport {
    let mut report = ExtractionReport::default();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let files = match collect_pdf_paths(pattern) {
            Ok(files) => files,
            Err(e) => {
                report.skip(e);
                continue;
            }
        };

        if files.is_empty() {
            tracing::warn!("No PDF files match pattern: {}", pattern);
        }

        for file in files {
            match extract_file(file).await {
                Ok(pages) => {
                    for page in pages {
                        report.text.push_str(&page);
                        report.text.push_str("\n\n");
                    }
                    report.sources += 1;
                }
                Err(e) => report.skip(e),
            }
        }
    }

    tracing::info!(
        "Extracted {} characters from {} PDF files ({} skipped)",
        report.char_count(),
        report.sources,
        report.skipped.len()
    );

    report
}

/// 단일 파일 추출
///
/// PDF 파싱은 CPU 바운드이므로 spawn_blocking에서 실행합니다.
/// 손상된 파일로 인한 파서 패닉도 추출 에러로 처리됩니다.
async fn extract_file(path: PathBuf) -> Result<Vec<String>> {
    let task_path = path.clone();
    let pages = tokio::task::spawn_blocking(move || extract_pdf_pages(&task_path))
        .await
        .map_err(|e| RagError::extraction(&path, format!("PDF extraction task failed: {}", e)))??;

    tracing::debug!("Extracted {} pages from {:?}", pages.len(), path);
    Ok(pages)
}

/// PDF 텍스트를 폼피드(`\x0c`) 기준으로 페이지별 분리
///
/// 페이지 텍스트는 그대로 유지하고, 공백뿐인 페이지만 제외합니다.
fn split_pdf_pages(text: &str) -> Vec<String> {
    text.split('\x0c')
        .filter(|page| !page.trim().is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pdf_pages_with_formfeed() {
        let text = "Page 1 content\x0cPage 2 content\x0c\x0cPage 3 content";
        let pages = split_pdf_pages(text);
        assert_eq!(pages, vec!["Page 1 content", "Page 2 content", "Page 3 content"]);
    }

    #[test]
    fn test_split_pdf_pages_keeps_page_text() {
        let text = "  Title\n\nFirst page.\n\x0c \n\x0c\nSecond page.  ";
        let pages = split_pdf_pages(text);
        assert_eq!(pages, vec!["  Title\n\nFirst page.\n", "\nSecond page.  "]);
    }

    #[test]
    fn test_split_pdf_pages_no_separator() {
        let text = "Just some text\n--- Page 2 ---\nwithout page breaks";
        assert_eq!(split_pdf_pages(text), vec![text]);
        assert!(split_pdf_pages("  \n ").is_empty());
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let result = extract_pdf_pages(Path::new("/nonexistent/report.pdf"));
        assert!(matches!(result, Err(RagError::Extraction { .. })));
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let pattern = format!("{}/*.pdf", dir.path().display());

        let report = extract_pdf_text(&[pattern.as_str(), "/nonexistent/manual.pdf"]).await;
        assert!(report.text.is_empty());
        assert_eq!(report.sources, 0);
        assert_eq!(report.skipped.len(), 1);
    }
}
