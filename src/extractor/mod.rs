//! 콘텐츠 추출 모듈
//!
//! 소스 파일에서 텍스트를 추출합니다.
//! - PDF 파일: pdf-extract로 페이지 텍스트 추출
//! - JSON 파일: `{url, text}` 레코드 배열
//! - Boilerplate 필터: 반복되는 잡음 줄 제거
//!
//! 추출 단계의 실패는 치명적이지 않습니다. 읽을 수 없는 파일은 로그를 남기고
//! `ExtractionReport::skipped`에 기록한 뒤 건너뜁니다.

pub mod filter;
pub mod json;
pub mod pdf;

use crate::error::RagError;

pub use filter::{dedupe_boilerplate_file, dedupe_lines, BoilerplateFilter, DedupeReport};
pub use json::{extract_json_records, parse_json_documents, read_json_documents, JsonDocument};
pub use pdf::{extract_pdf_pages, extract_pdf_text};

// ============================================================================
// Extraction Report
// ============================================================================

/// 추출 결과
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// 추출된 텍스트
    pub text: String,
    /// 성공적으로 읽은 소스 수
    pub sources: usize,
    /// 건너뛴 파일과 그 사유
    pub skipped: Vec<RagError>,
}

impl ExtractionReport {
    /// 건너뛴 파일 기록 (warn 로그 포함)
    pub(crate) fn skip(&mut self, err: RagError) {
        tracing::warn!("Skipping source: {}", err);
        self.skipped.push(err);
    }

    /// 추출된 문자 수
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

// ============================================================================
// Tests
// ============================================================================
