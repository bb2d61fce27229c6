//! Boilerplate 줄 필터
//!
//! 웹 페이지마다 반복되는 메뉴, 푸터 같은 줄을 참조 파일에 모아두고
//! 추출된 텍스트에서 정확히 일치하는 줄을 제거합니다.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{RagError, Result};

/// Boilerplate 줄 집합
#[derive(Debug, Clone, Default)]
pub struct BoilerplateFilter {
    lines: HashSet<String>,
}

impl BoilerplateFilter {
    /// 줄 목록으로 생성 (양쪽 공백 제거, 빈 줄 제외)
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        Self { lines }
    }

    /// 참조 파일에서 로드
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::extraction(path, e))?;
        let filter = Self::from_lines(content.lines());
        tracing::debug!("Loaded {} boilerplate lines from {:?}", filter.len(), path);
        Ok(filter)
    }

    /// 줄 수
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// boilerplate 줄인지 여부
    pub fn contains(&self, line: &str) -> bool {
        self.lines.contains(line.trim())
    }

    /// 빈 줄과 boilerplate 줄을 제거하고 `"\n"`으로 다시 연결
    pub fn filter(&self, text: &str) -> String {
        text.lines()
            .filter(|line| !line.trim().is_empty() && !self.contains(line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// Dedupe
// ============================================================================

/// 중복 제거 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeReport {
    /// 원본 줄 수
    pub original_lines: usize,
    /// 정리 후 줄 수
    pub unique_lines: usize,
}

/// 줄 끝 공백 제거, 빈 줄 제거, 중복 제거 (첫 등장 순서 유지)
pub fn dedupe_lines(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

/// Boilerplate 참조 파일을 정리하여 다시 쓰기
pub fn dedupe_boilerplate_file(path: &Path) -> Result<DedupeReport> {
    let content = std::fs::read_to_string(path).map_err(|e| RagError::extraction(path, e))?;
    let unique = dedupe_lines(&content);

    std::fs::write(path, unique.join("\n")).map_err(|e| RagError::extraction(path, e))?;

    let report = DedupeReport {
        original_lines: content.lines().count(),
        unique_lines: unique.len(),
    };
    tracing::info!(
        "Deduplicated {:?}: {} -> {} lines",
        path,
        report.original_lines,
        report.unique_lines
    );
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
