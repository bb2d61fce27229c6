//! 파일 수집 모듈
//!
//! PDF 경로 또는 glob 패턴(`data/*.pdf`, `docs/**/*.pdf`)을 실제 파일 목록으로 펼칩니다.
//! glob은 `ignore` 크레이트의 override 매처로 평가하며, 결과는 파일명 순으로 정렬됩니다.

use std::path::{Component, Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

use crate::error::{RagError, Result};

/// glob 메타 문자 포함 여부
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// 경로 또는 glob 패턴을 파일 목록으로 변환
///
/// glob이 아니면 존재 여부와 상관없이 그대로 반환합니다 (읽기 실패는 추출 단계에서 처리).
/// glob의 기준 디렉토리가 없으면 빈 목록입니다.
pub fn collect_pdf_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    if !is_glob(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let (root, glob) = split_pattern(pattern);
    if !root.is_dir() {
        tracing::warn!("No directory {:?} for pattern '{}'", root, pattern);
        return Ok(vec![]);
    }

    let overrides = OverrideBuilder::new(&root)
        .add(&format!("/{}", glob))
        .and_then(|builder| builder.build())
        .map_err(|e| RagError::extraction(pattern, format!("invalid glob: {}", e)))?;

    // `**`가 없으면 패턴 깊이까지만 탐색
    let max_depth = if glob.contains("**") {
        None
    } else {
        Some(glob.split('/').count())
    };

    let walker = WalkBuilder::new(&root)
        .overrides(overrides)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .max_depth(max_depth)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Failed to read entry: {}", e);
                continue;
            }
        };

        // 파일만 처리
        if entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            files.push(entry.into_path());
        }
    }

    tracing::info!("Pattern '{}' matched {} files", pattern, files.len());
    Ok(files)
}

/// 패턴을 (glob이 없는 기준 디렉토리, 나머지 glob)으로 분리
fn split_pattern(pattern: &str) -> (PathBuf, String) {
    let mut root = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();

    for component in Path::new(pattern).components() {
        let part = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !is_glob(&part) {
            root.push(component);
            continue;
        }
        if let Component::Normal(_) | Component::CurDir | Component::ParentDir = component {
            rest.push(part.into_owned());
        }
    }

    if root.as_os_str().is_empty() {
        root = PathBuf::from(".");
    }

    (root, rest.join("/"))
}

// ============================================================================
// Tests
// ============================================================================
