//! JSON 레코드 추출
//!
//! 스크랩된 웹 페이지를 담은 JSON 배열(`[{"url": ..., "text": ...}, ...]`)을 읽습니다.

use std::path::Path;

use serde_json::Value;

use crate::error::{RagError, Result};

/// JSON 레코드 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDocument {
    /// 원본 URL (없으면 `item_{i}`)
    pub url: String,
    /// 본문 (없으면 빈 문자열)
    pub text: String,
}

impl JsonDocument {
    /// `"{url}\n\n{text}"` 또는 `"{text}"`로 렌더링
    pub fn render(&self, include_url: bool) -> String {
        if include_url {
            format!("{}\n\n{}", self.url, self.text)
        } else {
            self.text.clone()
        }
    }
}

/// JSON 문자열 파싱
///
/// 최상위는 배열이어야 하며, 객체가 아닌 항목은 무시됩니다.
pub fn parse_json_documents(raw: &str) -> std::result::Result<Vec<JsonDocument>, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(format!("expected a JSON array, found {}", kind_of(&other))),
    };

    Ok(items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let record = item.as_object()?;
            Some(JsonDocument {
                url: field(record.get("url")).unwrap_or_else(|| format!("item_{}", i)),
                text: field(record.get("text")).unwrap_or_default(),
            })
        })
        .collect())
}

/// 파일에서 JSON 레코드 읽기
pub fn read_json_documents(path: &Path) -> Result<Vec<JsonDocument>> {
    let raw = std::fs::read_to_string(path).map_err(|e| RagError::extraction(path, e))?;
    let documents = parse_json_documents(&raw).map_err(|e| RagError::extraction(path, e))?;

    tracing::debug!("Read {} JSON records from {:?}", documents.len(), path);
    Ok(documents)
}

/// 파일의 레코드를 렌더링된 텍스트 목록으로 추출
pub fn extract_json_records(path: &Path, include_urls: bool) -> Result<Vec<String>> {
    Ok(read_json_documents(path)?
        .iter()
        .map(|doc| doc.render(include_urls))
        .collect())
}

/// 문자열 필드는 그대로, null/누락은 None, 그 외 값은 JSON 표기로
fn field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_parse_defaults() {
        let raw = r#"[
            {"url": "https://example.com/a", "text": "Alpha"},
            {"text": "Beta"},
            "not an object",
            {"url": "https://example.com/d"}
        ]"#;
        let docs = parse_json_documents(raw).expect("valid json");

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].url, "https://example.com/a");
        assert_eq!(docs[1].url, "item_1");
        assert_eq!(docs[2].url, "https://example.com/d");
        assert_eq!(docs[2].text, "");
    }

    #[test]
    fn test_render() {
        let doc = JsonDocument {
            url: "https://example.com".to_string(),
            text: "Body".to_string(),
        };
        assert_eq!(doc.render(true), "https://example.com\n\nBody");
        assert_eq!(doc.render(false), "Body");
    }

    #[test]
    fn test_non_array_rejected() {
        let err = parse_json_documents(r#"{"url": "x"}"#).unwrap_err();
        assert!(err.contains("an object"));
        assert!(parse_json_documents("not json").is_err());
    }

    #[test]
    fn test_extract_json_records_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("content.json");
        fs::write(&path, r#"[{"url": "u1", "text": "one"}, {"url": "u2", "text": "two"}]"#)
            .expect("write");

        let texts = extract_json_records(&path, true).expect("extract");
        assert_eq!(texts, vec!["u1\n\none", "u2\n\ntwo"]);

        let texts = extract_json_records(&path, false).expect("extract");
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_missing_file() {
        let result = extract_json_records(Path::new("/nonexistent/content.json"), false);
        assert!(matches!(result, Err(RagError::Extraction { .. })));
    }
}
