//! Agent reply normalization into typed answer documents.
//!
//! The agent is asked for a JSON object but may wrap it in a markdown fence,
//! surround it with prose, leave trailing commas, or ignore the format
//! entirely. This module recovers whatever structure it can and maps it onto
//! an [`AnswerDocument`] through a priority-ordered alias table. It never
//! fails: a reply with no recoverable object becomes
//! [`ParsedAnswer::Unstructured`] and is displayed verbatim.

use eonet_types::{AnswerDocument, AnswerSource, ParsedAnswer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Label the agent uses when it has nothing better; such sources are dropped.
pub const SOURCE_PLACEHOLDER: &str = "Source";

/// Logical fields of an [`AnswerDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerField {
    /// Short overview.
    Summary,
    /// What the event means.
    Meaning,
    /// How to interpret the data.
    HowToRead,
    /// Caveats.
    Limitations,
    /// Suggested follow-ups.
    NextSteps,
    /// Cited sources.
    Sources,
}

impl AnswerField {
    /// Every field, in document order.
    pub const ALL: [Self; 6] = [
        Self::Summary,
        Self::Meaning,
        Self::HowToRead,
        Self::Limitations,
        Self::NextSteps,
        Self::Sources,
    ];

    /// Accepted keys for this field, highest priority first.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Summary => &["summary"],
            Self::Meaning => &["meaning", "what_is_happening", "what", "details"],
            Self::HowToRead => &["how_to_read", "how_to_interpret", "how_to_use"],
            Self::Limitations => &["limitations", "caveats", "uncertainty"],
            Self::NextSteps => &["next_steps", "recommended_actions", "actions"],
            Self::Sources => &["sources", "references", "links"],
        }
    }
}

/// Normalize a raw agent reply.
///
/// Extraction order:
/// 1. a fenced code block (```` ```json ```` first, then an untagged fence)
/// 2. the whole trimmed text, when it is a single `{...}` object
/// 3. the slice from the first `{` to the last `}`
///
/// Each candidate is retried once with trailing commas stripped. The first
/// candidate that parses to a JSON object wins.
pub fn normalize_answer(raw: &str) -> ParsedAnswer {
    match extract_object(raw) {
        Some(obj) => ParsedAnswer::Structured(map_document(&obj)),
        None => {
            if !raw.trim().is_empty() {
                warn!(raw_len = raw.len(), "agent reply has no structured object, showing raw text");
            }
            ParsedAnswer::Unstructured(raw.to_owned())
        }
    }
}

/// Map an already-parsed JSON object onto an [`AnswerDocument`].
///
/// Unknown keys are ignored and missing fields stay empty.
pub fn map_document(obj: &Map<String, Value>) -> AnswerDocument {
    AnswerDocument {
        summary: pick(obj, AnswerField::Summary)
            .and_then(stringify)
            .unwrap_or_default(),
        meaning: pick(obj, AnswerField::Meaning).map(as_list).unwrap_or_default(),
        how_to_read: pick(obj, AnswerField::HowToRead).map(as_list).unwrap_or_default(),
        limitations: pick(obj, AnswerField::Limitations).map(as_list).unwrap_or_default(),
        next_steps: pick(obj, AnswerField::NextSteps).map(as_list).unwrap_or_default(),
        sources: pick(obj, AnswerField::Sources).map(normalize_sources).unwrap_or_default(),
    }
}

/// Normalize a list of source entries.
///
/// Accepts plain strings and objects exposing a label via `label`, `title`,
/// `name` or `url` plus an optional `url`. Entries without a usable label,
/// or labelled with the placeholder, are dropped. Non-arrays yield nothing.
pub fn normalize_sources(value: &Value) -> Vec<AnswerSource> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(AnswerSource::labelled(s.trim())),
            Value::Object(entry) => {
                let label = ["label", "title", "name", "url"]
                    .iter()
                    .find_map(|k| entry.get(*k).filter(|v| !v.is_null()))
                    .and_then(stringify)
                    .unwrap_or_else(|| SOURCE_PLACEHOLDER.to_owned());
                let url = entry.get("url").and_then(stringify);
                Some(AnswerSource { label, url })
            }
            _ => None,
        })
        .filter(|s| !s.label.is_empty() && s.label != SOURCE_PLACEHOLDER)
        .collect()
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(inner) = extract_fenced_block(trimmed)
        && let Some(obj) = parse_object(inner)
    {
        debug!(strategy = "fenced", "agent reply parsed");
        return Some(obj);
    }

    if trimmed.starts_with('{')
        && trimmed.ends_with('}')
        && let Some(obj) = parse_object(trimmed)
    {
        debug!(strategy = "whole", "agent reply parsed");
        return Some(obj);
    }

    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if last <= first {
        return None;
    }
    let slice = trimmed.get(first..=last)?;
    let obj = parse_object(slice)?;
    debug!(strategy = "slice", "agent reply parsed");
    Some(obj)
}

/// Contents of the first fenced code block, preferring one tagged `json`.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let (open, tag_len) = match lower.find("```json") {
        Some(i) => (i, 7),
        None => (lower.find("```")?, 3),
    };
    let body_start = open.checked_add(tag_len)?;
    let remaining = text.get(body_start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    let value = serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&strip_trailing_commas(candidate)).ok())?;
    match value {
        Value::Object(obj) => Some(obj),
        _ => None,
    }
}

/// Strip trailing commas before closing braces and brackets.
///
/// Commas inside string literals are left alone.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars
                .iter()
                .skip(i.saturating_add(1))
                .find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn pick(obj: &Map<String, Value>, field: AnswerField) -> Option<&Value> {
    field
        .aliases()
        .iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

/// Render a scalar or nested value as trimmed text; `None` for null/blank.
fn stringify(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_owned(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok()?,
    };
    (!text.is_empty()).then_some(text)
}

fn as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(stringify).collect(),
        Value::String(_) => stringify(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn structured(raw: &str) -> AnswerDocument {
        match normalize_answer(raw) {
            ParsedAnswer::Structured(doc) => doc,
            ParsedAnswer::Unstructured(text) => panic!("expected structured, got raw {text:?}"),
        }
    }

    #[test]
    fn fenced_json_block() {
        let doc = structured("```json\n{\"summary\":\"ok\"}\n```");
        assert_eq!(
            doc,
            AnswerDocument {
                summary: "ok".to_owned(),
                ..AnswerDocument::default()
            }
        );
    }

    #[test]
    fn fenced_block_tag_is_case_insensitive() {
        let doc = structured("Here you go:\n```JSON\n{\"summary\":\"upper\"}\n```\nBye");
        assert_eq!(doc.summary, "upper");
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let doc = structured("```\n{\"summary\":\"plain\"}\n```");
        assert_eq!(doc.summary, "plain");
    }

    #[test]
    fn whole_text_object_with_string_coerced_to_list() {
        let doc = structured("{\"meaning\":\"single\"}");
        assert_eq!(doc.meaning, vec!["single".to_owned()]);
        assert_eq!(doc.summary, "");
    }

    #[test]
    fn object_embedded_in_noise() {
        let doc = structured("noise {\"summary\":\"x\"} trailing");
        assert_eq!(doc.summary, "x");
    }

    #[test]
    fn broken_fence_without_other_object_is_unstructured() {
        let raw = "```json\n{\"summary\": oops}\n```";
        assert!(normalize_answer(raw).is_unstructured());
    }

    #[test]
    fn broken_fence_falls_back_to_whole_text() {
        let raw = "{\"summary\": \"outer\", \"meaning\": \"```json {bad} ```\"}";
        assert_eq!(structured(raw).summary, "outer");
    }

    #[test]
    fn not_json_is_unstructured() {
        assert_eq!(
            normalize_answer("not json at all"),
            ParsedAnswer::Unstructured("not json at all".to_owned())
        );
    }

    #[test]
    fn unstructured_keeps_raw_text_verbatim() {
        let raw = "  line one\nline two  ";
        assert_eq!(normalize_answer(raw), ParsedAnswer::Unstructured(raw.to_owned()));
        assert_eq!(normalize_answer(""), ParsedAnswer::Unstructured(String::new()));
    }

    #[test]
    fn non_object_json_is_unstructured() {
        assert!(normalize_answer("[1, 2, 3]").is_unstructured());
        assert!(normalize_answer("42").is_unstructured());
        assert!(normalize_answer("\"just a string\"").is_unstructured());
    }

    #[test]
    fn trailing_commas_are_repaired() {
        let doc = structured("{\"summary\": \"a, b\", \"meaning\": [\"one\", \"two\",],}");
        assert_eq!(doc.summary, "a, b");
        assert_eq!(doc.meaning, vec!["one".to_owned(), "two".to_owned()]);
    }

    #[test]
    fn strip_commas_leaves_strings_alone() {
        assert_eq!(strip_trailing_commas(r#"{"a": ",}",}"#), r#"{"a": ",}"}"#);
        assert_eq!(strip_trailing_commas("[1, 2,\n ]"), "[1, 2\n ]");
    }

    #[test]
    fn alias_priority_is_respected() {
        for field in AnswerField::ALL {
            let aliases = field.aliases();
            for (rank, key) in aliases.iter().enumerate() {
                // Every lower-priority alias is present too; the first one
                // present must win.
                let mut obj = Map::new();
                for (i, k) in aliases.iter().enumerate().skip(rank) {
                    let v = if field == AnswerField::Sources {
                        json!([format!("src-{i}")])
                    } else {
                        json!(format!("val-{i}"))
                    };
                    obj.insert((*k).to_owned(), v);
                }
                let doc = map_document(&obj);
                let expected = format!("{}-{rank}", if field == AnswerField::Sources { "src" } else { "val" });
                let got = match field {
                    AnswerField::Summary => doc.summary.clone(),
                    AnswerField::Meaning => doc.meaning.concat(),
                    AnswerField::HowToRead => doc.how_to_read.concat(),
                    AnswerField::Limitations => doc.limitations.concat(),
                    AnswerField::NextSteps => doc.next_steps.concat(),
                    AnswerField::Sources => doc.sources.first().map(|s| s.label.clone()).unwrap_or_default(),
                };
                assert_eq!(got, expected, "field {field:?} alias {key}");
            }
        }
    }

    #[test]
    fn null_alias_defers_to_next_key() {
        let doc = structured(r#"{"meaning": null, "what": ["fallback"]}"#);
        assert_eq!(doc.meaning, vec!["fallback".to_owned()]);
    }

    #[test]
    fn list_coercion_rules() {
        let doc = structured(
            r#"{"meaning": ["  a  ", "", "   ", 3, true, null, {"k": 1}], "limitations": 7, "next_steps": "  "}"#,
        );
        assert_eq!(
            doc.meaning,
            vec!["a".to_owned(), "3".to_owned(), "true".to_owned(), "{\"k\":1}".to_owned()]
        );
        assert!(doc.limitations.is_empty());
        assert!(doc.next_steps.is_empty());
    }

    #[test]
    fn summary_is_trimmed_and_stringified() {
        assert_eq!(structured(r#"{"summary": "  hi  "}"#).summary, "hi");
        assert_eq!(structured(r#"{"summary": 12}"#).summary, "12");
    }

    #[test]
    fn source_shapes_are_normalized() {
        let sources = normalize_sources(&json!(["NASA", {"title": "EONET", "url": "http://x"}]));
        assert_eq!(
            sources,
            vec![
                AnswerSource {
                    label: "NASA".to_owned(),
                    url: None
                },
                AnswerSource {
                    label: "EONET".to_owned(),
                    url: Some("http://x".to_owned())
                },
            ]
        );
    }

    #[test]
    fn source_label_fallbacks() {
        let sources = normalize_sources(&json!([
            {"name": "GDACS"},
            {"url": "https://only.url"},
            {"label": "Source", "url": "https://placeholder"},
            {},
            "",
            42,
            null,
            {"label": "L", "title": "T"}
        ]));
        let labels: Vec<&str> = sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["GDACS", "https://only.url", "L"]);
        assert_eq!(
            sources.get(1).and_then(|s| s.url.as_deref()),
            Some("https://only.url")
        );
    }

    #[test]
    fn sources_must_be_an_array() {
        assert!(normalize_sources(&json!("NASA")).is_empty());
        assert!(normalize_sources(&json!({"label": "NASA"})).is_empty());
    }

    #[test]
    fn full_document_with_synonyms() {
        let raw = r#"Sure! ```json
{
  "summary": "A wildfire is burning.",
  "what_is_happening": ["Active fire"],
  "how_to_interpret": "Points are detections",
  "caveats": ["Satellite lag"],
  "recommended_actions": ["Follow local guidance"],
  "references": [{"label": "InciWeb", "url": "https://inciweb.example"}]
}
```"#;
        let doc = structured(raw);
        assert_eq!(doc.summary, "A wildfire is burning.");
        assert_eq!(doc.meaning, vec!["Active fire".to_owned()]);
        assert_eq!(doc.how_to_read, vec!["Points are detections".to_owned()]);
        assert_eq!(doc.limitations, vec!["Satellite lag".to_owned()]);
        assert_eq!(doc.next_steps, vec!["Follow local guidance".to_owned()]);
        assert_eq!(doc.sources.len(), 1);
    }
}
