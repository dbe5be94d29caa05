//! Pure extraction of structured data from free-text judge completions.
//!
//! Only known fence markers are stripped before a strict JSON parse; there
//! is no partial or fuzzy recovery.

use crate::heartflow::weights::DimensionScores;
use serde_json::{Map, Value};

/// Field the summarization request asks the judge to fill.
pub const SUMMARY_FIELD: &str = "summarized_persona";

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJudgment {
    pub scores: DimensionScores,
    pub reasoning: Option<String>,
}

/// Strip a surrounding ```` ```json ```` or ```` ``` ```` fence if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Missing or non-numeric fields score 0; numeric strings are accepted.
fn score(map: &Map<String, Value>, field: &str) -> f64 {
    let value = match map.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .map_or(0.0, |v| v.clamp(0.0, DimensionScores::MAX))
}

/// Parse a scoring completion into the five dimension scores.
pub fn parse_judgment(raw: &str) -> Result<ParsedJudgment, String> {
    let map = parse_object(raw)?;
    let scores = DimensionScores {
        relevance: score(&map, "relevance"),
        willingness: score(&map, "willingness"),
        social: score(&map, "social"),
        timing: score(&map, "timing"),
        continuity: score(&map, "continuity"),
    };
    let reasoning = map
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    Ok(ParsedJudgment { scores, reasoning })
}

/// Parse a summarization completion. `None` on any parse failure or when
/// the field is absent.
pub fn parse_summary(raw: &str) -> Option<String> {
    let map = parse_object(raw).ok()?;
    map.get(SUMMARY_FIELD)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}
