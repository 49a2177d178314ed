use serde::Deserialize;
use serde_json::Value;

/// Model output after lenient parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnalysis {
    pub summary: Option<String>,
    pub insights: String,
    pub extra_fix: Option<String>,
}

#[derive(Deserialize)]
struct LlmAnalysis {
    summary: Option<String>,
    insights: Option<Value>,
    #[serde(alias = "extra_fix")]
    #[serde(rename = "extraFix")]
    extra_fix: Option<String>,
}

/// Parse raw model text.
///
/// Takes the outermost `{...}` span so prose or code fences around the
/// object are ignored. Text that is not JSON at all becomes the insights
/// verbatim.
pub fn parse_analysis(raw: &str) -> ParsedAnalysis {
    let parsed = extract_json_object(raw)
        .and_then(|json| serde_json::from_str::<LlmAnalysis>(json).ok());

    match parsed {
        Some(analysis) => ParsedAnalysis {
            summary: non_empty(analysis.summary),
            insights: analysis.insights.map(flatten_insights).unwrap_or_default(),
            extra_fix: non_empty(analysis.extra_fix.map(|s| strip_code_fence(&s))),
        },
        None => ParsedAnalysis {
            summary: None,
            insights: raw.trim().to_string(),
            extra_fix: None,
        },
    }
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Insights may come back as a string or a list of strings.
fn flatten_insights(value: Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(format!("- {}", s.trim())),
                Value::Null => None,
                other => Some(format!("- {}", other)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag line
    let body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
