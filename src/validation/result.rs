//! Result validator: raw agent payload in, `ExtractionResult` or `ParseFailure` out.
//!
//! The boundary is total. Every input maps to one of the two variants and
//! nothing here panics, whatever the agent sent.

use serde_json::{Map, Value};

use crate::agent::RawResult;
use crate::domain::{ExtractionResult, ParseFailure, SubRecord};
use crate::validation::extract::parse_json_text;

const NO_RESULT: &str = "agent returned no result";

/// Validate a raw agent payload against the order-history schema.
///
/// Accepts a single company object, or the `{"posts": [...]}` / bare-array
/// envelope in which case the company matching `expected_entity_name` is used
/// (first one if none match).
pub fn validate(raw: &RawResult, expected_entity_name: &str) -> Result<ExtractionResult, ParseFailure> {
    let raw_text = raw.to_text();
    let fail = |detail: String| ParseFailure::new(raw_text.clone(), detail);

    if raw.is_empty() {
        return Err(fail(NO_RESULT.to_string()));
    }

    let value = match raw {
        RawResult::Text(text) | RawResult::Structured(Value::String(text)) => parse_json_text(text).map_err(&fail)?,
        RawResult::Structured(value) => value.clone(),
        RawResult::Empty => return Err(fail(NO_RESULT.to_string())),
    };

    let company = select_company(&value, expected_entity_name).map_err(&fail)?;
    let result = parse_company(company).map_err(&fail)?;

    if !same_entity(&result.entity_name, expected_entity_name) {
        log::warn!(
            "Extracted company '{}' does not match expected '{}'",
            result.entity_name,
            expected_entity_name
        );
    }

    Ok(result)
}

fn same_entity(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Find the company object inside the payload.
fn select_company<'a>(value: &'a Value, expected: &str) -> Result<&'a Map<String, Value>, String> {
    match value {
        Value::Object(obj) if obj.contains_key("company_name") => Ok(obj),
        Value::Object(obj) => match obj.get("posts") {
            Some(Value::Array(posts)) => pick_post(posts, expected, "posts"),
            Some(other) => Err(format!("field 'posts' must be an array, found {}", json_type(other))),
            None => Err("missing required field 'company_name'".to_string()),
        },
        Value::Array(items) => pick_post(items, expected, "top-level array"),
        other => Err(format!("expected a JSON object, found {}", json_type(other))),
    }
}

fn pick_post<'a>(posts: &'a [Value], expected: &str, what: &str) -> Result<&'a Map<String, Value>, String> {
    let mut objects = Vec::with_capacity(posts.len());
    for (idx, post) in posts.iter().enumerate() {
        match post {
            Value::Object(obj) => objects.push(obj),
            other => return Err(format!("{}[{}] must be an object, found {}", what, idx, json_type(other))),
        }
    }

    let matching = objects.iter().find(|obj| {
        obj.get("company_name")
            .and_then(Value::as_str)
            .is_some_and(|name| same_entity(name, expected))
    });

    matching
        .or_else(|| objects.first())
        .copied()
        .ok_or_else(|| format!("{} is empty", what))
}

fn parse_company(obj: &Map<String, Value>) -> Result<ExtractionResult, String> {
    let entity_name = required_string(obj, "company_name")?;
    let source_reference = required_string(obj, "info_url")?;

    let history = match obj.get("order_history") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Err("missing required field 'order_history'".to_string()),
        Some(other) => {
            return Err(format!(
                "field 'order_history' must be an array, found {}",
                json_type(other)
            ));
        }
    };

    let records = history
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_sub_record(idx, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExtractionResult {
        entity_name,
        source_reference,
        records,
    })
}

fn parse_sub_record(idx: usize, value: &Value) -> Result<SubRecord, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("order_history[{}] must be an object, found {}", idx, json_type(value)))?;

    let field = |name: &str| optional_string(obj, name).map_err(|e| format!("order_history[{}].{}", idx, e));

    Ok(SubRecord {
        arrival_time: field("arrival_time")?,
        code: field("hs_code")?,
        description: field("product_description")?,
        amount: optional_amount(obj, "amount_usd").map_err(|e| format!("order_history[{}].{}", idx, e))?,
    })
}

fn required_string(obj: &Map<String, Value>, name: &str) -> Result<String, String> {
    match obj.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(format!("missing required field '{}'", name)),
        Some(other) => Err(format!("field '{}' must be a string, found {}", name, json_type(other))),
    }
}

fn optional_string(obj: &Map<String, Value>, name: &str) -> Result<Option<String>, String> {
    match obj.get(name) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(format!("{} must be a string or null, found {}", name, json_type(other))),
    }
}

fn optional_amount(obj: &Map<String, Value>, name: &str) -> Result<Option<f64>, String> {
    match obj.get(name) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| format!("{} is not a finite number", name)),
        Some(Value::String(s)) => parse_amount(s)
            .map(Some)
            .ok_or_else(|| format!("{} is not numeric: {:?}", name, s)),
        Some(other) => Err(format!("{} must be a number or null, found {}", name, json_type(other))),
    }
}

/// Parse a numeric string such as "411", "1,234.50" or "$ 99.9".
fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
