//! Validation gate between an extraction result and a promoted deal.
//!
//! The untyped AI reply is folded into a closed [`Verdict`] before any field
//! is read, so the extraction stage only ever matches on two variants.

use std::fmt;

use dealdb_core::ExtractedFields;
use serde::Serialize;
use serde_json::{Map, Value};

/// Why a raw deal was consumed without producing a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AiFailed,
    InvalidResult,
    MissingSummary,
    MissingOtherImportantStuff,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiFailed => "AI processing failed",
            Self::InvalidResult => "Invalid AI result",
            Self::MissingSummary => "Missing professional summary",
            Self::MissingOtherImportantStuff => "Missing other important stuff",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SkipReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid(ExtractedFields),
    Invalid(SkipReason),
}

/// Evaluates an extraction result.
///
/// Checks, in order: no result, not an object, blank `professionalSummary`,
/// blank `otherImportantStuff`, then `isSale`, which must be a boolean.
/// Every other field is optional: `lowQuality` and `link` default to `false`
/// and `[]`, figures to `None`. A value of the wrong type is treated like an
/// absent one rather than failing the record; non-string `link` items are
/// dropped.
#[must_use]
pub fn evaluate(result: Option<&Value>) -> Verdict {
    let Some(value) = result else {
        return Verdict::Invalid(SkipReason::AiFailed);
    };
    let Some(obj) = value.as_object() else {
        return Verdict::Invalid(SkipReason::InvalidResult);
    };

    let Some(professional_summary) = non_blank(obj, "professionalSummary") else {
        return Verdict::Invalid(SkipReason::MissingSummary);
    };
    let Some(other_important_stuff) = non_blank(obj, "otherImportantStuff") else {
        return Verdict::Invalid(SkipReason::MissingOtherImportantStuff);
    };

    match shape(obj, professional_summary, other_important_stuff) {
        Some(fields) => Verdict::Valid(fields),
        None => Verdict::Invalid(SkipReason::InvalidResult),
    }
}

fn shape(
    obj: &Map<String, Value>,
    professional_summary: String,
    other_important_stuff: String,
) -> Option<ExtractedFields> {
    let is_sale = obj.get("isSale")?.as_bool()?;
    let low_quality = match obj.get("lowQuality") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            tracing::debug!(value = %other, "lowQuality is not a boolean; defaulting to false");
            false
        }
    };

    Some(ExtractedFields {
        is_sale,
        low_quality,
        professional_summary,
        monthly_revenue: figure(obj, "monthlyRevenue"),
        asking_price: figure(obj, "askingPrice"),
        user_count: figure(obj, "userCount"),
        link: links(obj),
        other_important_stuff,
    })
}

fn links(obj: &Map<String, Value>) -> Vec<String> {
    match obj.get("link") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let kept: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            if kept.len() < items.len() {
                tracing::debug!(
                    dropped = items.len() - kept.len(),
                    "dropped non-string link items"
                );
            }
            kept
        }
        Some(other) => {
            tracing::debug!(value = %other, "link is not an array; defaulting to empty");
            Vec::new()
        }
    }
}

/// A string field that is present and not blank. The value is kept verbatim.
fn non_blank(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Free-form figure: string or null. Bare numbers are kept as their text.
fn figure(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            tracing::debug!(field = key, value = %other, "figure has unexpected type; dropped");
            None
        }
    }
}
