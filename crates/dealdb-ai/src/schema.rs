//! Strict structured-output schema for deal extraction.

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

/// Shape the extraction model is constrained to.
///
/// Only used to generate the schema; responses are validated downstream as
/// untyped JSON so a non-conformant reply can be recorded verbatim.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct DealExtractionSchema {
    /// Whether the post offers a business, product or project for sale.
    is_sale: bool,
    /// Whether the post is too vague or too low-effort to be a real listing.
    low_quality: bool,
    /// Two to four neutral sentences describing what is being sold.
    professional_summary: String,
    monthly_revenue: Option<String>,
    asking_price: Option<String>,
    user_count: Option<String>,
    /// Relevant links mentioned in the post.
    link: Vec<String>,
    /// Anything else a buyer should know: stack, churn, reason for selling.
    other_important_stuff: String,
}

/// Generates the provider-compatible schema for [`DealExtractionSchema`].
///
/// Strict mode requires `additionalProperties: false` on every object and
/// every property listed in `required`, nullable ones included.
#[must_use]
pub fn response_schema() -> Value {
    let schema = schema_for!(DealExtractionSchema);
    let mut value = serde_json::to_value(schema).unwrap_or_default();
    close_objects(&mut value);

    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("definitions");
    }
    value
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys: Vec<Value> = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
            for nested in map.values_mut() {
                close_objects(nested);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: [&str; 8] = [
        "isSale",
        "lowQuality",
        "professionalSummary",
        "monthlyRevenue",
        "askingPrice",
        "userCount",
        "link",
        "otherImportantStuff",
    ];

    #[test]
    fn schema_lists_every_field_as_required() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .expect("required array")
            .iter()
            .filter_map(Value::as_str)
            .collect();

        for field in FIELDS {
            assert!(required.contains(&field), "{field} should be required");
            assert!(
                schema["properties"].get(field).is_some(),
                "{field} should be a property"
            );
        }
        assert_eq!(required.len(), FIELDS.len());
    }

    #[test]
    fn schema_forbids_additional_properties() {
        let schema = response_schema();
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn optional_figures_are_nullable() {
        let schema = response_schema();
        let ty = &schema["properties"]["monthlyRevenue"]["type"];
        let types: Vec<&str> = ty
            .as_array()
            .expect("nullable type array")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(types.contains(&"null"));
        assert!(types.contains(&"string"));
    }
}
