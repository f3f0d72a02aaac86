use std::collections::BTreeMap;

use serde_json::Value;

use super::patterns::PatternCatalog;

/// Marker substituted for the whole value of a field whose name is on the
/// field-name deny-list, regardless of that value's shape.
pub const FIELD_DENYLIST_MARKER: &str = "SANITIZED_FIELD";

/// Walk a parsed JSON body as a tagged-variant tree (`serde_json::Value` already is
/// one: Object/Array/String/Number/Bool/Null), replacing denied field values
/// wholesale and running pattern matching over every remaining string leaf.
pub fn sanitize_json(
    value: &Value,
    catalog: &PatternCatalog,
    field_denylist: &[String],
    report: &mut BTreeMap<String, u32>,
) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                if field_denylist.iter().any(|denied| denied.eq_ignore_ascii_case(key)) {
                    report.entry("field_name_denylist".to_string()).and_modify(|c| *c += 1).or_insert(1);
                    out.insert(key.clone(), Value::String(FIELD_DENYLIST_MARKER.to_string()));
                } else {
                    out.insert(key.clone(), sanitize_json(val, catalog, field_denylist, report));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items.iter().map(|item| sanitize_json(item, catalog, field_denylist, report)).collect(),
        ),
        Value::String(s) => Value::String(catalog.apply(s, report)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_field_is_replaced_wholesale_even_when_nested() {
        let catalog = PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap();
        let denylist = PatternCatalog::default_field_name_denylist();
        let mut report = BTreeMap::new();

        let input = serde_json::json!({"user": {"password": {"nested": "shape"}}});
        let out = sanitize_json(&input, &catalog, &denylist, &mut report);

        assert_eq!(out["user"]["password"], serde_json::json!(FIELD_DENYLIST_MARKER));
    }

    #[test]
    fn non_denied_string_leaves_go_through_pattern_matching() {
        let catalog = PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap();
        let denylist = PatternCatalog::default_field_name_denylist();
        let mut report = BTreeMap::new();

        let input = serde_json::json!({"card": "4111111111111111", "amount": 10});
        let out = sanitize_json(&input, &catalog, &denylist, &mut report);

        assert_eq!(out["card"], serde_json::json!("SANITIZED_CREDIT_CARD"));
        assert_eq!(out["amount"], serde_json::json!(10));
    }
}
