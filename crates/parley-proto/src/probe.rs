//! Field-probing helpers shared by the normalization modules.
//!
//! `null` counts as absent: probing continues past an explicit null to the
//! next candidate name.

use serde_json::Value;

/// First non-null value among the named fields.
pub(crate) fn probe<'v>(value: &'v Value, names: &[&str]) -> Option<&'v Value> {
    names.iter().filter_map(|name| value.get(name)).find(|candidate| !candidate.is_null())
}

/// First non-null string among the named fields, owned.
pub(crate) fn probe_str(value: &Value, names: &[&str]) -> Option<String> {
    probe(value, names).and_then(Value::as_str).map(str::to_string)
}

/// Id from a JSON number or numeric string.
pub(crate) fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Identifier text from a JSON string or number.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn probe_skips_null_fields() {
        let value = json!({ "first": null, "second": "hit" });
        assert_eq!(probe(&value, &["first", "second"]).and_then(Value::as_str), Some("hit"));
    }

    #[test]
    fn as_id_accepts_number_and_string() {
        assert_eq!(as_id(&json!(7)), Some(7));
        assert_eq!(as_id(&json!("7")), Some(7));
        assert_eq!(as_id(&json!(" 7 ")), Some(7));
        assert_eq!(as_id(&json!("seven")), None);
        assert_eq!(as_id(&json!(-7)), None);
        assert_eq!(as_id(&json!(true)), None);
    }
}
