use serde_json::{Map, Value};

use crate::data::types::{first_of, Question};

/// Descriptive fields copied verbatim into the export, besides the
/// special-cased `id` and `created_at`.
const METADATA_FIELDS: &[&str] = &[
    "title",
    "description",
    "open_time",
    "cp_reveal_time",
    "scheduled_resolve_time",
    "actual_resolve_time",
    "scheduled_close_time",
    "actual_close_time",
    "type",
    "status",
    "tags",
    "url",
    "resolution_criteria",
    "fine_print",
    "unit",
    "possibilities",
    "options",
    "group_variable",
    "include_bots_in_aggregates",
    "question_weight",
    "default_project",
];

/// Pull the fixed descriptive field set out of a question record. Reads the
/// nested `question` object when the record uses the real API shape, the
/// record itself otherwise. Absent fields come back as JSON null so every
/// export row has the same keys.
pub fn extract_question_metadata(q: &Question) -> Map<String, Value> {
    let raw = q.raw();
    let qdata = match raw.get("question") {
        Some(nested) if nested.is_object() => nested,
        _ => raw,
    };

    let mut meta = Map::new();
    meta.insert("id".to_string(), pick(qdata, "id"));
    meta.insert(
        "created_at".to_string(),
        first_of(qdata, &[&["created_at"], &["created_time"]])
            .cloned()
            .unwrap_or(Value::Null),
    );
    for field in METADATA_FIELDS {
        meta.insert(field.to_string(), pick(qdata, field));
    }
    meta
}

fn pick(qdata: &Value, field: &str) -> Value {
    qdata.get(field).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_schema() {
        let q = Question::new(json!({
            "id": 1,
            "title": "Will it rain?",
            "status": "open",
            "tags": ["weather"],
            "created_at": "2024-01-01T00:00:00Z"
        }));
        let meta = extract_question_metadata(&q);

        assert_eq!(meta["id"], json!(1));
        assert_eq!(meta["title"], json!("Will it rain?"));
        assert_eq!(meta["tags"], json!(["weather"]));
        assert_eq!(meta["created_at"], json!("2024-01-01T00:00:00Z"));
        // Absent fields are present as null, not missing.
        assert_eq!(meta["fine_print"], Value::Null);
        assert_eq!(meta["unit"], Value::Null);
    }

    #[test]
    fn test_nested_schema_wins() {
        let q = Question::new(json!({
            "id": 99,
            "question": {"id": 1, "title": "Nested title", "created_time": 1700000000}
        }));
        let meta = extract_question_metadata(&q);

        assert_eq!(meta["id"], json!(1));
        assert_eq!(meta["title"], json!("Nested title"));
        // created_time fills in when created_at is absent.
        assert_eq!(meta["created_at"], json!(1700000000));
    }

    #[test]
    fn test_every_row_has_the_full_key_set() {
        let empty = extract_question_metadata(&Question::new(json!({})));
        let full = extract_question_metadata(&Question::new(json!({"id": 1, "title": "t"})));

        assert_eq!(empty.len(), METADATA_FIELDS.len() + 2);
        assert_eq!(empty.len(), full.len());
        assert!(empty.values().all(|v| v.is_null()));
    }
}
