use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::info;

use crate::data::types::{Question, TimeSeriesEntry};
use crate::error::PipelineError;
use crate::export::provenance::run_metadata;
use crate::processing::metadata::extract_question_metadata;

/// Write the aligned series to one JSON document:
/// `{"metadata": <provenance>, "questions": {id: {"metadata": .., "series": [..]}}}`.
///
/// The whole document is built in memory and written in a single call, so a
/// failed run never leaves a partial export behind. Every id in
/// `series_by_qid` appears exactly once under `questions`; a question record
/// missing from `questions` still gets a metadata block (all null fields).
pub fn export_time_series_with_comments(
    series_by_qid: &BTreeMap<String, Vec<TimeSeriesEntry>>,
    dest: impl AsRef<Path>,
    script: &str,
    params: &Value,
    questions: &[Question],
) -> Result<(), PipelineError> {
    let dest = dest.as_ref();
    let record_count: usize = series_by_qid.values().map(Vec::len).sum();
    let meta = run_metadata(script, params, record_count);

    let by_id: HashMap<String, &Question> = questions
        .iter()
        .filter_map(|q| q.id().map(|id| (id, q)))
        .collect();

    let placeholder = Question::new(json!({}));
    let mut questions_block = Map::new();
    for (qid, series) in series_by_qid {
        let question = by_id.get(qid).copied().unwrap_or(&placeholder);
        questions_block.insert(
            qid.clone(),
            json!({
                "metadata": extract_question_metadata(question),
                "series": series,
            }),
        );
    }

    let document = json!({"metadata": meta, "questions": questions_block});
    let text = serde_json::to_string_pretty(&document)
        .map_err(|e| PipelineError::parse("serializing export", e))?;
    fs::write(dest, text).map_err(|e| PipelineError::io(dest, e))?;

    info!(
        "Exported {} series entries for {} questions to {}",
        record_count,
        series_by_qid.len(),
        dest.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: i64) -> TimeSeriesEntry {
        TimeSeriesEntry {
            timestamp: json!(ts),
            forecast: json!({"end_time": ts}),
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_export_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.json");

        let mut series = BTreeMap::new();
        series.insert("1".to_string(), vec![entry(100), entry(200)]);
        series.insert("2".to_string(), vec![entry(300)]);

        let questions = vec![
            Question::new(json!({"id": 1, "title": "First"})),
            Question::new(json!({"id": 2, "title": "Second"})),
        ];
        let params = json!({"status": "open"});

        export_time_series_with_comments(&series, &dest, "test_export", &params, &questions)
            .unwrap();

        let doc: Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(doc["metadata"]["script"], json!("test_export"));
        assert_eq!(doc["metadata"]["params"], params);
        assert_eq!(doc["metadata"]["record_count"], json!(3));

        // Every series id appears exactly once as a key.
        let block = doc["questions"].as_object().unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block["1"]["metadata"]["title"], json!("First"));
        assert_eq!(block["1"]["series"].as_array().unwrap().len(), 2);
        assert_eq!(block["2"]["series"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_export_unknown_question_gets_null_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.json");

        let mut series = BTreeMap::new();
        series.insert("404".to_string(), vec![entry(100)]);

        export_time_series_with_comments(&series, &dest, "test_export", &json!({}), &[]).unwrap();

        let doc: Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(doc["questions"]["404"]["metadata"]["title"], Value::Null);
    }

    #[test]
    fn test_export_unwritable_destination_fails() {
        let series = BTreeMap::new();
        let err = export_time_series_with_comments(
            &series,
            "/no/such/dir/out.json",
            "test_export",
            &json!({}),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
