use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::data::types::{coerce_id, first_of, Question};
use crate::error::PipelineError;

/// Load a question export: a single JSON file holding either a bare array
/// of question records or an object with the array under `data`.
pub fn load_questions(path: impl AsRef<Path>) -> Result<Vec<Question>, PipelineError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PipelineError::NotFound(path.to_path_buf()));
    }
    let root = read_json(path)?;
    let records = match root {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(PipelineError::Validation(format!(
                    "{}: `data` must be an array, got {}",
                    path.display(),
                    type_name(&other)
                )))
            }
            None => {
                return Err(PipelineError::Validation(format!(
                    "{}: expected an array or an object with a `data` key",
                    path.display()
                )))
            }
        },
        other => {
            return Err(PipelineError::Validation(format!(
                "{}: expected an array or an object, got {}",
                path.display(),
                type_name(&other)
            )))
        }
    };
    Ok(records.into_iter().map(Question::new).collect())
}

/// Load a comment export into a question-id → comment-list map.
///
/// Accepts a single file or a directory of `*.json` files; directory entries
/// are read in filename order so merged per-question lists are deterministic.
/// Each file may use any of the shapes produced by the fetch tooling:
///   (a) `{"comments_by_question": {id: [..]}}`
///   (b) `{"metadata": {"qid": ..}, "data": [..]}` (per-question export)
///   (c) `{"data": [comment, ..]}` with per-comment question-id fields
///   (d) a bare object whose values are comment lists
/// plus the all-in-one export variant with an id→list map under `data`.
pub fn load_comments(path: impl AsRef<Path>) -> Result<HashMap<String, Vec<Value>>, PipelineError> {
    let path = path.as_ref();
    let mut comments_by_qid = HashMap::new();
    if path.is_file() {
        merge_comment_file(path, &mut comments_by_qid)?;
    } else if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|e| PipelineError::io(path, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        files.sort();
        for file in &files {
            merge_comment_file(file, &mut comments_by_qid)?;
        }
        debug!(
            "Merged {} comment files into {} question buckets",
            files.len(),
            comments_by_qid.len()
        );
    } else {
        return Err(PipelineError::NotFound(path.to_path_buf()));
    }
    Ok(comments_by_qid)
}

fn merge_comment_file(
    path: &Path,
    out: &mut HashMap<String, Vec<Value>>,
) -> Result<(), PipelineError> {
    let root = read_json(path)?;
    let map = match root {
        Value::Object(map) => map,
        other => {
            return Err(PipelineError::Validation(format!(
                "{}: comment export must be a JSON object, got {}",
                path.display(),
                type_name(&other)
            )))
        }
    };

    // Shape (a): already keyed by question id.
    if let Some(Value::Object(by_question)) = map.get("comments_by_question") {
        merge_id_map(by_question, out);
        return Ok(());
    }

    if let Some(data) = map.get("data") {
        match data {
            Value::Array(list) => {
                // Shape (b): one question's comments, id in the file metadata.
                let file_qid = map
                    .get("metadata")
                    .and_then(|m| first_of(m, &[&["qid"], &["params", "question_id"]]));
                if let Some(qid) = file_qid {
                    out.entry(coerce_id(qid)).or_default().extend(list.clone());
                } else {
                    // Shape (c): flat list, id on each comment.
                    merge_flat_list(path, list, out);
                }
            }
            // All-in-one export: id→list map under `data`.
            Value::Object(by_question) => merge_id_map(by_question, out),
            other => {
                return Err(PipelineError::Validation(format!(
                    "{}: `data` must be an array or object, got {}",
                    path.display(),
                    type_name(other)
                )))
            }
        }
        return Ok(());
    }

    // Shape (d): a bare id→list object.
    merge_id_map(&map, out);
    Ok(())
}

fn merge_id_map(by_question: &Map<String, Value>, out: &mut HashMap<String, Vec<Value>>) {
    for (qid, value) in by_question {
        if let Value::Array(list) = value {
            out.entry(qid.clone()).or_default().extend(list.clone());
        }
    }
}

fn merge_flat_list(path: &Path, list: &[Value], out: &mut HashMap<String, Vec<Value>>) {
    for comment in list {
        match first_of(comment, &[&["question_id"], &["questionId"], &["qid"]]) {
            Some(qid) => out.entry(coerce_id(qid)).or_default().push(comment.clone()),
            None => warn!(
                "Comment without a question id in {}, skipping",
                path.display()
            ),
        }
    }
}

fn read_json(path: &Path) -> Result<Value, PipelineError> {
    let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| PipelineError::parse(path.display().to_string(), e))
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
