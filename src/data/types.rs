use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;

/// One question record from a Metaculus export.
///
/// The raw payload is kept opaque; the pipeline only reads a handful of
/// fields, each of which may live at the top level (legacy export) or under
/// a nested `question` object (real API export). All access goes through
/// first-success-wins fallback chains so the two variants stay enumerable
/// in one place.
#[derive(Debug, Clone)]
pub struct Question {
    raw: Value,
    /// Comments attached to this question, if the caller has linked them.
    /// Defaults to empty; only the `min_comments` filter reads it.
    pub comments: Vec<Value>,
}

impl Question {
    pub fn new(raw: Value) -> Self {
        Self {
            raw,
            comments: Vec::new(),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Question id, coerced to a string. Ids arrive as ints or strings
    /// depending on the export; all lookups compare string-to-string.
    pub fn id(&self) -> Option<String> {
        first_of(&self.raw, &[&["id"], &["question", "id"]]).map(coerce_id)
    }

    pub fn status(&self) -> Option<&str> {
        first_of(&self.raw, &[&["status"], &["question", "status"]])?.as_str()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        first_of(&self.raw, &[&["tags"], &["question", "tags"]])
            .and_then(Value::as_array)
            .map(|tags| tags.iter().any(|t| t.as_str() == Some(tag)))
            .unwrap_or(false)
    }

    pub fn num_forecasters(&self) -> Option<i64> {
        first_of(
            &self.raw,
            &[
                &["community_prediction", "num_forecasters"],
                &["num_forecasters"],
            ],
        )?
        .as_i64()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let v = first_of(
            &self.raw,
            &[
                &["created_at"],
                &["created_time"],
                &["question", "created_at"],
                &["question", "created_time"],
            ],
        )?;
        let secs = parse_epoch(v).ok()?;
        epoch_to_datetime(secs)
    }

    /// Presence signal for resolution criteria: null, missing and the empty
    /// string all count as "no criteria".
    pub fn has_resolution_criteria(&self) -> bool {
        match first_of(
            &self.raw,
            &[&["resolution_criteria"], &["question", "resolution_criteria"]],
        ) {
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    /// Forecast history list. Probes the legacy `community_prediction.history`
    /// shape first, then the real API export under
    /// `question.aggregations.recency_weighted.history`. A non-list value is
    /// treated as an empty history.
    pub fn history(&self) -> &[Value] {
        first_of(
            &self.raw,
            &[
                &["community_prediction", "history"],
                &["question", "aggregations", "recency_weighted", "history"],
            ],
        )
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
    }
}

/// Attach loaded comments to their questions (string-coerced id lookup).
/// Questions with no comment bucket keep their empty default. Must run
/// before filtering if the `min_comments` predicate is in play.
pub fn attach_comments(questions: &mut [Question], comments_by_qid: &HashMap<String, Vec<Value>>) {
    for q in questions {
        if let Some(list) = q.id().and_then(|qid| comments_by_qid.get(&qid)) {
            q.comments = list.clone();
        }
    }
}

/// One output row: a forecast snapshot plus the comments aligned to it.
/// `timestamp` is the snapshot's raw `end_time` value, passed through
/// untouched so the export carries whatever the upstream emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesEntry {
    pub timestamp: Value,
    pub forecast: Value,
    pub comments: Vec<Value>,
}

fn lookup<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(v, |acc, key| acc.get(key))
}

/// Probe the given paths in order, returning the first non-null hit.
/// A field that is present but null falls through to the next variant,
/// matching how the exports use null for "not set".
pub(crate) fn first_of<'a>(v: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .find_map(|path| lookup(v, path).filter(|found| !found.is_null()))
}

/// String-coerce an id value. Strings pass through, numbers render bare.
pub fn coerce_id(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an epoch-or-ISO timestamp value into seconds since the Unix epoch.
/// Numeric values and numeric strings are taken as epoch seconds directly;
/// everything else must be an ISO-8601 instant (`Z` and `+00:00` offsets are
/// equivalent; a naive timestamp is read as UTC).
pub fn parse_epoch(v: &Value) -> Result<f64, PipelineError> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| PipelineError::timestamp(n)),
        Value::String(s) => parse_epoch_str(s),
        other => Err(PipelineError::timestamp(other)),
    }
}

pub fn parse_epoch_str(s: &str) -> Result<f64, PipelineError> {
    if let Ok(secs) = s.parse::<f64>() {
        return Ok(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_micros() as f64 / 1e6);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc().timestamp_micros() as f64 / 1e6);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp() as f64);
    }
    Err(PipelineError::timestamp(s))
}

/// Parse a filter date bound: a full ISO instant or a bare `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_date_bound(s: &str) -> Result<DateTime<Utc>, PipelineError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(PipelineError::timestamp(s))
}

fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros((secs * 1e6) as i64)
}
