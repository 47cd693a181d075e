use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::{debug, warn};

use crate::data::types::{parse_epoch, Question, TimeSeriesEntry};

/// Result of one alignment pass. Per-item failures never abort the run;
/// they are counted here so callers (and tests) can observe them.
#[derive(Debug, Default)]
pub struct AlignmentResult {
    pub series: BTreeMap<String, Vec<TimeSeriesEntry>>,
    /// Comments skipped because their `created_at` was missing or unparseable.
    pub skipped_comments: usize,
    /// Snapshots dropped because `end_time` was present but unparseable.
    /// (Missing/null `end_time` is an expected upstream gap, not counted.)
    pub dropped_snapshots: usize,
}

/// Attach each comment to the latest forecast snapshot whose timestamp does
/// not exceed the comment's creation time.
///
/// Per question: the forecast history is resolved through the schema fallback
/// chain, reduced to snapshots with a usable `end_time`, and stably sorted
/// ascending by parsed timestamp (upstream ordering is not contractually
/// guaranteed; already-ascending input passes through unchanged). Each
/// comment's timestamp is then located by binary search, rightmost-≤: ties go
/// to the snapshot with the matching timestamp, and a comment that predates
/// every snapshot is dropped without error. Comments accumulate on an entry
/// in their original per-question order.
pub fn link_comments_to_forecasts(
    questions: &[Question],
    comments_by_qid: &HashMap<String, Vec<Value>>,
) -> AlignmentResult {
    let mut result = AlignmentResult::default();

    for q in questions {
        let qid = match q.id() {
            Some(qid) => qid,
            None => {
                warn!("Question without an id, skipping");
                continue;
            }
        };

        let (times, mut entries) = build_series(q, &mut result.dropped_snapshots);

        for comment in comments_by_qid.get(&qid).map(Vec::as_slice).unwrap_or(&[]) {
            let created = match comment.get("created_at").filter(|v| !v.is_null()) {
                Some(created) => created,
                None => {
                    warn!("Comment on question {} without created_at, skipping", qid);
                    result.skipped_comments += 1;
                    continue;
                }
            };
            let ctime = match parse_epoch(created) {
                Ok(ctime) => ctime,
                Err(e) => {
                    warn!("Comment on question {}: {}, skipping", qid, e);
                    result.skipped_comments += 1;
                    continue;
                }
            };
            // Rightmost snapshot with timestamp <= ctime. A comment older
            // than the whole series attaches to nothing.
            let idx = times.partition_point(|&t| t <= ctime);
            if idx > 0 {
                entries[idx - 1].comments.push(comment.clone());
            } else {
                debug!(
                    "Comment on question {} predates all {} snapshots, dropped",
                    qid,
                    times.len()
                );
            }
        }

        result.series.insert(qid, entries);
    }

    result
}

/// Build the ascending snapshot series for one question, returning the
/// parsed timestamps alongside the entries (same length, same order).
fn build_series(q: &Question, dropped: &mut usize) -> (Vec<f64>, Vec<TimeSeriesEntry>) {
    let mut timed: Vec<(f64, &Value, &Value)> = Vec::new();
    for snapshot in q.history() {
        let end_time = match snapshot.get("end_time").filter(|v| !v.is_null()) {
            Some(end_time) => end_time,
            None => continue,
        };
        match parse_epoch(end_time) {
            Ok(t) => timed.push((t, end_time, snapshot)),
            Err(e) => {
                warn!("Snapshot with bad end_time dropped: {}", e);
                *dropped += 1;
            }
        }
    }
    // Stable, so snapshots with equal end_time keep their source order.
    timed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let times = timed.iter().map(|(t, _, _)| *t).collect();
    let entries = timed
        .into_iter()
        .map(|(_, end_time, snapshot)| TimeSeriesEntry {
            timestamp: end_time.clone(),
            forecast: snapshot.clone(),
            comments: Vec::new(),
        })
        .collect();
    (times, entries)
}
