use chrono::{DateTime, Utc};

use crate::data::types::Question;

/// Conjunction of optional metadata predicates over questions.
/// Unset fields impose no constraint; a question is retained only if every
/// set predicate passes.
#[derive(Default)]
pub struct QuestionFilter {
    pub status: Option<String>,
    pub tag: Option<String>,
    pub min_forecasters: Option<i64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub has_resolution_criteria: Option<bool>,
    pub min_comments: Option<usize>,
    pub custom_predicate: Option<Box<dyn Fn(&Question) -> bool>>,
}

impl QuestionFilter {
    pub fn matches(&self, q: &Question) -> bool {
        if let Some(status) = &self.status {
            if q.status() != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !q.has_tag(tag) {
                return false;
            }
        }
        if let Some(min) = self.min_forecasters {
            match q.num_forecasters() {
                Some(n) if n >= min => {}
                _ => return false,
            }
        }
        // A missing creation time excludes the question whenever either
        // date bound is set; both bounds are inclusive.
        if self.created_after.is_some() || self.created_before.is_some() {
            let created = match q.created_at() {
                Some(created) => created,
                None => return false,
            };
            if let Some(after) = self.created_after {
                if created < after {
                    return false;
                }
            }
            if let Some(before) = self.created_before {
                if created > before {
                    return false;
                }
            }
        }
        if let Some(want) = self.has_resolution_criteria {
            if q.has_resolution_criteria() != want {
                return false;
            }
        }
        if let Some(min) = self.min_comments {
            if q.comments.len() < min {
                return false;
            }
        }
        if let Some(predicate) = &self.custom_predicate {
            if !predicate(q) {
                return false;
            }
        }
        true
    }
}

/// Apply the filter, preserving input order. Pure: no question is mutated.
pub fn filter_questions(questions: Vec<Question>, filter: &QuestionFilter) -> Vec<Question> {
    questions
        .into_iter()
        .filter(|q| filter.matches(q))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(raw: serde_json::Value) -> Question {
        Question::new(raw)
    }

    fn sample_questions() -> Vec<Question> {
        vec![
            question(json!({
                "id": 1, "status": "open", "tags": ["ai"],
                "created_at": "2024-01-15T00:00:00Z",
                "community_prediction": {"num_forecasters": 50},
                "resolution_criteria": "Resolves YES if..."
            })),
            question(json!({
                "id": 2, "status": "resolved", "tags": ["ai", "economics"],
                "created_at": "2023-06-01T00:00:00Z",
                "community_prediction": {"num_forecasters": 10},
                "resolution_criteria": ""
            })),
            question(json!({
                "id": 3, "status": "open",
                "created_at": "2024-05-01T00:00:00Z",
                "community_prediction": {"num_forecasters": 200}
            })),
        ]
    }

    #[test]
    fn test_no_constraints_keeps_everything_in_order() {
        let filtered = filter_questions(sample_questions(), &QuestionFilter::default());
        let ids: Vec<_> = filtered.iter().filter_map(|q| q.id()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn test_status_and_tag() {
        let filter = QuestionFilter {
            status: Some("open".to_string()),
            tag: Some("ai".to_string()),
            ..Default::default()
        };
        let filtered = filter_questions(sample_questions(), &filter);
        // Question 3 is open but has no tag list at all.
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id().as_deref(), Some("1"));
    }

    #[test]
    fn test_min_comments_excludes_open_question_with_too_few() {
        let mut questions = sample_questions();
        questions[0].comments = vec![json!({}), json!({}), json!({})];

        let filter = QuestionFilter {
            status: Some("open".to_string()),
            min_comments: Some(5),
            ..Default::default()
        };
        assert!(filter_questions(questions, &filter).is_empty());
    }

    #[test]
    fn test_min_comments_passes_after_attaching_loaded_comments() {
        use crate::data::types::attach_comments;
        use std::collections::HashMap;

        // Same wiring as the binary: attach the loaded comment buckets
        // before filtering, so min_comments sees the real counts.
        let mut questions = sample_questions();
        let mut comments_by_qid = HashMap::new();
        comments_by_qid.insert(
            "1".to_string(),
            vec![json!({"text": "a"}), json!({"text": "b"}), json!({"text": "c"})],
        );
        attach_comments(&mut questions, &comments_by_qid);

        let filter = QuestionFilter {
            min_comments: Some(1),
            ..Default::default()
        };
        let filtered = filter_questions(questions, &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id().as_deref(), Some("1"));
        assert_eq!(filtered[0].comments.len(), 3);
    }

    #[test]
    fn test_empty_resolution_criteria_is_falsy() {
        let filter = QuestionFilter {
            has_resolution_criteria: Some(true),
            ..Default::default()
        };
        let filtered = filter_questions(sample_questions(), &filter);
        // Question 2 has criteria = "" and question 3 has none.
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id().as_deref(), Some("1"));
    }

    #[test]
    fn test_date_bounds_inclusive_and_missing_created_excluded() {
        let mut questions = sample_questions();
        questions.push(question(json!({"id": 4, "status": "open"})));

        let filter = QuestionFilter {
            created_after: Some("2024-01-15T00:00:00Z".parse().unwrap()),
            ..Default::default()
        };
        let filtered = filter_questions(questions, &filter);
        let ids: Vec<_> = filtered.iter().filter_map(|q| q.id()).collect();
        // Question 1 sits exactly on the bound (inclusive); 4 has no
        // creation time and is excluded.
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn test_custom_predicate() {
        let filter = QuestionFilter {
            custom_predicate: Some(Box::new(|q: &Question| {
                q.num_forecasters().unwrap_or(0) > 100
            })),
            ..Default::default()
        };
        let filtered = filter_questions(sample_questions(), &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id().as_deref(), Some("3"));
    }

    #[test]
    fn test_combined_filter_equals_sequential_intersection() {
        let combined = QuestionFilter {
            status: Some("open".to_string()),
            min_forecasters: Some(30),
            ..Default::default()
        };
        let both = filter_questions(sample_questions(), &combined);

        let status_only = QuestionFilter {
            status: Some("open".to_string()),
            ..Default::default()
        };
        let forecasters_only = QuestionFilter {
            min_forecasters: Some(30),
            ..Default::default()
        };
        let sequential = filter_questions(
            filter_questions(sample_questions(), &status_only),
            &forecasters_only,
        );

        let ids = |qs: &[Question]| qs.iter().filter_map(|q| q.id()).collect::<Vec<_>>();
        assert_eq!(ids(&both), ids(&sequential));
        assert_eq!(ids(&both), ["1", "3"]);
    }
}
