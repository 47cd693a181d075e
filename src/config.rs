use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::data::types::parse_date_bound;
use crate::error::PipelineError;
use crate::processing::filter::QuestionFilter;

/// Filter settings, either parsed from a TOML file or assembled from CLI
/// flags. Dates stay as strings here (ISO instant or bare `YYYY-MM-DD`) and
/// are parsed when the settings are turned into a `QuestionFilter`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub min_forecasters: Option<i64>,
    #[serde(default)]
    pub created_after: Option<String>,
    #[serde(default)]
    pub created_before: Option<String>,
    #[serde(default)]
    pub has_resolution_criteria: Option<bool>,
    #[serde(default)]
    pub min_comments: Option<usize>,
}

impl FilterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter file: {}", path.display()))?;

        let config: FilterConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse filter file: {}", path.display()))?;

        Ok(config)
    }

    /// Overlay `self` on top of `base`: any field set here wins, unset
    /// fields fall back to the base. Used to merge CLI flags over a filter
    /// file.
    pub fn overlaid_on(self, base: FilterConfig) -> FilterConfig {
        FilterConfig {
            status: self.status.or(base.status),
            tag: self.tag.or(base.tag),
            min_forecasters: self.min_forecasters.or(base.min_forecasters),
            created_after: self.created_after.or(base.created_after),
            created_before: self.created_before.or(base.created_before),
            has_resolution_criteria: self
                .has_resolution_criteria
                .or(base.has_resolution_criteria),
            min_comments: self.min_comments.or(base.min_comments),
        }
    }

    pub fn to_filter(&self) -> Result<QuestionFilter, PipelineError> {
        Ok(QuestionFilter {
            status: self.status.clone(),
            tag: self.tag.clone(),
            min_forecasters: self.min_forecasters,
            created_after: self
                .created_after
                .as_deref()
                .map(parse_date_bound)
                .transpose()?,
            created_before: self
                .created_before
                .as_deref()
                .map(parse_date_bound)
                .transpose()?,
            has_resolution_criteria: self.has_resolution_criteria,
            min_comments: self.min_comments,
            custom_predicate: None,
        })
    }
}
