// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! List-query filter: all predicates are ANDed, an empty filter matches
//! every job.

use crate::error::JobError;
use crate::job::{Job, JobStatus, JobType};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Filter for `list` queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    /// Match any of these statuses (empty = all).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<JobStatus>,
    /// Match any of these types (empty = all).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<JobType>,
    /// Match jobs sharing at least one of these tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Regex applied to the job name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        self == &JobFilter::default()
    }

    /// Compile the name pattern once for use across a whole listing.
    pub fn compile(&self) -> Result<CompiledFilter<'_>, JobError> {
        let name_regex = match &self.name_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                JobError::InvalidSpec(format!("bad name pattern `{pattern}`: {e}"))
            })?),
            None => None,
        };
        Ok(CompiledFilter { filter: self, name_regex })
    }
}

/// A [`JobFilter`] with its regex compiled.
pub struct CompiledFilter<'a> {
    filter: &'a JobFilter,
    name_regex: Option<Regex>,
}

impl CompiledFilter<'_> {
    pub fn matches(&self, job: &Job) -> bool {
        let f = self.filter;
        if !f.statuses.is_empty() && !f.statuses.contains(&job.status) {
            return false;
        }
        if !f.kinds.is_empty() && !f.kinds.contains(&job.kind) {
            return false;
        }
        if !f.tags.is_empty() && !f.tags.iter().any(|t| job.tags.contains(t.as_str())) {
            return false;
        }
        if let Some(user) = &f.user {
            if &job.user != user {
                return false;
            }
        }
        if let Some(re) = &self.name_regex {
            if !re.is_match(&job.name) {
                return false;
            }
        }
        if let Some(after) = f.created_after {
            if job.created_at <= after {
                return false;
            }
        }
        if let Some(before) = f.created_before {
            if job.created_at >= before {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
