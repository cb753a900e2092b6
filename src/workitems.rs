//! Work-item parameter source.
//!
//! A work item is the key-value payload handed to a single run by the
//! automation platform. The run only reads three variables from it:
//! `search_phrase`, `news_category` and `months`. When no work item can be
//! loaded the run proceeds with [`SearchParameters::default`].

use crate::models::SearchParameters;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const SEARCH_PHRASE_VAR: &str = "search_phrase";
pub const CATEGORY_VAR: &str = "news_category";
pub const MONTHS_VAR: &str = "months";

#[derive(Debug, Error)]
pub enum WorkItemError {
    #[error("no input work item configured")]
    NoInput,
    #[error("failed to read work item file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed work item JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("work item file contains no work items")]
    Empty,
    #[error("work item payload is not an object")]
    NotAnObject,
}

/// Payload of one work item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkItem {
    payload: Map<String, Value>,
}

impl WorkItem {
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Build a work item from any of the accepted JSON layouts: a list of
    /// work items, a single `{"payload": {...}}` item, or a bare payload.
    pub fn from_json(raw: &str) -> Result<Self, WorkItemError> {
        let value: Value = serde_json::from_str(raw)?;
        let item = match value {
            Value::Array(items) => items.into_iter().next().ok_or(WorkItemError::Empty)?,
            other => other,
        };
        let payload = match item {
            Value::Object(mut obj) => match obj.remove("payload") {
                Some(Value::Object(payload)) => payload,
                Some(Value::Null) => Map::new(),
                Some(_) => return Err(WorkItemError::NotAnObject),
                None => obj,
            },
            _ => return Err(WorkItemError::NotAnObject),
        };
        Ok(Self::new(payload))
    }
}

/// Anything that can hand the run its input work item.
pub trait WorkItemSource {
    fn input_work_item(&self) -> Result<WorkItem, WorkItemError>;
}

/// Reads the input work item from a JSON file on disk.
#[derive(Debug, Clone, Default)]
pub struct FileWorkItems {
    path: Option<PathBuf>,
}

impl FileWorkItems {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl WorkItemSource for FileWorkItems {
    fn input_work_item(&self) -> Result<WorkItem, WorkItemError> {
        let path = self.path.as_ref().ok_or(WorkItemError::NoInput)?;
        let raw = fs::read_to_string(path).map_err(|source| WorkItemError::Io {
            path: path.clone(),
            source,
        })?;
        WorkItem::from_json(&raw)
    }
}

/// Resolve the run parameters, defaulting anything missing or empty.
///
/// Never fails: an unavailable work item is logged and replaced by defaults.
#[instrument(level = "info", skip_all)]
pub fn resolve_parameters(source: &impl WorkItemSource) -> SearchParameters {
    let defaults = SearchParameters::default();
    let item = match source.input_work_item() {
        Ok(item) => item,
        Err(e) => {
            warn!(error = %e, "No active work item found; using default values");
            return defaults;
        }
    };

    let search_phrase = string_var(&item, SEARCH_PHRASE_VAR).unwrap_or(defaults.search_phrase);
    let category = string_var(&item, CATEGORY_VAR).unwrap_or(defaults.category);
    let months = months_var(&item).unwrap_or(defaults.months);

    let params = SearchParameters {
        search_phrase,
        category,
        months,
    };
    info!(
        search_phrase = %params.search_phrase,
        category = %params.category,
        months = params.months,
        "Resolved work item parameters"
    );
    params
}

fn string_var(item: &WorkItem, name: &str) -> Option<String> {
    match item.variable(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::String(_) | Value::Null => None,
        other => {
            debug!(name, value = %other, "Non-string work item variable; using its JSON text");
            Some(other.to_string())
        }
    }
}

fn months_var(item: &WorkItem) -> Option<i64> {
    match item.variable(MONTHS_VAR)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(value = %s, error = %e, "Unparseable months value; using default");
                None
            }
        },
        Value::Null => None,
        other => {
            warn!(value = %other, "Unexpected months value; using default");
            None
        }
    }
}
