//! Queue records derived from the flat capacity-scheduler property mapping.
//!
//! The hierarchy lives entirely in `yarn.scheduler.capacity.<path>.queues`
//! (a comma separated child list); `root` is implicit.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::ValidationError;

pub type Properties = BTreeMap<String, String>;

pub const PREFIX: &str = "yarn.scheduler.capacity";
pub const ROOT: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueRecord {
    /// Lower-cased full path; this is what lookups match on.
    pub id: String,
    pub name: String,
    pub path: String,
    pub parent_path: Option<String>,
}

impl QueueRecord {
    fn root() -> Self {
        Self {
            id: ROOT.to_string(),
            name: ROOT.to_string(),
            path: ROOT.to_string(),
            parent_path: None,
        }
    }

    fn child(parent: &str, name: &str) -> Self {
        let path = format!("{parent}.{name}");
        Self {
            id: path.to_lowercase(),
            name: name.to_string(),
            path,
            parent_path: Some(parent.to_string()),
        }
    }
}

pub fn queues_key(path: &str) -> String {
    format!("{PREFIX}.{path}.queues")
}

/// Splits a child list the way YARN reads it: entries are trimmed and trailing empty
/// entries dropped, so `a,b,` names two queues while `a,,b` carries an empty name.
fn child_names<'a>(properties: &'a Properties, path: &str) -> Vec<&'a str> {
    let Some(list) = properties.get(&queues_key(path)) else {
        return Vec::new();
    };
    let mut names: Vec<&str> = list.split(',').map(str::trim).collect();
    while names.last().is_some_and(|n| n.is_empty()) {
        names.pop();
    }
    names
}

/// Walks the hierarchy from `root`. Empty names are left to [`validate`] and not listed.
pub fn queues(properties: &Properties) -> Vec<QueueRecord> {
    let mut out = vec![QueueRecord::root()];
    let mut i = 0;
    while i < out.len() {
        let parent = out[i].path.clone();
        for name in child_names(properties, &parent) {
            if !name.is_empty() {
                out.push(QueueRecord::child(&parent, name));
            }
        }
        i += 1;
    }
    out
}

/// Checks a whole mapping before it is submitted.
pub fn validate(properties: &Properties) -> Result<(), ValidationError> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut pending = vec![ROOT.to_string()];
    while let Some(parent) = pending.pop() {
        for name in child_names(properties, &parent) {
            if name.is_empty() {
                return Err(ValidationError::EmptyName);
            }
            let record = QueueRecord::child(&parent, name);
            let count = seen.entry(record.id.clone()).or_default();
            *count += 1;
            if *count > 1 {
                return Err(ValidationError::DuplicateQueue { id: record.id });
            }
            pending.push(record.path);
        }
    }
    Ok(())
}

pub fn find_queue(properties: &Properties, id: &str) -> Option<QueueRecord> {
    let id = id.to_lowercase();
    queues(properties).into_iter().find(|q| q.id == id)
}

/// Returns a copy of `properties` with `name` appended under `parent_path`.
///
/// The input must already pass [`validate`]; the rewritten child list drops trailing
/// separators.
pub fn create_queue(
    properties: &Properties,
    parent_path: &str,
    name: &str,
) -> Result<Properties, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.contains(['.', ',']) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
        });
    }
    validate(properties)?;
    let parent = find_queue(properties, parent_path).ok_or_else(|| ValidationError::UnknownQueue {
        path: parent_path.to_string(),
    })?;
    let record = QueueRecord::child(&parent.path, name);
    if find_queue(properties, &record.id).is_some() {
        return Err(ValidationError::DuplicateQueue { id: record.id });
    }

    let mut names = child_names(properties, &parent.path);
    names.push(name);
    let list = names.join(",");
    let mut out = properties.clone();
    out.insert(queues_key(&parent.path), list);
    Ok(out)
}

/// Returns a copy of `properties` without the queue at `path` and its subtree.
pub fn delete_queue(properties: &Properties, path: &str) -> Result<Properties, ValidationError> {
    validate(properties)?;
    let record = find_queue(properties, path).ok_or_else(|| ValidationError::UnknownQueue {
        path: path.to_string(),
    })?;
    let Some(parent) = record.parent_path.as_deref() else {
        return Err(ValidationError::RootQueue);
    };

    let remaining: Vec<&str> = child_names(properties, parent)
        .into_iter()
        .filter(|n| *n != record.name)
        .collect();
    let subtree = format!("{PREFIX}.{}.", record.path);
    let mut out: Properties = properties
        .iter()
        .filter(|(k, _)| !k.starts_with(&subtree))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    out.insert(queues_key(parent), remaining.join(","));
    Ok(out)
}
