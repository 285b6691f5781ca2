//! In-memory filtering of a fetched task list.
//!
//! All criteria are combined with AND, and an empty criterion matches every task. Filtering is a
//! pure, stable pass over the input: matching tasks come back in their original order.

use crate::domain::task::{Priority, Task};
use chrono::NaiveDate;
use std::str::FromStr;
use thiserror::Error;

/// Transient search/priority/date criteria typed into the task list screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub priority: String,
    pub date: String,
}

/// Names a single criterion so the screen can update one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaKey {
    Search,
    Priority,
    Date,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not a filter criterion")]
pub struct UnknownCriteriaKey(pub String);

impl FromStr for CriteriaKey {
    type Err = UnknownCriteriaKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "search" => Ok(Self::Search),
            "priority" => Ok(Self::Priority),
            "date" => Ok(Self::Date),
            _ => Err(UnknownCriteriaKey(raw.to_owned())),
        }
    }
}

impl FilterCriteria {
    /// Returns a copy of these criteria with one criterion replaced
    pub fn with(&self, key: CriteriaKey, value: impl Into<String>) -> FilterCriteria {
        let value = value.into();
        match key {
            CriteriaKey::Search => FilterCriteria {
                search: value,
                ..self.clone()
            },
            CriteriaKey::Priority => FilterCriteria {
                priority: value,
                ..self.clone()
            },
            CriteriaKey::Date => FilterCriteria {
                date: value,
                ..self.clone()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.priority.is_empty() && self.date.is_empty()
    }
}

/// Criteria parsed once per pass so each task is checked against plain values
enum Expected<T> {
    Anything,
    Exactly(T),
    Nothing,
}

impl<T: PartialEq> Expected<T> {
    fn parse<E>(raw: &str, parser: impl FnOnce(&str) -> Result<T, E>) -> Self {
        if raw.is_empty() {
            return Self::Anything;
        }

        match parser(raw) {
            Ok(value) => Self::Exactly(value),
            Err(_) => Self::Nothing,
        }
    }

    fn admits(&self, candidate: Option<&T>) -> bool {
        match self {
            Self::Anything => true,
            Self::Exactly(expected) => candidate == Some(expected),
            Self::Nothing => false,
        }
    }
}

/// Applies [criteria] to [tasks], keeping only the tasks every criterion admits.
///
/// An unrecognized priority or an unparseable date matches nothing rather than being ignored.
pub fn apply<'t>(tasks: &'t [Task], criteria: &FilterCriteria) -> Vec<&'t Task> {
    let needle = criteria.search.to_lowercase();
    let priority = Expected::parse(&criteria.priority, Priority::from_str);
    let date = Expected::parse(&criteria.date, |raw| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
    });

    tasks
        .iter()
        .filter(|task| {
            let matches_search = needle.is_empty()
                || task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle);
            let due_day = task.due_date.map(|due| due.date_naive());

            matches_search
                && priority.admits(task.priority.as_ref())
                && date.admits(due_day.as_ref())
        })
        .collect()
}
