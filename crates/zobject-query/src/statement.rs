//! Query statement text.
//!
//! Statements use the platform's restricted select syntax:
//! `select F1, F2 from Source [where ...]`. There are no joins, no `or`
//! across different sources and no bind parameters.
//!
//! Criteria values are substituted literally without escaping. Do not pass
//! untrusted input as a criteria value or raw clause.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use zobject_core::Value;

/// Remote field holding each record's last modification time.
pub const UPDATED_DATE_FIELD: &str = "UpdatedDate";

/// Optional modification-time bounds for incremental sync.
///
/// The lower bound is inclusive and the upper bound exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatedWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl UpdatedWindow {
    /// No bounds: a full scan.
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Records modified in `[start, end)`.
    pub fn between<Tz: TimeZone>(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            start: Some(start.with_timezone(&Utc)),
            end: Some(end.with_timezone(&Utc)),
        }
    }

    /// Records modified at or after `start`.
    pub fn since<Tz: TimeZone>(start: DateTime<Tz>) -> Self {
        Self {
            start: Some(start.with_timezone(&Utc)),
            end: None,
        }
    }

    /// Records modified before `end`.
    pub fn until<Tz: TimeZone>(end: DateTime<Tz>) -> Self {
        Self {
            start: None,
            end: Some(end.with_timezone(&Utc)),
        }
    }

    /// Check if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Render the filter clause, if any bound is set.
    pub fn filter_clause(&self) -> Option<String> {
        let mut clauses = Vec::with_capacity(2);
        if let Some(start) = self.start {
            clauses.push(format!(
                "{} >= '{}'",
                UPDATED_DATE_FIELD,
                format_instant(start)
            ));
        }
        if let Some(end) = self.end {
            clauses.push(format!("{} < '{}'", UPDATED_DATE_FIELD, format_instant(end)));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" and "))
        }
    }
}

/// Render an instant at offset zero, e.g. `2013-04-02T13:05:09+00:00`.
fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn select_list<F: AsRef<str>>(fields: &[F]) -> String {
    fields
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build a select over `source`, optionally bounded by modification time.
pub fn select_statement<F: AsRef<str>>(
    fields: &[F],
    source: &str,
    window: &UpdatedWindow,
) -> String {
    let mut sql = format!("select {} from {}", select_list(fields), source);
    if let Some(filter) = window.filter_clause() {
        sql.push_str(" where ");
        sql.push_str(&filter);
    }
    sql
}

/// Build a select over `source` with a caller-supplied where clause.
pub fn where_statement<F: AsRef<str>>(fields: &[F], source: &str, clause: &str) -> String {
    format!(
        "select {} from {} where {}",
        select_list(fields),
        source,
        clause
    )
}

/// Render equality criteria as `Field = 'value'` clauses joined with `and`.
///
/// Clauses are sorted by their rendered text so the statement does not
/// depend on the order the criteria were given in.
pub fn criteria_clause(criteria: &[(&str, Value)]) -> String {
    let mut clauses: Vec<String> = criteria
        .iter()
        .map(|(field, value)| format!("{} = '{}'", field, value.to_literal()))
        .collect();
    clauses.sort();
    clauses.join(" and ")
}
