//! Query planning, pagination and result merging for zobject.
//!
//! A lookup moves through four stages:
//!
//! 1. [`QueryPlan`] splits the requested fields into groups the platform
//!    accepts in one statement.
//! 2. [`select_statement`] / [`where_statement`] render one statement per group.
//! 3. [`query_all`] runs each statement and follows the query locator across
//!    pages.
//! 4. [`combine_results`] merges rows for the same id when the plan was split.
//!
//! [`Finder`] ties the stages together and materializes clean objects.

pub mod executor;
pub mod finder;
pub mod merge;
pub mod plan;
pub mod statement;

#[cfg(test)]
mod testing;

pub use executor::{DEFAULT_MAX_QUERY_PAGES, query_all};
pub use finder::{Finder, materialize};
pub use merge::combine_results;
pub use plan::QueryPlan;
pub use statement::{
    UPDATED_DATE_FIELD, UpdatedWindow, criteria_clause, select_statement, where_statement,
};
