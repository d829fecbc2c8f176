//! Object lookup: full scans, incremental sync and criteria queries.

use asupersync::{Cx, Outcome};
use zobject_core::{
    Connector, Error, ID_COLUMN, ID_FIELD, ObjectSchema, Row, Value, ZObject,
};

use crate::executor::{DEFAULT_MAX_QUERY_PAGES, query_all};
use crate::merge::combine_results;
use crate::plan::QueryPlan;
use crate::statement::{UpdatedWindow, criteria_clause, select_statement, where_statement};

/// Runs planned queries against a connector and materializes the results.
///
/// Every lookup splits its fields with a [`QueryPlan`], sends one statement
/// per field group, merges the rows when the plan was split, and turns each
/// row into a clean [`ZObject`].
#[derive(Debug)]
pub struct Finder<'c, C: Connector> {
    conn: &'c C,
    max_pages: Option<usize>,
}

impl<'c, C: Connector> Finder<'c, C> {
    /// Create a finder with the default page cap.
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            max_pages: Some(DEFAULT_MAX_QUERY_PAGES),
        }
    }

    /// Set the page cap for each statement (`None` for unbounded).
    pub fn max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Every record, with the default field set.
    pub async fn all<S: ObjectSchema>(&self, cx: &Cx) -> Outcome<Vec<ZObject<S>>, Error> {
        self.get_updated::<S, &str>(cx, &UpdatedWindow::unbounded(), None)
            .await
    }

    /// Every record, selecting the given remote fields.
    pub async fn all_with_fields<S: ObjectSchema, F: AsRef<str>>(
        &self,
        cx: &Cx,
        fields: &[F],
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        self.get_updated::<S, F>(cx, &UpdatedWindow::unbounded(), Some(fields))
            .await
    }

    /// Records whose modification time falls inside `window`.
    ///
    /// `fields` are remote field names; `None` selects the default field set.
    #[tracing::instrument(level = "debug", skip(self, cx, fields), fields(remote_name = S::REMOTE_NAME))]
    pub async fn get_updated<S: ObjectSchema, F: AsRef<str>>(
        &self,
        cx: &Cx,
        window: &UpdatedWindow,
        fields: Option<&[F]>,
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        let plan = plan_for::<S, F>(fields);
        let statements: Vec<String> = plan
            .groups()
            .iter()
            .map(|group| select_statement(group, S::REMOTE_NAME, window))
            .collect();
        self.run::<S>(cx, &plan, &statements).await
    }

    /// Records matching every `(local attribute, value)` equality criterion.
    ///
    /// `id` is accepted as a criterion for the identity. Values are
    /// substituted into the statement as-is.
    #[tracing::instrument(level = "debug", skip(self, cx, criteria), fields(remote_name = S::REMOTE_NAME))]
    pub async fn find_where<S: ObjectSchema>(
        &self,
        cx: &Cx,
        criteria: &[(&str, Value)],
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        let mut remote = Vec::with_capacity(criteria.len());
        for (name, value) in criteria {
            let field = if *name == ID_COLUMN {
                ID_FIELD
            } else {
                match S::attribute(name) {
                    Some(info) => info.remote_name,
                    None => return Outcome::Err(Error::unknown_attribute(S::REMOTE_NAME, name)),
                }
            };
            remote.push((field, value.clone()));
        }
        let clause = criteria_clause(&remote);
        self.find_where_raw::<S>(cx, &clause).await
    }

    /// Records matching a caller-built where clause.
    pub async fn find_where_raw<S: ObjectSchema>(
        &self,
        cx: &Cx,
        clause: &str,
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        let plan = plan_for::<S, &str>(None);
        let statements: Vec<String> = plan
            .groups()
            .iter()
            .map(|group| where_statement(group, S::REMOTE_NAME, clause))
            .collect();
        self.run::<S>(cx, &plan, &statements).await
    }

    /// The record with this id, if any.
    pub async fn find<S: ObjectSchema>(
        &self,
        cx: &Cx,
        id: &str,
    ) -> Outcome<Option<ZObject<S>>, Error> {
        match self
            .find_where::<S>(cx, &[(ID_COLUMN, Value::from(id))])
            .await
        {
            Outcome::Ok(found) => Outcome::Ok(found.into_iter().next()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn run<S: ObjectSchema>(
        &self,
        cx: &Cx,
        plan: &QueryPlan,
        statements: &[String],
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        let mut rows: Vec<Row> = Vec::new();
        for statement in statements {
            tracing::debug!(statement = %statement, "Running query");
            match query_all(cx, self.conn, statement, self.max_pages).await {
                Outcome::Ok(page_rows) => rows.extend(page_rows),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        if plan.is_split() {
            rows = combine_results(rows);
        }

        match materialize::<S>(&rows) {
            Ok(objects) => {
                tracing::debug!(count = objects.len(), "Materialized objects");
                Outcome::Ok(objects)
            }
            Err(e) => Outcome::Err(e),
        }
    }
}

fn plan_for<S: ObjectSchema, F: AsRef<str>>(fields: Option<&[F]>) -> QueryPlan {
    match fields {
        Some(fields) => QueryPlan::new(fields, S::SELECTABLE_ONLY_ALONE),
        None => QueryPlan::new(&S::default_query_fields(), S::SELECTABLE_ONLY_ALONE),
    }
}

/// Turn rows into clean objects.
pub fn materialize<S: ObjectSchema>(rows: &[Row]) -> zobject_core::Result<Vec<ZObject<S>>> {
    rows.iter().map(ZObject::from_row).collect()
}
