//! Query execution with cursor pagination.

use asupersync::{Cx, Outcome};
use zobject_core::{Connector, Error, QueryError, QueryErrorKind, Row};

/// Default cap on pages fetched for one statement.
pub const DEFAULT_MAX_QUERY_PAGES: usize = 1000;

/// Run `statement` and follow the query locator until the service reports done.
///
/// Records from every page are returned in page order. A bare single record
/// and an empty page are both normalized into the list. Transport failures
/// propagate unchanged; nothing is retried.
///
/// With `max_pages` set, a statement that still reports more pages after that
/// many fetches fails with [`QueryErrorKind::PaginationLimit`].
#[tracing::instrument(level = "debug", skip(cx, conn))]
pub async fn query_all<C: Connector>(
    cx: &Cx,
    conn: &C,
    statement: &str,
    max_pages: Option<usize>,
) -> Outcome<Vec<Row>, Error> {
    let mut page = match conn.query(cx, statement).await {
        Outcome::Ok(page) => page,
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };

    let mut rows = Vec::new();
    let mut pages = 1usize;
    loop {
        let locator = page.next_locator().map(str::to_string);
        tracing::trace!(
            page = pages,
            done = page.done,
            size = page.size,
            records = page.records.len(),
            "Received query page"
        );
        rows.extend(page.records.into_vec());

        let Some(locator) = locator else {
            break;
        };
        if max_pages.is_some_and(|max| pages >= max) {
            tracing::warn!(pages, "Query exceeded page limit");
            return Outcome::Err(Error::Query(QueryError {
                kind: QueryErrorKind::PaginationLimit,
                statement: Some(statement.to_string()),
                message: format!("query still had more results after {pages} pages"),
            }));
        }

        page = match conn.query_more(cx, &locator).await {
            Outcome::Ok(page) => page,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        pages += 1;
    }

    tracing::debug!(pages, rows = rows.len(), "Query complete");
    Outcome::Ok(rows)
}
