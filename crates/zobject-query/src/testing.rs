//! Scripted connector for unit tests.

#![allow(clippy::manual_async_fn)] // Mock trait impls must match trait signatures

use std::collections::HashMap;
use std::sync::Mutex;

use asupersync::{Cx, Outcome};
use zobject_core::{
    BatchResponse, Connector, Error, QueryError, QueryErrorKind, QueryResult, SaveResponse,
    WriteRequest,
};

pub(crate) fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Answers queries from fixed pages and records every call.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnector {
    queries: HashMap<String, QueryResult>,
    more: HashMap<String, QueryResult>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_query(mut self, statement: &str, page: QueryResult) -> Self {
        self.queries.insert(statement.to_string(), page);
        self
    }

    pub(crate) fn with_more(mut self, locator: &str, page: QueryResult) -> Self {
        self.more.insert(locator.to_string(), page);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("lock poisoned").push(call);
    }
}

fn unscripted(what: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Invalid,
        statement: Some(what.to_string()),
        message: "no scripted response".to_string(),
    })
}

impl Connector for ScriptedConnector {
    fn query(
        &self,
        _cx: &Cx,
        statement: &str,
    ) -> impl Future<Output = Outcome<QueryResult, Error>> + Send {
        self.record(format!("query:{statement}"));
        let page = self.queries.get(statement).cloned();
        let statement = statement.to_string();
        async move {
            match page {
                Some(page) => Outcome::Ok(page),
                None => Outcome::Err(unscripted(&statement)),
            }
        }
    }

    fn query_more(
        &self,
        _cx: &Cx,
        query_locator: &str,
    ) -> impl Future<Output = Outcome<QueryResult, Error>> + Send {
        self.record(format!("query_more:{query_locator}"));
        let page = self.more.get(query_locator).cloned();
        let locator = query_locator.to_string();
        async move {
            match page {
                Some(page) => Outcome::Ok(page),
                None => Outcome::Err(unscripted(&locator)),
            }
        }
    }

    fn create(
        &self,
        _cx: &Cx,
        _request: &WriteRequest,
    ) -> impl Future<Output = Outcome<SaveResponse, Error>> + Send {
        async { Outcome::Err(Error::Custom("create not scripted".to_string())) }
    }

    fn update(
        &self,
        _cx: &Cx,
        _request: &WriteRequest,
    ) -> impl Future<Output = Outcome<SaveResponse, Error>> + Send {
        async { Outcome::Err(Error::Custom("update not scripted".to_string())) }
    }

    fn destroy(
        &self,
        _cx: &Cx,
        _remote_name: &str,
        _id: &str,
    ) -> impl Future<Output = Outcome<SaveResponse, Error>> + Send {
        async { Outcome::Err(Error::Custom("destroy not scripted".to_string())) }
    }

    fn create_batch(
        &self,
        _cx: &Cx,
        _remote_name: &str,
        _payload: &str,
    ) -> impl Future<Output = Outcome<BatchResponse, Error>> + Send {
        async { Outcome::Err(Error::Custom("create_batch not scripted".to_string())) }
    }

    fn update_batch(
        &self,
        _cx: &Cx,
        _remote_name: &str,
        _payload: &str,
    ) -> impl Future<Output = Outcome<BatchResponse, Error>> + Send {
        async { Outcome::Err(Error::Custom("update_batch not scripted".to_string())) }
    }
}
