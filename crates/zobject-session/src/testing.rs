//! Mock connector for unit tests.

#![allow(clippy::manual_async_fn)] // Mock trait impls must match trait signatures

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use asupersync::{Cx, Outcome};
use zobject_core::{
    AttributeInfo, BatchResponse, ComplexAttribute, Connector, Error, ObjectErrors, ObjectSchema,
    Operation, QueryResult, SaveResponse, SaveResult, Value, WriteRequest, ZObject,
};

pub(crate) fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Account-like schema used across the session tests.
pub(crate) struct Account;

impl ObjectSchema for Account {
    const REMOTE_NAME: &'static str = "Account";
    const COMPLEX_ATTRIBUTES: &'static [ComplexAttribute] =
        &[ComplexAttribute::new("bill_to_contact", "bill_to_contact_cached")];

    fn attributes() -> &'static [AttributeInfo] {
        const ATTRS: &[AttributeInfo] = &[
            AttributeInfo::new("name", "Name"),
            AttributeInfo::new("auto_pay", "AutoPay"),
            AttributeInfo::new("last_invoice_date", "LastInvoiceDate"),
            AttributeInfo::new("bill_to_contact", "BillToContact"),
        ];
        ATTRS
    }

    fn default_attributes() -> Vec<(&'static str, Value)> {
        vec![("auto_pay", Value::Bool(false))]
    }

    fn validate(object: &ZObject<Self>, errors: &mut ObjectErrors) {
        if object.get("name").is_none_or(Value::is_null) {
            errors.add_required("name");
        }
    }
}

pub(crate) fn account(name: &str) -> ZObject<Account> {
    ZObject::with_attributes([("name", name)]).expect("declared attribute")
}

pub(crate) fn save_response(operation: Operation, result: SaveResult) -> SaveResponse {
    SaveResponse { operation, result }
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) save_responses: VecDeque<SaveResponse>,
    pub(crate) batch_responses: VecDeque<BatchResponse>,
    pub(crate) queries: HashMap<String, QueryResult>,
    pub(crate) requests: Vec<WriteRequest>,
    pub(crate) payloads: Vec<String>,
    pub(crate) calls: Vec<String>,
}

/// Connector answering from a shared script; every call is recorded.
#[derive(Debug, Clone)]
pub(crate) struct MockConnector {
    pub(crate) state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub(crate) fn push_save(&self, response: SaveResponse) {
        self.lock().save_responses.push_back(response);
    }

    pub(crate) fn push_batch(&self, response: BatchResponse) {
        self.lock().batch_responses.push_back(response);
    }

    pub(crate) fn push_query(&self, statement: &str, page: QueryResult) {
        self.lock().queries.insert(statement.to_string(), page);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub(crate) fn requests(&self) -> Vec<WriteRequest> {
        self.lock().requests.clone()
    }

    pub(crate) fn payloads(&self) -> Vec<String> {
        self.lock().payloads.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("lock poisoned")
    }

    fn next_save(&self, call: String, request: Option<&WriteRequest>) -> Outcome<SaveResponse, Error> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(request) = request {
            state.requests.push(request.clone());
        }
        match state.save_responses.pop_front() {
            Some(response) => Outcome::Ok(response),
            None => Outcome::Err(Error::Custom("no scripted save response".to_string())),
        }
    }

    fn next_batch(&self, call: String, payload: &str) -> Outcome<BatchResponse, Error> {
        let mut state = self.lock();
        state.calls.push(call);
        state.payloads.push(payload.to_string());
        match state.batch_responses.pop_front() {
            Some(response) => Outcome::Ok(response),
            None => Outcome::Err(Error::Custom("no scripted batch response".to_string())),
        }
    }
}

impl Connector for MockConnector {
    fn query(
        &self,
        _cx: &Cx,
        statement: &str,
    ) -> impl Future<Output = Outcome<QueryResult, Error>> + Send {
        let outcome = {
            let mut state = self.lock();
            state.calls.push(format!("query:{statement}"));
            match state.queries.get(statement) {
                Some(page) => Outcome::Ok(page.clone()),
                None => Outcome::Err(Error::Custom(format!("unscripted query: {statement}"))),
            }
        };
        async move { outcome }
    }

    fn query_more(
        &self,
        _cx: &Cx,
        query_locator: &str,
    ) -> impl Future<Output = Outcome<QueryResult, Error>> + Send {
        let locator = query_locator.to_string();
        async move { Outcome::Err(Error::Custom(format!("unscripted locator: {locator}"))) }
    }

    fn create(
        &self,
        _cx: &Cx,
        request: &WriteRequest,
    ) -> impl Future<Output = Outcome<SaveResponse, Error>> + Send {
        let outcome = self.next_save(format!("create:{}", request.remote_name), Some(request));
        async move { outcome }
    }

    fn update(
        &self,
        _cx: &Cx,
        request: &WriteRequest,
    ) -> impl Future<Output = Outcome<SaveResponse, Error>> + Send {
        let outcome = self.next_save(format!("update:{}", request.remote_name), Some(request));
        async move { outcome }
    }

    fn destroy(
        &self,
        _cx: &Cx,
        remote_name: &str,
        id: &str,
    ) -> impl Future<Output = Outcome<SaveResponse, Error>> + Send {
        let outcome = self.next_save(format!("destroy:{remote_name}:{id}"), None);
        async move { outcome }
    }

    fn create_batch(
        &self,
        _cx: &Cx,
        remote_name: &str,
        payload: &str,
    ) -> impl Future<Output = Outcome<BatchResponse, Error>> + Send {
        let outcome = self.next_batch(format!("create_batch:{remote_name}"), payload);
        async move { outcome }
    }

    fn update_batch(
        &self,
        _cx: &Cx,
        remote_name: &str,
        payload: &str,
    ) -> impl Future<Output = Outcome<BatchResponse, Error>> + Send {
        let outcome = self.next_batch(format!("update_batch:{remote_name}"), payload);
        async move { outcome }
    }
}
