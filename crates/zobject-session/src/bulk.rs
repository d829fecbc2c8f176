//! Bulk create and update.
//!
//! A bulk call sends several objects of one type in a single request. The
//! payload holds one `zObjects` element per object, typed with the remote
//! name; the connector wraps it in its envelope. Results come back in
//! submission order and are applied to the objects positionally.
//!
//! A top-level rejection fails the whole call before any object is touched.
//! A rejection of an individual record is not an error: it is recorded on
//! that object and counted in the [`BulkReport`].

use asupersync::{Cx, Outcome};
use zobject_core::{
    BatchError, BatchResponse, Connector, Error, ObjectSchema, Operation, ProtocolError,
    SaveResult, XmlBuilder, XmlNamespaces, ZObject,
};

use crate::config::SessionConfig;

/// Element wrapping each object in a bulk payload.
pub const BULK_OBJECT_ELEMENT: &str = "zObjects";

/// Per-record outcome counts of one or more bulk calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Records the service accepted
    pub succeeded: usize,
    /// Records the service rejected (errors recorded on the objects)
    pub failed: usize,
}

impl BulkReport {
    /// Total records processed.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Check if every record was accepted.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    fn absorb(&mut self, other: BulkReport) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Render the bulk create payload: every non-null attribute of each object.
pub fn create_payload<S: ObjectSchema>(objects: &[ZObject<S>], namespaces: XmlNamespaces) -> String {
    render_payload(objects, namespaces, |object, xml| {
        let object_ns = xml.namespaces().object_prefix;
        for (info, value) in object.present_attributes() {
            xml.value_element(object_ns, info.remote_name, value);
        }
    })
}

/// Render the bulk update payload using the schema's update body.
pub fn update_payload<S: ObjectSchema>(objects: &[ZObject<S>], namespaces: XmlNamespaces) -> String {
    render_payload(objects, namespaces, S::write_bulk_update)
}

fn render_payload<S: ObjectSchema>(
    objects: &[ZObject<S>],
    namespaces: XmlNamespaces,
    body: impl Fn(&ZObject<S>, &mut XmlBuilder),
) -> String {
    let xsi_type_attr = format!("{}:type", namespaces.xsi_prefix);
    let xsi_type = format!("{}:{}", namespaces.object_prefix, S::REMOTE_NAME);
    let mut xml = XmlBuilder::new(namespaces);
    for object in objects {
        xml.element(
            namespaces.api_prefix,
            BULK_OBJECT_ELEMENT,
            &[(xsi_type_attr.as_str(), xsi_type.as_str())],
            |xml| body(object, xml),
        );
    }
    xml.finish()
}

/// Sends bulk create and update requests for one session.
#[derive(Debug)]
pub struct BulkWriter<'c, C: Connector> {
    conn: &'c C,
    batch_size: usize,
    namespaces: XmlNamespaces,
}

impl<'c, C: Connector> BulkWriter<'c, C> {
    /// Create a writer using the session's batch size and namespaces.
    pub fn new(conn: &'c C, config: &SessionConfig) -> Self {
        Self {
            conn,
            batch_size: config.bulk_batch_size.max(1),
            namespaces: config.namespaces,
        }
    }

    /// Create every object in one request.
    ///
    /// Accepted objects receive their remote id and start clean; rejected
    /// objects keep no id and gain an error.
    #[tracing::instrument(level = "info", skip(self, cx, objects), fields(remote_name = S::REMOTE_NAME, count = objects.len()))]
    pub async fn create<S: ObjectSchema>(
        &self,
        cx: &Cx,
        objects: &mut [ZObject<S>],
    ) -> Outcome<BulkReport, Error> {
        if let Err(e) = ensure_not_empty::<S>(Operation::Create, objects) {
            return Outcome::Err(e);
        }
        let payload = create_payload(objects, self.namespaces);
        tracing::trace!(payload = %payload, "Bulk create payload");

        let response = match self.conn.create_batch(cx, S::REMOTE_NAME, &payload).await {
            Outcome::Ok(response) => response,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match apply_batch_response(Operation::Create, objects, response) {
            Ok(report) => Outcome::Ok(report),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Update every object in one request.
    ///
    /// Accepted objects start clean; rejected objects keep their dirty state
    /// and gain an error.
    #[tracing::instrument(level = "info", skip(self, cx, objects), fields(remote_name = S::REMOTE_NAME, count = objects.len()))]
    pub async fn update<S: ObjectSchema>(
        &self,
        cx: &Cx,
        objects: &mut [ZObject<S>],
    ) -> Outcome<BulkReport, Error> {
        if let Err(e) = ensure_not_empty::<S>(Operation::Update, objects) {
            return Outcome::Err(e);
        }
        let payload = update_payload(objects, self.namespaces);
        tracing::trace!(payload = %payload, "Bulk update payload");

        let response = match self.conn.update_batch(cx, S::REMOTE_NAME, &payload).await {
            Outcome::Ok(response) => response,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match apply_batch_response(Operation::Update, objects, response) {
            Ok(report) => Outcome::Ok(report),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Create objects in consecutive requests of at most the configured batch size.
    ///
    /// Stops at the first failed request; earlier chunks stay applied.
    pub async fn create_chunked<S: ObjectSchema>(
        &self,
        cx: &Cx,
        objects: &mut [ZObject<S>],
    ) -> Outcome<BulkReport, Error> {
        if let Err(e) = ensure_not_empty::<S>(Operation::Create, objects) {
            return Outcome::Err(e);
        }
        let mut report = BulkReport::default();
        for chunk in objects.chunks_mut(self.batch_size) {
            match self.create(cx, chunk).await {
                Outcome::Ok(chunk_report) => report.absorb(chunk_report),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
        Outcome::Ok(report)
    }

    /// Update objects in consecutive requests of at most the configured batch size.
    ///
    /// Stops at the first failed request; earlier chunks stay applied.
    pub async fn update_chunked<S: ObjectSchema>(
        &self,
        cx: &Cx,
        objects: &mut [ZObject<S>],
    ) -> Outcome<BulkReport, Error> {
        if let Err(e) = ensure_not_empty::<S>(Operation::Update, objects) {
            return Outcome::Err(e);
        }
        let mut report = BulkReport::default();
        for chunk in objects.chunks_mut(self.batch_size) {
            match self.update(cx, chunk).await {
                Outcome::Ok(chunk_report) => report.absorb(chunk_report),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
        Outcome::Ok(report)
    }
}

fn ensure_not_empty<S: ObjectSchema>(
    operation: Operation,
    objects: &[ZObject<S>],
) -> zobject_core::Result<()> {
    if objects.is_empty() {
        return Err(Error::Custom(format!(
            "bulk {} of {} needs at least one object",
            operation.as_str(),
            S::REMOTE_NAME
        )));
    }
    Ok(())
}

/// Apply a bulk response to the submitted objects.
///
/// The response is checked as a whole first; on any error no object is
/// modified.
pub fn apply_batch_response<S: ObjectSchema>(
    operation: Operation,
    objects: &mut [ZObject<S>],
    response: BatchResponse,
) -> zobject_core::Result<BulkReport> {
    if let Some(detail) = response.errors.filter(|e| !e.is_empty()) {
        tracing::warn!(
            remote_name = S::REMOTE_NAME,
            operation = operation.as_str(),
            detail = %detail,
            "Bulk request rejected"
        );
        return Err(Error::Batch(BatchError {
            operation: operation.as_str(),
            remote_name: S::REMOTE_NAME,
            detail,
        }));
    }

    let results = response.results.into_vec();
    if results.len() != objects.len() {
        return Err(Error::Protocol(ProtocolError {
            message: format!(
                "bulk {} of {} returned {} results for {} objects",
                operation.as_str(),
                S::REMOTE_NAME,
                results.len(),
                objects.len()
            ),
            source: None,
        }));
    }
    if operation == Operation::Create {
        if let Some(index) = results.iter().position(|r| r.success && r.id.is_none()) {
            return Err(Error::Protocol(ProtocolError {
                message: format!(
                    "bulk create of {} reported success without an id at index {}",
                    S::REMOTE_NAME,
                    index
                ),
                source: None,
            }));
        }
    }

    let mut report = BulkReport::default();
    for (object, result) in objects.iter_mut().zip(results) {
        if apply_result(operation, object, result) {
            report.succeeded += 1;
        } else {
            report.failed += 1;
        }
    }

    tracing::debug!(
        remote_name = S::REMOTE_NAME,
        operation = operation.as_str(),
        succeeded = report.succeeded,
        failed = report.failed,
        "Applied bulk results"
    );
    Ok(report)
}

fn apply_result<S: ObjectSchema>(
    operation: Operation,
    object: &mut ZObject<S>,
    result: SaveResult,
) -> bool {
    if !result.success {
        let messages = result.messages();
        if messages.is_empty() {
            object
                .errors_mut()
                .add_base(format!("{} rejected by the service", operation.as_str()));
        }
        for message in messages {
            object.errors_mut().add_base(message);
        }
        return false;
    }

    if let (Operation::Create, Some(id)) = (operation, result.id) {
        object.apply_remote_id(id);
    }
    object.clear_changed();
    object.reset_complex_cache();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Account, MockConnector, account, unwrap_outcome};
    use asupersync::runtime::RuntimeBuilder;
    use chrono::NaiveDate;
    use zobject_core::OneOrMany;

    fn response(results: Vec<SaveResult>) -> BatchResponse {
        BatchResponse {
            errors: None,
            results: OneOrMany::Many(results),
        }
    }

    #[test]
    fn create_payload_has_one_element_per_object() {
        let mut first = account("Acme & Co");
        first
            .set(
                "last_invoice_date",
                NaiveDate::from_ymd_opt(2013, 4, 2)
                    .unwrap()
                    .and_hms_opt(13, 5, 9)
                    .unwrap(),
            )
            .unwrap();
        let second = account("Globex");

        let payload = create_payload(&[first, second], XmlNamespaces::default());
        assert_eq!(
            payload,
            "<ins0:zObjects xsi:type=\"ins1:Account\">\
             <ins1:Name>Acme &amp; Co</ins1:Name>\
             <ins1:AutoPay>false</ins1:AutoPay>\
             <ins1:LastInvoiceDate>2013-04-02T13:05:09</ins1:LastInvoiceDate>\
             </ins0:zObjects>\
             <ins0:zObjects xsi:type=\"ins1:Account\">\
             <ins1:Name>Globex</ins1:Name>\
             <ins1:AutoPay>false</ins1:AutoPay>\
             </ins0:zObjects>"
        );
    }

    #[test]
    fn update_payload_sends_id_and_dirty_fields() {
        let mut object = account("Acme");
        object.apply_remote_id("a1");
        object.clear_changed();
        object.set("name", "Renamed").unwrap();

        let payload = update_payload(&[object], XmlNamespaces::default());
        assert_eq!(
            payload,
            "<ins0:zObjects xsi:type=\"ins1:Account\">\
             <ins1:Id>a1</ins1:Id>\
             <ins1:Name>Renamed</ins1:Name>\
             </ins0:zObjects>"
        );
    }

    #[test]
    fn bulk_create_applies_results_by_position() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        let conn = MockConnector::new();
        conn.push_batch(response(vec![
            SaveResult::ok("id-0"),
            SaveResult::failed("bad name"),
            SaveResult::ok("id-2"),
        ]));
        let config = SessionConfig::default();
        let writer = BulkWriter::new(&conn, &config);
        let mut objects = vec![account("a"), account("b"), account("c")];

        rt.block_on(async {
            let report = unwrap_outcome(writer.create(&cx, &mut objects).await);
            assert_eq!(report, BulkReport { succeeded: 2, failed: 1 });
            assert!(!report.is_complete());
        });

        assert_eq!(objects[0].id(), Some("id-0"));
        assert_eq!(objects[2].id(), Some("id-2"));
        assert!(objects[1].is_new_record());
        assert!(objects[1].errors().contains_message("bad name"));
        assert!(objects[1].has_changes());
        assert!(!objects[0].has_changes());
        assert_eq!(conn.calls(), vec!["create_batch:Account"]);
    }

    #[test]
    fn single_bare_result_is_normalized() {
        let mut objects = vec![account("solo")];
        let report = apply_batch_response(
            Operation::Create,
            &mut objects,
            BatchResponse {
                errors: None,
                results: OneOrMany::One(SaveResult::ok("only")),
            },
        )
        .unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(objects[0].id(), Some("only"));
    }

    #[test]
    fn top_level_error_touches_nothing() {
        let mut objects = vec![account("a"), account("b")];
        let err = apply_batch_response(
            Operation::Create,
            &mut objects,
            BatchResponse {
                errors: Some("INVALID_TYPE".to_string()),
                results: OneOrMany::Many(vec![SaveResult::ok("1"), SaveResult::ok("2")]),
            },
        )
        .unwrap_err();

        assert!(matches!(err, Error::Batch(_)));
        assert!(objects.iter().all(|o| o.is_new_record() && o.errors().is_empty()));
    }

    #[test]
    fn result_count_mismatch_touches_nothing() {
        let mut objects = vec![account("a"), account("b")];
        let err = apply_batch_response(
            Operation::Create,
            &mut objects,
            response(vec![SaveResult::ok("1")]),
        )
        .unwrap_err();

        assert!(matches!(err, Error::Protocol(_)));
        assert!(objects[0].is_new_record());
    }

    #[test]
    fn bulk_update_clears_only_accepted_objects() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        let conn = MockConnector::new();
        conn.push_batch(response(vec![
            SaveResult::ok("u1"),
            SaveResult::failed("locked"),
        ]));
        let config = SessionConfig::default();
        let writer = BulkWriter::new(&conn, &config);

        let mut objects: Vec<_> = ["u1", "u2"]
            .iter()
            .map(|id| {
                let mut object = account("x");
                object.apply_remote_id(*id);
                object.clear_changed();
                object.set("name", "changed").unwrap();
                object
            })
            .collect();

        rt.block_on(async {
            let report = unwrap_outcome(writer.update(&cx, &mut objects).await);
            assert_eq!(report.total(), 2);
        });

        assert!(!objects[0].has_changes());
        assert!(objects[1].has_changes());
        assert_eq!(objects[1].id(), Some("u2"));
        assert!(objects[1].errors().contains_message("locked"));
        assert!(conn.payloads()[0].contains("<ins1:Id>u2</ins1:Id>"));
    }

    #[test]
    fn chunked_create_splits_requests() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        let conn = MockConnector::new();
        conn.push_batch(response(vec![SaveResult::ok("1"), SaveResult::ok("2")]));
        conn.push_batch(response(vec![SaveResult::ok("3")]));
        let config = SessionConfig::default().bulk_batch_size(2);
        let writer = BulkWriter::new(&conn, &config);
        let mut objects = vec![account("a"), account("b"), account("c")];

        rt.block_on(async {
            let report = unwrap_outcome(writer.create_chunked(&cx, &mut objects).await);
            assert_eq!(report.succeeded, 3);
        });

        assert_eq!(conn.payloads().len(), 2);
        assert_eq!(objects[2].id(), Some("3"));
    }

    #[test]
    fn empty_input_is_rejected_without_a_request() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        let conn = MockConnector::new();
        let config = SessionConfig::default();
        let writer = BulkWriter::new(&conn, &config);
        let mut objects: Vec<ZObject<Account>> = Vec::new();

        rt.block_on(async {
            let outcome = writer.create(&cx, &mut objects).await;
            assert!(matches!(outcome, Outcome::Err(Error::Custom(_))));
        });
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn null_attributes_are_omitted() {
        let object = ZObject::<Account>::new();
        let payload = create_payload(&[object], XmlNamespaces::default());
        assert!(!payload.contains("Name"));
        assert!(payload.contains("<ins1:AutoPay>false</ins1:AutoPay>"));
    }
}
