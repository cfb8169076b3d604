//! Executor - Runs one fuzzing unit through its state machine
//!
//! PREPARE checks the unit is eligible, MUTATE builds the requests from a clone
//! of the baseline, INVOKE calls the transport with a per-call timeout,
//! CLASSIFY turns each response into an attempt and REPORT folds the attempts
//! into exactly one verdict. Ineligible units stop at PREPARE or MUTATE and
//! produce no verdict.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::contract::schema::SchemaDescriptor;
use crate::contract::ContractContext;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

use super::detection::IndicatorDetector;
use super::family::ResponseCodeFamily;
use super::mutation::strategy::MutationStrategy;
use super::mutation::{self, insert_in_the_middle, stringify, MutationError};
use super::path::{Location, MAX_PATH_DEPTH};
use super::unit::{FuzzingUnit, UnitTarget};
use super::verdict::{Attempt, Verdict, VerdictKind};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Codes services send without listing them in their contract
const RARELY_DOCUMENTED: ResponseCodeFamily = ResponseCodeFamily::codes(&[406, 414, 415]);

/// Unimplemented operations are reported, never failed
const NOT_IMPLEMENTED: u16 = 501;

/// Result of executing one unit
#[derive(Debug, Clone)]
pub enum UnitOutcome {
    /// The unit ran (or was a SKIP) and produced a verdict
    Reported(Verdict),
    /// The unit did not apply to this payload; nothing was sent or reported
    Ineligible(String),
}

impl UnitOutcome {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Reported(verdict) => Some(verdict),
            Self::Ineligible(_) => None,
        }
    }

    pub fn into_verdict(self) -> Option<Verdict> {
        match self {
            Self::Reported(verdict) => Some(verdict),
            Self::Ineligible(_) => None,
        }
    }

    pub fn is_ineligible(&self) -> bool {
        matches!(self, Self::Ineligible(_))
    }
}

/// What MUTATE has to build
enum Plan {
    /// Apply the strategy to the body at each location
    Body(Vec<Location>),
    /// Send the body unchanged, or no body at all
    Baseline,
    /// Apply the strategy to a header
    Header(String),
}

/// A request ready to send, labelled with the location it exercises
struct PreparedCall {
    label: String,
    request: HttpRequest,
    injected: Option<String>,
}

struct CallResult {
    call: PreparedCall,
    result: Result<HttpResponse, TransportError>,
    elapsed_ms: u64,
}

enum State {
    Prepare,
    Mutate(Plan),
    Invoke(Vec<PreparedCall>),
    Classify(Vec<CallResult>),
    Report(Verdict),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Mutate(_) => "mutate",
            Self::Invoke(_) => "invoke",
            Self::Classify(_) => "classify",
            Self::Report(_) => "report",
        }
    }
}

/// Executes fuzzing units against a transport
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn HttpTransport>,
    context: Arc<ContractContext>,
    detector: Arc<IndicatorDetector>,
    timeout: Duration,
    max_path_depth: usize,
    extra_headers: Vec<(String, String)>,
}

impl Executor {
    pub fn new(transport: Arc<dyn HttpTransport>, context: Arc<ContractContext>) -> Self {
        Self {
            transport,
            context,
            detector: Arc::new(IndicatorDetector::new()),
            timeout: DEFAULT_TIMEOUT,
            max_path_depth: MAX_PATH_DEPTH,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    /// Headers added to every request, after the declared ones
    pub fn with_extra_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.extra_headers = headers;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one unit to completion
    pub async fn execute(&self, unit: &FuzzingUnit) -> UnitOutcome {
        let mut state = State::Prepare;

        loop {
            trace!("unit {} -> {}", unit.id, state.name());
            state = match state {
                State::Prepare => {
                    if let MutationStrategy::Skip(reason) = &unit.strategy {
                        State::Report(Verdict::skipped(unit, reason.clone()))
                    } else {
                        match self.prepare(unit) {
                            Ok(plan) => State::Mutate(plan),
                            Err(reason) => return ineligible(unit, reason),
                        }
                    }
                }
                State::Mutate(plan) => match self.mutate(unit, plan) {
                    Ok(calls) => State::Invoke(calls),
                    Err(reason) => return ineligible(unit, reason),
                },
                State::Invoke(calls) => State::Classify(self.invoke(calls).await),
                State::Classify(results) => State::Report(self.classify(unit, results)),
                State::Report(verdict) => return UnitOutcome::Reported(verdict),
            };
        }
    }

    fn prepare(&self, unit: &FuzzingUnit) -> Result<Plan, String> {
        match &unit.target {
            UnitTarget::Field(path) => {
                if is_empty_payload(&unit.baseline) {
                    return Err("empty payload".to_string());
                }
                if path.depth() > self.max_path_depth {
                    return Err(format!(
                        "path {} is deeper than {} segments",
                        path, self.max_path_depth
                    ));
                }
                if self.context.is_discriminator(path) {
                    return Err(format!("{} is a discriminator field", path));
                }

                let locations: Vec<Location> = path
                    .resolve(&unit.baseline)
                    .into_iter()
                    .map(|resolved| resolved.location)
                    .collect();
                if locations.is_empty() {
                    return Err(format!("field {} not present in payload", path));
                }
                Ok(Plan::Body(locations))
            }
            UnitTarget::Request => {
                if !unit.strategy.is_structural() {
                    return Ok(Plan::Baseline);
                }
                if is_empty_payload(&unit.baseline) {
                    return Err("empty payload".to_string());
                }
                Ok(Plan::Body(vec![Location::root()]))
            }
            UnitTarget::Header(name) => {
                let declared = unit
                    .operation
                    .headers
                    .iter()
                    .any(|h| h.name.eq_ignore_ascii_case(name));
                if !declared && !matches!(unit.strategy, MutationStrategy::NewKey { .. }) {
                    return Err(format!("header {} not declared", name));
                }
                Ok(Plan::Header(name.clone()))
            }
        }
    }

    fn mutate(&self, unit: &FuzzingUnit, plan: Plan) -> Result<Vec<PreparedCall>, String> {
        let injected = injected_text(&unit.strategy);

        match plan {
            Plan::Baseline => {
                let mut request = self.base_request(unit, None);
                if !unit.baseline.is_null() {
                    let body = serde_json::to_string(unit.baseline.as_ref()).map_err(|e| e.to_string())?;
                    request = request.with_body(body);
                }
                Ok(vec![PreparedCall {
                    label: "request".to_string(),
                    request,
                    injected,
                }])
            }
            Plan::Body(locations) => {
                let mut calls = Vec::with_capacity(locations.len());
                let mut first_reason = None;

                for location in &locations {
                    match mutation::apply(&unit.baseline, location, &unit.strategy) {
                        Ok(payload) => calls.push(PreparedCall {
                            label: payload.location.to_string(),
                            request: self.base_request(unit, None).with_body(payload.body),
                            injected: injected.clone(),
                        }),
                        Err(err @ MutationError::Render(_)) => return Err(err.to_string()),
                        Err(err) => {
                            first_reason.get_or_insert_with(|| err.to_string());
                        }
                    }
                }

                match (calls.is_empty(), first_reason) {
                    (true, Some(reason)) => Err(reason),
                    (true, None) => Err("nothing to send".to_string()),
                    (false, _) => Ok(calls),
                }
            }
            Plan::Header(name) => {
                let mut request = self.base_request(unit, Some(&name));
                let baseline_value = unit
                    .operation
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case(&name))
                    .map(|h| h.baseline_value())
                    .unwrap_or_default();

                match &unit.strategy {
                    MutationStrategy::Remove => {}
                    MutationStrategy::NoOp => request = request.with_header(&name, baseline_value),
                    MutationStrategy::Replace(value) => {
                        request = request.with_header(&name, stringify(value))
                    }
                    MutationStrategy::Prefix(text) => {
                        request = request.with_header(&name, format!("{}{}", text, baseline_value))
                    }
                    MutationStrategy::Trail(text) => {
                        request = request.with_header(&name, format!("{}{}", baseline_value, text))
                    }
                    MutationStrategy::DuplicateKey(value) => {
                        request = request
                            .with_header(&name, baseline_value)
                            .with_header(&name, stringify(value))
                    }
                    MutationStrategy::NewKey { name: extra, value } => {
                        if !baseline_value.is_empty() {
                            request = request.with_header(&name, baseline_value);
                        }
                        request = request.with_header(extra, stringify(value))
                    }
                    MutationStrategy::KeyInsert(chars) => {
                        request = request.with_header(insert_in_the_middle(&name, chars), baseline_value)
                    }
                    MutationStrategy::Skip(reason) => return Err(reason.clone()),
                }

                Ok(vec![PreparedCall {
                    label: format!("header {}", name),
                    request,
                    injected,
                }])
            }
        }
    }

    /// Method, resolved path, declared headers (minus `skip_header`) and
    /// configured extras; header plans carry the baseline body along
    fn base_request(&self, unit: &FuzzingUnit, skip_header: Option<&str>) -> HttpRequest {
        let operation = &unit.operation;
        let mut request = HttpRequest::new(operation.method, operation.resolved_path());
        for (name, value) in &operation.query_params {
            request = request.with_query(name, value);
        }

        for header in &operation.headers {
            if skip_header.is_some_and(|skip| header.name.eq_ignore_ascii_case(skip)) {
                continue;
            }
            request = request.with_header(&header.name, header.baseline_value());
        }
        for (name, value) in &self.extra_headers {
            if skip_header.is_some_and(|skip| name.eq_ignore_ascii_case(skip)) {
                continue;
            }
            request = request.with_header(name, value);
        }

        if skip_header.is_some() && !unit.baseline.is_null() {
            if let Ok(body) = serde_json::to_string(unit.baseline.as_ref()) {
                request = request.with_body(body);
            }
        }
        request
    }

    async fn invoke(&self, calls: Vec<PreparedCall>) -> Vec<CallResult> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let started = Instant::now();
            let result = match tokio::time::timeout(
                self.timeout,
                self.transport.call(&call.request, self.timeout),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.timeout)),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            if let Err(err) = &result {
                warn!(
                    "{} {} ({}) failed: {}",
                    call.request.method, call.request.path, call.label, err
                );
            }
            results.push(CallResult {
                call,
                result,
                elapsed_ms,
            });
        }

        results
    }

    fn classify(&self, unit: &FuzzingUnit, results: Vec<CallResult>) -> Verdict {
        let attempts = results
            .into_iter()
            .map(|outcome| self.classify_one(unit, outcome))
            .collect();
        Verdict::from_attempts(unit, attempts)
    }

    fn classify_one(&self, unit: &FuzzingUnit, outcome: CallResult) -> Attempt {
        let CallResult {
            call,
            result,
            elapsed_ms,
        } = outcome;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                return Attempt {
                    location: call.label,
                    response_code: None,
                    kind: VerdictKind::Error,
                    detail: err.to_string(),
                    elapsed_ms,
                }
            }
        };

        let status = response.status;
        let indicator = unit.security.and_then(|check| {
            self.detector
                .scan(&response.body, check, call.injected.as_deref())
        });

        let (kind, detail) = if let Some(indicator) = indicator {
            (
                VerdictKind::Error,
                format!("{} (status {})", indicator, status),
            )
        } else if unit.expected.accepts(status) {
            let exempt = RARELY_DOCUMENTED.accepts(status);
            let documented = unit.operation.documented.map_or(true, |d| d.accepts(status));
            let schema = unit.operation.response_schema(status).filter(|_| !exempt);

            if !documented && !exempt {
                (
                    VerdictKind::Warn,
                    format!("response code {} not documented", status),
                )
            } else if schema.is_some_and(|schema| !body_matches(schema, &response.body)) {
                (
                    VerdictKind::Warn,
                    format!("response body does not match the schema documented for {}", status),
                )
            } else {
                (
                    VerdictKind::Pass,
                    format!("expected {}, got {}", unit.expected, status),
                )
            }
        } else if status == NOT_IMPLEMENTED {
            (
                VerdictKind::Warn,
                format!("operation not implemented (status {})", status),
            )
        } else {
            (
                VerdictKind::Fail,
                format!("expected {}, got {}", unit.expected, status),
            )
        };

        Attempt {
            location: call.label,
            response_code: Some(status),
            kind,
            detail,
            elapsed_ms: response.elapsed_ms.max(elapsed_ms),
        }
    }
}

fn body_matches(schema: &SchemaDescriptor, body: &str) -> bool {
    serde_json::from_str::<Value>(body).is_ok_and(|value| schema.matches(&value))
}

fn ineligible(unit: &FuzzingUnit, reason: String) -> UnitOutcome {
    debug!(
        "Skipping {} on {} ({}): {}",
        unit.fuzzer,
        unit.operation.label(),
        unit.target,
        reason
    );
    UnitOutcome::Ineligible(reason)
}

/// Payloads with nothing to fuzz: `null`, `{}`, or a blank or `"{}"` string
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(text) => {
            let text = text.trim();
            text.is_empty() || text == "{}"
        }
        _ => false,
    }
}

/// Attacker-controlled text carried by a strategy, for reflection checks
fn injected_text(strategy: &MutationStrategy) -> Option<String> {
    match strategy {
        MutationStrategy::Replace(Value::String(text))
        | MutationStrategy::DuplicateKey(Value::String(text))
        | MutationStrategy::Prefix(text)
        | MutationStrategy::Trail(text) => Some(text.clone()),
        MutationStrategy::NewKey {
            value: Value::String(text),
            ..
        } => Some(text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{HeaderSpec, HttpMethod, Operation};
    use crate::fuzzer::detection::SecurityCheck;
    use crate::fuzzer::family::ResponseCodeFamily;
    use crate::fuzzer::path::FieldPath;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn executor(transport: &MockTransport) -> Executor {
        Executor::new(Arc::new(transport.clone()), Arc::new(ContractContext::new()))
            .with_timeout(Duration::from_millis(200))
    }

    fn operation(payload: Value) -> Arc<Operation> {
        Arc::new(Operation::new(HttpMethod::Post, "/users").with_payload(payload))
    }

    fn field_unit(payload: Value, path: &str, strategy: MutationStrategy) -> FuzzingUnit {
        FuzzingUnit::new(
            "test",
            operation(payload),
            UnitTarget::Field(FieldPath::parse(path).unwrap()),
            strategy,
            ResponseCodeFamily::CLIENT_ERROR,
        )
    }

    #[tokio::test]
    async fn replaced_field_rejected_passes() {
        let transport = MockTransport::new();
        transport.queue_status(400).await;
        let unit = field_unit(json!({"user": {"age": 30}}), "user#age", MutationStrategy::Replace(json!(-1)));

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();

        assert_eq!(verdict.kind, VerdictKind::Pass);
        assert_eq!(verdict.response_code, Some(400));
        let sent = transport.requests().await;
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"user":{"age":-1}}"#));
        assert_eq!(*unit.baseline, json!({"user": {"age": 30}}));
    }

    #[tokio::test]
    async fn accepted_mutation_fails() {
        let transport = MockTransport::new();
        transport.queue_status(200).await;
        let unit = field_unit(json!({"age": 30}), "age", MutationStrategy::Replace(json!("x")));

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert_eq!(verdict.diagnostic, "expected 4XX, got 200");
        assert!(!verdict.matched);
    }

    #[tokio::test]
    async fn fan_out_sends_one_request_per_element() {
        let transport = MockTransport::new().with_fallback(HttpResponse::new(400));
        let unit = field_unit(
            json!({"items": [{"id": 1}, {"id": 2}]}),
            "items#id",
            MutationStrategy::Replace(json!("x")),
        );

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();

        assert_eq!(transport.request_count().await, 2);
        assert_eq!(verdict.attempts.len(), 2);
        assert_eq!(verdict.attempts[0].location, "items[0]#id");
        assert_eq!(verdict.attempts[1].location, "items[1]#id");
        assert_eq!(verdict.kind, VerdictKind::Pass);
    }

    #[tokio::test]
    async fn absent_field_is_ineligible() {
        let transport = MockTransport::new();
        let unit = field_unit(json!({}), "missing#field", MutationStrategy::Remove);
        assert!(executor(&transport).execute(&unit).await.is_ineligible());

        let unit = field_unit(json!({"a": 1}), "missing#field", MutationStrategy::Remove);
        assert!(executor(&transport).execute(&unit).await.is_ineligible());

        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let transport = MockTransport::new();
        transport
            .queue_delayed(Duration::from_secs(5), HttpResponse::new(400))
            .await;
        let unit = field_unit(json!({"age": 1}), "age", MutationStrategy::Replace(json!(-1)));

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Error);
        assert!(verdict.diagnostic.contains("timeout"));
        assert_eq!(verdict.response_code, None);
    }

    #[tokio::test]
    async fn connection_error_is_an_error() {
        let transport = MockTransport::new();
        transport
            .queue_error(TransportError::Connection("refused".into()))
            .await;
        let unit = field_unit(json!({"age": 1}), "age", MutationStrategy::Remove);

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Error);
        assert!(verdict.diagnostic.contains("refused"));
    }

    #[tokio::test]
    async fn skip_sends_nothing() {
        let transport = MockTransport::new();
        let unit = field_unit(json!({"age": 1}), "age", MutationStrategy::Skip("not applicable".into()));

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Skipped);
        assert_eq!(verdict.diagnostic, "not applicable");
        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn discriminator_fields_are_ineligible() {
        let transport = MockTransport::new();
        let context = ContractContext::new().with_discriminator("petType");
        let executor = Executor::new(Arc::new(transport.clone()), Arc::new(context));
        let unit = field_unit(json!({"petType": "dog"}), "petType", MutationStrategy::Remove);

        assert!(executor.execute(&unit).await.is_ineligible());
        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn deep_paths_are_ineligible() {
        let transport = MockTransport::new();
        let unit = field_unit(json!({"a": {"b": {"c": 1}}}), "a#b#c", MutationStrategy::Remove);

        let outcome = executor(&transport).with_max_path_depth(2).execute(&unit).await;
        assert!(outcome.is_ineligible());
    }

    #[tokio::test]
    async fn reflected_payload_is_an_error_despite_status() {
        let transport = MockTransport::new();
        transport
            .queue_response(HttpResponse::new(400).with_body(r#"{"name":"<script>alert(1)</script>"}"#))
            .await;
        let unit = field_unit(
            json!({"name": "x"}),
            "name",
            MutationStrategy::Replace(json!("<script>alert(1)</script>")),
        )
        .with_security(SecurityCheck::Xss);

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Error);
        assert!(verdict.diagnostic.contains("reflect"));
    }

    #[tokio::test]
    async fn sql_error_is_an_error() {
        let transport = MockTransport::new();
        transport
            .queue_response(HttpResponse::new(200).with_body("You have an error in your SQL syntax"))
            .await;
        let unit = field_unit(json!({"name": "x"}), "name", MutationStrategy::Replace(json!("' OR 1=1--")))
            .with_security(SecurityCheck::SqlInjection);

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Error);
    }

    #[tokio::test]
    async fn undocumented_code_warns() {
        let transport = MockTransport::new();
        transport.queue_status(418).await;
        let operation = Arc::new(
            Operation::new(HttpMethod::Post, "/users")
                .with_payload(json!({"age": 1}))
                .with_documented(ResponseCodeFamily::codes(&[201, 400])),
        );
        let unit = FuzzingUnit::new(
            "test",
            operation,
            UnitTarget::Field(FieldPath::parse("age").unwrap()),
            MutationStrategy::Remove,
            ResponseCodeFamily::CLIENT_ERROR,
        );

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Warn);
        assert_eq!(verdict.diagnostic, "response code 418 not documented");
    }

    fn documented_unit(operation: Operation, expected: ResponseCodeFamily) -> FuzzingUnit {
        FuzzingUnit::new(
            "test",
            Arc::new(operation.with_payload(json!({"age": 1}))),
            UnitTarget::Field(FieldPath::parse("age").unwrap()),
            MutationStrategy::Replace(json!("x")),
            expected,
        )
    }

    #[tokio::test]
    async fn not_implemented_warns_instead_of_failing() {
        let transport = MockTransport::new();
        transport.queue_status(501).await;
        let operation = Operation::new(HttpMethod::Post, "/users")
            .with_documented(ResponseCodeFamily::codes(&[201, 400]));
        let unit = documented_unit(operation, ResponseCodeFamily::CLIENT_ERROR);

        let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
        assert_eq!(verdict.kind, VerdictKind::Warn);
        assert_eq!(verdict.diagnostic, "operation not implemented (status 501)");
        assert!(!verdict.kind.is_failure());
    }

    #[tokio::test]
    async fn media_type_codes_need_not_be_documented() {
        let transport = MockTransport::new();
        for status in [406, 414, 415] {
            transport.queue_status(status).await;
        }
        let operation = Operation::new(HttpMethod::Post, "/users")
            .with_documented(ResponseCodeFamily::codes(&[201, 400]));
        let unit = documented_unit(operation, ResponseCodeFamily::CLIENT_ERROR);

        for status in [406, 414, 415] {
            let verdict = executor(&transport).execute(&unit).await.into_verdict().unwrap();
            assert_eq!(verdict.kind, VerdictKind::Pass, "status {}", status);
        }
    }

    #[tokio::test]
    async fn response_body_is_checked_against_its_schema() {
        let transport = MockTransport::new();
        transport
            .queue_response(HttpResponse::new(400).with_body(r#"{"code": "E1", "message": "bad age"}"#))
            .await;
        transport
            .queue_response(HttpResponse::new(400).with_body(r#"{"message": 12}"#))
            .await;
        transport.queue_response(HttpResponse::new(400).with_body("oops")).await;

        let error_schema = crate::contract::schema::SchemaParser::new(None)
            .parse(&json!({
                "type": "object",
                "required": ["code"],
                "properties": {"code": {"type": "string"}, "message": {"type": "string"}}
            }))
            .unwrap();
        let operation = Operation::new(HttpMethod::Post, "/users")
            .with_documented(ResponseCodeFamily::codes(&[201, 400]))
            .with_response_schema(400, error_schema);
        let unit = documented_unit(operation, ResponseCodeFamily::CLIENT_ERROR);
        let executor = executor(&transport);

        let conforming = executor.execute(&unit).await.into_verdict().unwrap();
        assert_eq!(conforming.kind, VerdictKind::Pass);

        for _ in 0..2 {
            let verdict = executor.execute(&unit).await.into_verdict().unwrap();
            assert_eq!(verdict.kind, VerdictKind::Warn);
            assert_eq!(
                verdict.diagnostic,
                "response body does not match the schema documented for 400"
            );
        }
    }

    #[tokio::test]
    async fn query_parameters_are_sent_with_every_request() {
        let transport = MockTransport::new();
        let operation = Operation::new(HttpMethod::Post, "/users").with_query_param("page", "1");
        let unit = documented_unit(operation, ResponseCodeFamily::CLIENT_ERROR);

        executor(&transport).execute(&unit).await;
        let sent = transport.requests().await;
        assert_eq!(sent[0].query, vec![("page".to_string(), "1".to_string())]);
    }

    #[tokio::test]
    async fn duplicate_key_is_rendered_twice() {
        let transport = MockTransport::new();
        let unit = field_unit(json!({"id": 1}), "id", MutationStrategy::DuplicateKey(json!(2)));

        executor(&transport).execute(&unit).await;
        let sent = transport.requests().await;
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"id":1,"id":2}"#));
    }

    #[tokio::test]
    async fn new_key_on_request_root() {
        let transport = MockTransport::new();
        let unit = FuzzingUnit::new(
            "new-fields",
            operation(json!({"id": 1})),
            UnitTarget::Request,
            MutationStrategy::NewKey {
                name: "extra".into(),
                value: json!("v"),
            },
            ResponseCodeFamily::CLIENT_ERROR,
        );

        executor(&transport).execute(&unit).await;
        let sent = transport.requests().await;
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"id":1,"extra":"v"}"#));
    }

    #[tokio::test]
    async fn happy_path_without_body() {
        let transport = MockTransport::new();
        let operation = Arc::new(Operation::new(HttpMethod::Get, "/pets/{id}").with_path_param("id", "7"));
        let unit = FuzzingUnit::new(
            "happy-path",
            operation,
            UnitTarget::Request,
            MutationStrategy::NoOp,
            ResponseCodeFamily::SUCCESS,
        );

        let verdict = executor(&transport)
            .with_extra_headers(vec![("Authorization".into(), "Bearer t".into())])
            .execute(&unit)
            .await
            .into_verdict()
            .unwrap();

        assert_eq!(verdict.kind, VerdictKind::Pass);
        let sent = transport.requests().await;
        assert_eq!(sent[0].path, "/pets/7");
        assert_eq!(sent[0].body, None);
        assert_eq!(sent[0].header("authorization"), Some("Bearer t"));
    }

    fn header_unit(strategy: MutationStrategy) -> FuzzingUnit {
        let operation = Arc::new(
            Operation::new(HttpMethod::Post, "/users")
                .with_payload(json!({"id": 1}))
                .with_header(HeaderSpec::new("X-Request-Id", true).with_example("abc"))
                .with_header(HeaderSpec::new("X-Tenant", false).with_example("t1")),
        );
        FuzzingUnit::new(
            "headers",
            operation,
            UnitTarget::Header("X-Request-Id".into()),
            strategy,
            ResponseCodeFamily::CLIENT_ERROR,
        )
    }

    #[tokio::test]
    async fn removed_header_is_omitted() {
        let transport = MockTransport::new();
        executor(&transport).execute(&header_unit(MutationStrategy::Remove)).await;

        let sent = transport.requests().await;
        assert_eq!(sent[0].header("X-Request-Id"), None);
        assert_eq!(sent[0].header("X-Tenant"), Some("t1"));
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"id":1}"#));
    }

    #[tokio::test]
    async fn header_value_strategies() {
        let transport = MockTransport::new();
        let executor = executor(&transport);
        executor
            .execute(&header_unit(MutationStrategy::DuplicateKey(json!("dup"))))
            .await;
        executor
            .execute(&header_unit(MutationStrategy::Trail("  ".into())))
            .await;

        let sent = transport.requests().await;
        let duplicated: Vec<_> = sent[0].header_values("X-Request-Id").collect();
        assert_eq!(duplicated, vec!["abc", "dup"]);
        assert_eq!(sent[1].header("X-Request-Id"), Some("abc  "));
    }

    #[tokio::test]
    async fn undeclared_header_is_ineligible() {
        let transport = MockTransport::new();
        let mut unit = header_unit(MutationStrategy::Remove);
        unit.target = UnitTarget::Header("X-Unknown".into());

        assert!(executor(&transport).execute(&unit).await.is_ineligible());
        assert_eq!(transport.request_count().await, 0);
    }

    #[test]
    fn empty_payloads() {
        assert!(is_empty_payload(&Value::Null));
        assert!(is_empty_payload(&json!({})));
        assert!(is_empty_payload(&json!("  ")));
        assert!(is_empty_payload(&json!("{}")));
        assert!(!is_empty_payload(&json!({"a": 1})));
        assert!(!is_empty_payload(&json!([])));
    }
}
