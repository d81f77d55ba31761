//! Per-call request metadata and its well-known keys.

use std::collections::HashMap;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Calling action, e.g. the handler method name.
pub const ACTION: &str = "action";
/// Name of the driver that executed the statement.
pub const DB_DRIVER: &str = "db_driver";
/// Web framework that served the request.
pub const FRAMEWORK: &str = "framework";
/// Request route.
pub const ROUTE: &str = "route";
/// W3C trace-context parent.
pub const TRACEPARENT: &str = "traceparent";
/// Identity of the running application.
pub const APPLICATION: &str = "application";
/// Controller that handled the request.
pub const CONTROLLER: &str = "controller";

/// Request-scoped values read when annotating a statement.
///
/// Populated by whatever serves the request (an HTTP middleware, a job
/// runner). The commenter only reads it, and the same value is handed to the
/// real driver unchanged.
///
/// ```rust
/// use sql_commenter::{Context, context};
///
/// let ctx = Context::background()
///     .with_route("/users/:id")
///     .with_value(context::FRAMEWORK, "axum");
///
/// assert_eq!(ctx.value(context::ROUTE), Some("/users/:id"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, String>,
    trace: Option<opentelemetry::Context>,
}

impl Context {
    /// An empty context with no values and no trace.
    pub fn background() -> Self {
        Self::default()
    }

    /// An empty context carrying the caller's current OpenTelemetry context.
    pub fn current() -> Self {
        Self::background().with_trace_context(opentelemetry::Context::current())
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_action(self, action: impl Into<String>) -> Self {
        self.with_value(ACTION, action)
    }

    pub fn with_framework(self, framework: impl Into<String>) -> Self {
        self.with_value(FRAMEWORK, framework)
    }

    pub fn with_route(self, route: impl Into<String>) -> Self {
        self.with_value(ROUTE, route)
    }

    pub fn with_controller(self, controller: impl Into<String>) -> Self {
        self.with_value(CONTROLLER, controller)
    }

    /// Attach the OpenTelemetry context the `traceparent` is taken from.
    pub fn with_trace_context(mut self, cx: opentelemetry::Context) -> Self {
        self.trace = Some(cx);
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn trace_context(&self) -> Option<&opentelemetry::Context> {
        self.trace.as_ref()
    }

    /// The `traceparent` of the attached trace, if it has a valid span.
    ///
    /// The trace context is injected into a map carrier with the W3C
    /// propagator and only the `traceparent` field is kept.
    pub fn traceparent(&self) -> Option<String> {
        let cx = self.trace.as_ref()?;
        let mut carrier: HashMap<String, String> = HashMap::new();
        TraceContextPropagator::new().inject_context(cx, &mut carrier);
        carrier.remove(TRACEPARENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};

    fn remote_context(trace_id: &str, span_id: &str) -> opentelemetry::Context {
        let span_context = SpanContext::new(
            TraceId::from_hex(trace_id).unwrap(),
            SpanId::from_hex(span_id).unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        opentelemetry::Context::new().with_remote_span_context(span_context)
    }

    #[test]
    fn test_values() {
        let ctx = Context::background()
            .with_action("list_users")
            .with_framework("axum")
            .with_route("/users")
            .with_controller("users");

        assert_eq!(ctx.value(ACTION), Some("list_users"));
        assert_eq!(ctx.value(FRAMEWORK), Some("axum"));
        assert_eq!(ctx.value(ROUTE), Some("/users"));
        assert_eq!(ctx.value(CONTROLLER), Some("users"));
        assert_eq!(ctx.value("unknown"), None);
    }

    #[test]
    fn test_traceparent_from_remote_span() {
        let ctx = Context::background().with_trace_context(remote_context(
            "4bf92f3577b34da6a3ce929d0e0e4736",
            "00f067aa0ba902b7",
        ));

        assert_eq!(
            ctx.traceparent().as_deref(),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
    }

    #[test]
    fn test_traceparent_absent_without_trace() {
        assert_eq!(Context::background().traceparent(), None);
    }

    #[test]
    fn test_traceparent_absent_without_valid_span() {
        let ctx = Context::background().with_trace_context(opentelemetry::Context::new());
        assert_eq!(ctx.traceparent(), None);
    }
}
