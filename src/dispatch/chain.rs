//! Per-route stage chain and request lifecycle.
//!
//! # Responsibilities
//! - Build the stage list once per route at registration
//! - Run middlewares, validation and the handler for each request
//! - Map handler replies and failures to exactly one response
//! - Record the outcome in analytics, including cancelled requests
//!
//! # Design Decisions
//! - Stages are an immutable `Vec`, no per-request allocation of the chain
//! - Recording lives in a drop guard, so a request future dropped mid-flight
//!   (client gone, timeout layer) is still counted, as status 499

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::analytics::{RequestMetadata, RouteAnalytics};
use crate::dispatch::error::{DispatchError, ErrorResponder, HandlerError};
use crate::dispatch::handler::{Flow, Middleware, Reply, RouteHandler};
use crate::dispatch::request::DispatchRequest;
use crate::observability::metrics;
use crate::routing::matcher::PathParams;
use crate::routing::{RouteDefinition, RouteInfo};
use crate::validation::{validate_response, RouteSchemas};

/// Status recorded for requests dropped before a response was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Validating,
    ValidationFailed,
    Dispatching,
    HandlerOk,
    HandlerError,
    ResponseSent,
    AnalyticsRecorded,
}

impl RequestPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestPhase::Received => "received",
            RequestPhase::Validating => "validating",
            RequestPhase::ValidationFailed => "validation_failed",
            RequestPhase::Dispatching => "dispatching",
            RequestPhase::HandlerOk => "handler_ok",
            RequestPhase::HandlerError => "handler_error",
            RequestPhase::ResponseSent => "response_sent",
            RequestPhase::AnalyticsRecorded => "analytics_recorded",
        }
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub enum Stage {
    Middleware(Arc<dyn Middleware>),
    Validator(Arc<RouteSchemas>),
    Dispatcher,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Middleware(_) => f.write_str("Middleware"),
            Stage::Validator(_) => f.write_str("Validator"),
            Stage::Dispatcher => f.write_str("Dispatcher"),
        }
    }
}

/// Everything needed to serve one route.
pub struct DispatchChain {
    route: Arc<RouteInfo>,
    stages: Vec<Stage>,
    handler: Arc<dyn RouteHandler>,
    schemas: Option<Arc<RouteSchemas>>,
    analytics: Option<Arc<RouteAnalytics>>,
    responder: Arc<dyn ErrorResponder>,
}

impl fmt::Debug for DispatchChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchChain")
            .field("route", &self.route.to_string())
            .field("stages", &self.stages)
            .field("analytics", &self.analytics.is_some())
            .finish()
    }
}

impl DispatchChain {
    pub fn build(
        def: &RouteDefinition,
        route: Arc<RouteInfo>,
        analytics: Option<Arc<RouteAnalytics>>,
        responder: Arc<dyn ErrorResponder>,
    ) -> Self {
        let schemas = def.validate.clone().map(Arc::new);

        let mut stages: Vec<Stage> = def
            .middlewares
            .iter()
            .cloned()
            .map(Stage::Middleware)
            .collect();
        if let Some(schemas) = schemas.as_ref().filter(|s| s.validates_request()) {
            stages.push(Stage::Validator(schemas.clone()));
        }
        stages.push(Stage::Dispatcher);

        Self {
            route,
            stages,
            handler: def.handler.clone(),
            schemas,
            analytics,
            responder,
        }
    }

    pub fn route(&self) -> &Arc<RouteInfo> {
        &self.route
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Serve one matched request. `start` is when the request was received.
    pub async fn handle(
        &self,
        request: Request<Body>,
        params: PathParams,
        body_limit: usize,
        start: Instant,
    ) -> Response {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = tracing::info_span!(
            "dispatch",
            method = %request.method(),
            route = %self.route.path,
            request_id = %request_id,
        );

        let mut flight = InFlight {
            analytics: self.analytics.clone(),
            method: request.method().to_string(),
            path: self.route.path.clone(),
            start,
            phase: RequestPhase::Received,
        };

        async move {
            let (mut response, errored) = self
                .run(request, params, body_limit, request_id.clone(), &mut flight)
                .await;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().entry(REQUEST_ID_HEADER).or_insert(value);
            }
            flight.complete(response.status(), errored);
            response
        }
        .instrument(span)
        .await
    }

    /// Returns the response and whether the request counts as errored.
    async fn run(
        &self,
        request: Request<Body>,
        params: PathParams,
        body_limit: usize,
        request_id: String,
        flight: &mut InFlight,
    ) -> (Response, bool) {
        let mut req = match DispatchRequest::from_http(
            request,
            self.route.clone(),
            params,
            request_id,
            body_limit,
        )
        .await
        {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Request body could not be read");
                return (self.responder.dispatch_error(&self.route, &e), true);
            }
        };

        for stage in &self.stages {
            match stage {
                Stage::Middleware(middleware) => match middleware.handle(req).await {
                    Flow::Continue(next) => req = next,
                    Flow::Respond(response) => {
                        tracing::debug!(status = %response.status(), "Middleware responded");
                        return (response, false);
                    }
                },
                Stage::Validator(schemas) => {
                    flight.advance(RequestPhase::Validating);
                    if let Err(failure) = req.validate(schemas) {
                        flight.advance(RequestPhase::ValidationFailed);
                        tracing::debug!(issues = failure.issues.len(), "Request failed validation");
                        return (failure.into_response(), true);
                    }
                }
                Stage::Dispatcher => break,
            }
        }

        flight.advance(RequestPhase::Dispatching);
        match self.handler.call(req).await {
            Ok(reply) => {
                flight.advance(RequestPhase::HandlerOk);
                match self.reply(reply) {
                    Ok(response) => (response, false),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to produce response");
                        (self.responder.dispatch_error(&self.route, &e), true)
                    }
                }
            }
            Err(e) => {
                flight.advance(RequestPhase::HandlerError);
                match &e {
                    HandlerError::Internal(source) => {
                        tracing::error!(error = %source, "Handler failed");
                    }
                    HandlerError::Status { status, message } => {
                        tracing::debug!(status = %status, message = %message, "Handler rejected request");
                    }
                }
                (self.responder.handler_error(&self.route, e), true)
            }
        }
    }

    fn reply(&self, reply: Reply) -> Result<Response, DispatchError> {
        match reply {
            Reply::Sent(response) => Ok(response),
            Reply::Empty => Ok(StatusCode::NO_CONTENT.into_response()),
            Reply::Value(value) => self.serialize(value),
        }
    }

    fn serialize(&self, value: Value) -> Result<Response, DispatchError> {
        let value = match &self.schemas {
            Some(schemas) => validate_response(schemas, value).map_err(|issues| {
                DispatchError::ResponseContract {
                    route: self.route.to_string(),
                    issues,
                }
            })?,
            None => value,
        };
        let body = serde_json::to_vec(&value)?;
        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response())
    }
}

/// Tracks one request until its outcome is recorded.
struct InFlight {
    analytics: Option<Arc<RouteAnalytics>>,
    method: String,
    path: String,
    start: Instant,
    phase: RequestPhase,
}

impl InFlight {
    fn advance(&mut self, phase: RequestPhase) {
        tracing::trace!(from = %self.phase, to = %phase, "Request phase");
        self.phase = phase;
    }

    fn complete(&mut self, status: StatusCode, errored: bool) {
        self.advance(RequestPhase::ResponseSent);
        self.record(status.as_u16(), errored);
        self.advance(RequestPhase::AnalyticsRecorded);
    }

    fn record(&self, status: u16, errored: bool) {
        let Some(analytics) = &self.analytics else {
            return;
        };
        let elapsed = self.start.elapsed();
        let meta = RequestMetadata::new(self.method.as_str(), self.path.as_str(), status, elapsed)
            .with_error(errored);
        metrics::record_request(&meta);
        analytics.record_request(meta);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.phase != RequestPhase::AnalyticsRecorded {
            tracing::debug!(
                method = %self.method,
                route = %self.path,
                phase = %self.phase,
                "Request dropped before completion"
            );
            self.record(CLIENT_CLOSED_REQUEST, true);
        }
    }
}
