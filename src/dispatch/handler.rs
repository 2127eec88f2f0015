//! Handler and middleware contracts.
//!
//! Both are implemented for plain async functions, so routes can be declared
//! with `async fn` items:
//!
//! ```ignore
//! async fn get_user(req: DispatchRequest) -> HandlerResult {
//!     let id: u64 = req.param_as("id")?;
//!     Ok(Reply::Value(json!({ "id": id })))
//! }
//! ```

use std::future::Future;

use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::error::HandlerError;
use crate::dispatch::request::DispatchRequest;

/// What a handler produced.
#[derive(Debug)]
pub enum Reply {
    /// The handler built the response itself; it is passed through untouched.
    Sent(Response),
    /// A value to check against the response schema and send as 200 JSON.
    Value(Value),
    /// Nothing to send; answered with 204.
    Empty,
}

impl Reply {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        serde_json::to_value(value)
            .map(Reply::Value)
            .map_err(HandlerError::internal)
    }

    pub fn sent(response: impl IntoResponse) -> Self {
        Reply::Sent(response.into_response())
    }
}

pub type HandlerResult = Result<Reply, HandlerError>;

pub trait RouteHandler: Send + Sync + 'static {
    fn call(&self, request: DispatchRequest) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(DispatchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: DispatchRequest) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request))
    }
}

/// Outcome of a middleware.
#[derive(Debug)]
pub enum Flow {
    /// Hand the (possibly modified) request to the next stage.
    Continue(DispatchRequest),
    /// Stop here and send this response.
    Respond(Response),
}

pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, request: DispatchRequest) -> BoxFuture<'static, Flow>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(DispatchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    fn handle(&self, request: DispatchRequest) -> BoxFuture<'static, Flow> {
        Box::pin(self(request))
    }
}
