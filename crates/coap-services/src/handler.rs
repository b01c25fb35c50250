//! Resource handler trait.
//!
//! The contract between the endpoint (which owns the protocol loop) and
//! the code serving one resource path. Each method receives the request
//! and a fresh [`ResponseBuilder`]; whatever it builds is the answer.

use async_trait::async_trait;
use coap_core::{Method, Request, Response, ResponseBuilder, ResponseCode};

use crate::error::HandlerError;
use crate::timer::TimerBinding;

fn method_not_allowed(builder: ResponseBuilder) -> Result<Response, HandlerError> {
    Ok(builder.code(ResponseCode::METHOD_NOT_ALLOWED).build())
}

/// Serves one resource. Every method defaults to 4.05 Method Not Allowed.
///
/// Handlers are only ever called from the protocol loop, one request at a
/// time, so `&mut self` needs no further locking.
#[async_trait]
pub trait ResourceHandler: Send {
    async fn on_get(
        &mut self,
        _request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        method_not_allowed(builder)
    }

    async fn on_post(
        &mut self,
        _request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        method_not_allowed(builder)
    }

    async fn on_put(
        &mut self,
        _request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        method_not_allowed(builder)
    }

    async fn on_delete(
        &mut self,
        _request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        method_not_allowed(builder)
    }

    /// Called once at registration with the queue this handler's timers
    /// must deliver to.
    fn bind_timer(&mut self, _binding: TimerBinding) {}

    /// One of this handler's timers fired.
    async fn on_timer(&mut self, _generation: u64) {}

    /// Dispatch by request method.
    async fn handle(
        &mut self,
        request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        match request.method() {
            Method::Get => self.on_get(request, builder).await,
            Method::Post => self.on_post(request, builder).await,
            Method::Put => self.on_put(request, builder).await,
            Method::Delete => self.on_delete(request, builder).await,
        }
    }
}
