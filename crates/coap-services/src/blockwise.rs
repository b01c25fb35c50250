//! Resource handlers that accept blockwise uploads.

use async_trait::async_trait;
use coap_core::config::Block1Settings;
use coap_core::{Method, Request, Response, ResponseBuilder, ResponseCode};

use crate::block1::{Block1Processor, Block1Server};
use crate::error::HandlerError;
use crate::handler::ResourceHandler;
use crate::timer::TimerBinding;

/// Feeds PUT or POST uploads to a [`Block1Server`].
///
/// Other methods get 4.05. The handler owns exactly one transfer at a time,
/// shared by every peer that uploads to it.
pub struct BlockwiseHandler<S> {
    method: Method,
    server: S,
    processor: Block1Processor,
}

impl<S: Block1Server> BlockwiseHandler<S> {
    /// Accept uploads sent with PUT.
    pub fn put(server: S, settings: &Block1Settings) -> Self {
        Self::new(Method::Put, server, settings)
    }

    /// Accept uploads sent with POST.
    pub fn post(server: S, settings: &Block1Settings) -> Self {
        Self::new(Method::Post, server, settings)
    }

    fn new(method: Method, server: S, settings: &Block1Settings) -> Self {
        Self {
            method,
            server,
            processor: Block1Processor::from_settings(settings),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    pub fn processor(&self) -> &Block1Processor {
        &self.processor
    }

    async fn upload(&mut self, request: &Request, builder: ResponseBuilder) -> Response {
        if request.method() != self.method {
            return builder.code(ResponseCode::METHOD_NOT_ALLOWED).build();
        }
        self.processor
            .process_block1_request(&mut self.server, request, builder)
            .await
    }
}

#[async_trait]
impl<S: Block1Server> ResourceHandler for BlockwiseHandler<S> {
    async fn on_put(
        &mut self,
        request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        Ok(self.upload(request, builder).await)
    }

    async fn on_post(
        &mut self,
        request: &Request,
        builder: ResponseBuilder,
    ) -> Result<Response, HandlerError> {
        Ok(self.upload(request, builder).await)
    }

    fn bind_timer(&mut self, binding: TimerBinding) {
        self.processor.bind_timer(binding);
    }

    async fn on_timer(&mut self, generation: u64) {
        self.processor.expire(&mut self.server, generation).await;
    }
}
