//! Requests, responses, and their builders.
//!
//! Messages are immutable once built. Builders take `self` by value and
//! `build()` consumes them, so a builder cannot be mutated after it has
//! produced a message.

use std::sync::Arc;

use bytes::Bytes;

use crate::block::BlockInfo;
use crate::body::{BlockSource, Body};
use crate::code::{Method, ResponseCode};
use crate::option::{number, CoapOption, Options};

// ── Request ──────────────────────────────────────────────────────────────────

/// A decoded incoming (or outgoing) request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    options: Options,
    body: Bytes,
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Resource path from the URI_PATH options, e.g. `"files/upload"`.
    pub fn path(&self) -> String {
        self.options.uri_path()
    }
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    options: Options,
    body: Bytes,
}

impl RequestBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            options: Options::new(),
            body: Bytes::new(),
        }
    }

    /// Append one URI_PATH option per `/`-separated segment.
    pub fn path(mut self, path: &str) -> Self {
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            self.options.push(CoapOption::string(number::URI_PATH, segment));
        }
        self
    }

    pub fn option(mut self, option: CoapOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn block1(self, info: BlockInfo) -> Self {
        self.option(CoapOption::block1(info))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            options: self.options,
            body: self.body,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response.
#[derive(Debug, Clone)]
pub struct Response {
    code: ResponseCode,
    options: Options,
    body: Body,
    autogenerate_blockwise: bool,
}

impl Response {
    pub fn code(&self) -> ResponseCode {
        self.code
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Whether the endpoint should fill in the blockwise options itself.
    pub fn autogenerate_blockwise(&self) -> bool {
        self.autogenerate_blockwise
    }

    /// Reopen as a builder carrying the same code, options, body and flag.
    pub fn into_builder(self) -> ResponseBuilder {
        ResponseBuilder {
            code: self.code,
            options: self.options,
            body: self.body,
            autogenerate_blockwise: self.autogenerate_blockwise,
        }
    }
}

/// Accumulates a response. Defaults to 2.05 Content with no options or body.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    code: ResponseCode,
    options: Options,
    body: Body,
    autogenerate_blockwise: bool,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            code: ResponseCode::CONTENT,
            options: Options::new(),
            body: Body::Empty,
            autogenerate_blockwise: false,
        }
    }

    pub fn code(mut self, code: ResponseCode) -> Self {
        self.code = code;
        self
    }

    /// Append an option. Duplicates are kept; the consumer decides what
    /// a repeated number means.
    pub fn option(mut self, option: CoapOption) -> Self {
        self.options.push(option);
        self
    }

    /// Copy every option from `options`, in order.
    pub fn add_all(mut self, options: &Options) -> Self {
        self.options.extend(options.iter().cloned());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Bytes(body.into());
        self
    }

    pub fn body_source(mut self, source: Arc<dyn BlockSource>) -> Self {
        self.body = Body::Source(source);
        self
    }

    pub fn autogenerate_blockwise(mut self, enabled: bool) -> Self {
        self.autogenerate_blockwise = enabled;
        self
    }

    pub fn build(self) -> Response {
        Response {
            code: self.code,
            options: self.options,
            body: self.body,
            autogenerate_blockwise: self.autogenerate_blockwise,
        }
    }
}
