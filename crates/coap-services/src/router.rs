//! Routes requests to resource handlers by URI path.

use std::collections::HashMap;

use tokio::sync::mpsc;

use coap_core::{Request, Response, ResponseBuilder, ResponseCode};

use crate::error::EndpointError;
use crate::handler::ResourceHandler;
use crate::timer::{ResourceId, TimerBinding, TimerExpired};

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps paths to handlers and dispatches requests and timer expiries.
pub struct ResourceRouter {
    /// path -> resource id. Paths are stored without leading or trailing `/`.
    paths: HashMap<String, ResourceId>,
    handlers: HashMap<ResourceId, Box<dyn ResourceHandler>>,
    next_id: ResourceId,
    expiry_tx: mpsc::UnboundedSender<TimerExpired>,
}

impl ResourceRouter {
    /// Handlers registered here deliver their timer expiries to `expiry_tx`.
    pub fn new(expiry_tx: mpsc::UnboundedSender<TimerExpired>) -> Self {
        Self {
            paths: HashMap::new(),
            handlers: HashMap::new(),
            next_id: 0,
            expiry_tx,
        }
    }

    /// Register a handler at `path`. A path can only be registered once.
    pub fn register(
        &mut self,
        path: &str,
        mut handler: Box<dyn ResourceHandler>,
    ) -> Result<ResourceId, EndpointError> {
        let path = normalize(path);
        if self.paths.contains_key(&path) {
            return Err(EndpointError::DuplicateResource(path));
        }

        let id = self.next_id;
        self.next_id += 1;
        handler.bind_timer(TimerBinding::new(id, self.expiry_tx.clone()));

        tracing::debug!(path = %path, id, "resource registered");
        self.paths.insert(path, id);
        self.handlers.insert(id, handler);
        Ok(id)
    }

    /// Remove the handler at `path`. Dropping it cancels its timers.
    pub fn unregister(&mut self, path: &str) -> bool {
        let path = normalize(path);
        match self.paths.remove(&path) {
            Some(id) => {
                self.handlers.remove(&id);
                tracing::debug!(path = %path, id, "resource unregistered");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a request. Unknown paths get 4.04; a handler error becomes 5.00.
    pub async fn dispatch(&mut self, request: &Request) -> Response {
        let path = request.path();
        let Some(handler) = self
            .paths
            .get(&path)
            .and_then(|id| self.handlers.get_mut(id))
        else {
            tracing::debug!(path = %path, method = %request.method(), "no resource at path");
            return ResponseBuilder::new().code(ResponseCode::NOT_FOUND).build();
        };

        match handler.handle(request, ResponseBuilder::new()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    path = %path,
                    method = %request.method(),
                    error = %e,
                    "resource handler failed"
                );
                ResponseBuilder::new()
                    .code(ResponseCode::INTERNAL_SERVER_ERROR)
                    .build()
            }
        }
    }

    /// Hand a timer expiry to its handler. Expiries for handlers that have
    /// since been unregistered are dropped.
    pub async fn expire(&mut self, expired: TimerExpired) {
        match self.handlers.get_mut(&expired.resource) {
            Some(handler) => handler.on_timer(expired.generation).await,
            None => tracing::trace!(
                resource = expired.resource,
                "timer expiry for unregistered resource"
            ),
        }
    }
}
