//! The protocol loop and its handle.
//!
//! One tokio task owns the [`ResourceRouter`] and with it every handler and
//! every transfer. Requests arrive on a bounded command queue, timer
//! expiries on an unbounded one, and the loop takes them one at a time. A
//! timer firing and a block being processed can therefore never interleave.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use coap_core::block::DEFAULT_BLOCK_SIZE;
use coap_core::option::number;
use coap_core::{BlockInfo, CoapOption, EngineConfig, Method, Request, Response, ResponseCode};

use crate::error::EndpointError;
use crate::handler::ResourceHandler;
use crate::router::ResourceRouter;
use crate::timer::{ResourceId, TimerExpired};

enum Command {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Register {
        path: String,
        handler: Box<dyn ResourceHandler>,
        reply: oneshot::Sender<Result<ResourceId, EndpointError>>,
    },
    Unregister {
        path: String,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Handle to a running protocol loop. Cheap to clone.
#[derive(Clone)]
pub struct Endpoint {
    tx: mpsc::Sender<Command>,
}

impl Endpoint {
    /// Start the protocol loop on the current runtime.
    ///
    /// The loop runs until [`Endpoint::shutdown`] is called or every handle
    /// has been dropped.
    pub fn spawn(config: &EngineConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.endpoint.queue_depth.max(1));
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let protocol = ProtocolLoop {
            router: ResourceRouter::new(expiry_tx),
            commands: rx,
            expiries: expiry_rx,
        };
        let task = tokio::spawn(protocol.run());
        (Self { tx }, task)
    }

    pub async fn register(
        &self,
        path: &str,
        handler: impl ResourceHandler + 'static,
    ) -> Result<ResourceId, EndpointError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Register {
            path: path.to_owned(),
            handler: Box::new(handler),
            reply,
        })
        .await?;
        rx.await.map_err(|_| EndpointError::Closed)?
    }

    /// Returns whether a handler was registered at `path`.
    pub async fn unregister(&self, path: &str) -> Result<bool, EndpointError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unregister {
            path: path.to_owned(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| EndpointError::Closed)
    }

    /// Called by the transport for every received request.
    pub async fn deliver_request(&self, request: Request) -> Result<Response, EndpointError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Request { request, reply }).await?;
        rx.await.map_err(|_| EndpointError::Closed)
    }

    /// Stop the loop. Requests queued behind the shutdown, and any sent
    /// afterwards, fail with [`EndpointError::Closed`].
    pub async fn shutdown(&self) -> Result<(), EndpointError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), EndpointError> {
        self.tx.send(command).await.map_err(|_| EndpointError::Closed)
    }
}

struct ProtocolLoop {
    router: ResourceRouter,
    commands: mpsc::Receiver<Command>,
    expiries: mpsc::UnboundedReceiver<TimerExpired>,
}

impl ProtocolLoop {
    async fn run(mut self) {
        tracing::info!("protocol loop started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("all endpoint handles dropped, protocol loop exiting");
                        break;
                    };
                    if !self.handle(command).await {
                        tracing::info!("protocol loop shutting down");
                        break;
                    }
                }

                // The router holds a sender, so this never yields None.
                Some(expired) = self.expiries.recv() => {
                    self.router.expire(expired).await;
                }
            }
        }
        // Dropping the router cancels every armed timer.
        self.commands.close();
    }

    /// Returns false once the loop should stop.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Request { request, reply } => {
                let response = self.router.dispatch(&request).await;
                let response = finalize_response(&request, response);
                if reply.send(response).is_err() {
                    tracing::debug!(path = %request.path(), "requester went away before the response");
                }
            }
            Command::Register {
                path,
                handler,
                reply,
            } => {
                let _ = reply.send(self.router.register(&path, handler));
            }
            Command::Unregister { path, reply } => {
                let _ = reply.send(self.router.unregister(&path));
            }
            Command::Shutdown => return false,
        }
        true
    }
}

/// Fill in what a response with the autogenerate flag still lacks.
///
/// For PUT and POST this echoes the request's BLOCK1 option (1024-byte
/// blocks if the request had none) and picks 2.31 Continue when more blocks
/// follow, 2.04 Changed otherwise. The flag is cleared. Responses without
/// the flag pass through untouched.
pub fn finalize_response(request: &Request, response: Response) -> Response {
    if !response.autogenerate_blockwise() {
        return response;
    }
    let builder = response.into_builder().autogenerate_blockwise(false);
    match request.method() {
        Method::Put | Method::Post => {
            let block = BlockInfo::from_options(request.options(), number::BLOCK1)
                .unwrap_or_else(|| BlockInfo::new(0, false, DEFAULT_BLOCK_SIZE));
            let code = if block.more_blocks {
                ResponseCode::CONTINUE
            } else {
                ResponseCode::CHANGED
            };
            builder.code(code).option(CoapOption::block1(block)).build()
        }
        Method::Get | Method::Delete => builder.build(),
    }
}
