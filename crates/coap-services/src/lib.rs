//! coap-services: the async blockwise engine.
//!
//! Handlers, the Block1 receive state machine, abandonment timers, and the
//! protocol loop that serializes every state transition onto one task.

pub mod block1;
pub mod blockwise;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod router;
pub mod timer;

pub use block1::{Block1Processor, Block1Server, TransferAbort, TransferState};
pub use blockwise::BlockwiseHandler;
pub use endpoint::{finalize_response, Endpoint};
pub use error::{EndpointError, HandlerError};
pub use handler::ResourceHandler;
pub use router::ResourceRouter;
pub use timer::{ResourceId, TimerBinding, TimerExpired, TransferTimer, DEFAULT_TRANSFER_TIMEOUT};
