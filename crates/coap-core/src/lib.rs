//! coap-core: CoAP value types, the block option codec, and engine configuration.
//! The async blockwise engine in `coap-services` is built on this crate.

pub mod block;
pub mod body;
pub mod code;
pub mod config;
pub mod message;
pub mod option;

pub use block::BlockInfo;
pub use body::{adjust_chunk_size, BlockError, BlockSource, Body, BytesSource};
pub use code::{Method, ResponseCode};
pub use config::{Block1Settings, ConfigError, EndpointSettings, EngineConfig};
pub use message::{Request, RequestBuilder, Response, ResponseBuilder};
pub use option::{CoapOption, OptionValue, Options};
