//! Block1 receive state machine.
//!
//! Each blockwise resource owns one [`Block1Processor`]. Every incoming
//! block falls into one of these cases:
//!
//! ```text
//!   first block, clean start          on_start + on_data
//!   first and only block              on_start + on_data + on_end(true)
//!   first block while still active    on_end(false) + on_start + on_data
//!   block 2..N-1                      on_data
//!   last block                        on_data + on_end(true)
//!   repeat of the last accepted block (ignored)
//!   any other offset                  on_end(false), 4.02 Bad Option
//! ```
//!
//! A transfer that sees no new block for the configured timeout is ended
//! with `on_end(false)` when its timer expiry reaches [`Block1Processor::expire`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use coap_core::config::Block1Settings;
use coap_core::option::number;
use coap_core::{BlockInfo, Options, Request, Response, ResponseBuilder, ResponseCode};

use crate::error::HandlerError;
use crate::timer::{TimerBinding, TransferTimer, DEFAULT_TRANSFER_TIMEOUT};

/// Receiver of a blockwise upload.
///
/// Callbacks run on the protocol loop, one at a time.
#[async_trait]
pub trait Block1Server: Send {
    /// A new transfer begins.
    async fn on_start(&mut self, options: &Options) -> Result<(), HandlerError>;

    /// A new block was accepted.
    ///
    /// Return `Some` to answer this block yourself; an error-class code
    /// aborts the transfer. `None` lets the endpoint acknowledge the block.
    async fn on_data(
        &mut self,
        options: &Options,
        data: &[u8],
    ) -> Result<Option<Response>, HandlerError>;

    /// The transfer ended, successfully or not. Called once per transfer,
    /// except when `on_start` failed or `on_data` cut the transfer short
    /// with its own error response.
    async fn on_end(
        &mut self,
        options: &Options,
        success: bool,
    ) -> Result<Option<Response>, HandlerError>;
}

/// Why a transfer ended abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAbort {
    /// A new first block arrived while a transfer was active.
    Restarted,
    /// A block matched neither the expected nor the last accepted offset.
    OutOfOrder { expected: u64, actual: u64 },
    /// No block arrived within the transfer timeout.
    TimedOut,
    /// A callback returned an error.
    HandlerFailed,
    /// A callback answered with an error-class response.
    ErrorResponse(ResponseCode),
}

impl fmt::Display for TransferAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restarted => f.write_str("restarted"),
            Self::OutOfOrder { expected, actual } => {
                write!(f, "out of order (expected offset {expected}, got {actual})")
            }
            Self::TimedOut => f.write_str("timed out"),
            Self::HandlerFailed => f.write_str("handler failed"),
            Self::ErrorResponse(code) => write!(f, "error response {code}"),
        }
    }
}

/// Progress of the current transfer.
///
/// When not started, offsets are zero and the timer is disarmed.
#[derive(Debug, Default)]
pub struct TransferState {
    started: bool,
    current_offset: u64,
    expected_next_offset: u64,
    generation: u64,
    timer: TransferTimer,
}

impl TransferState {
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Offset of the last accepted block.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Offset the next new block must carry.
    pub fn expected_next_offset(&self) -> u64 {
        self.expected_next_offset
    }

    /// Bumped on every reset and every timer re-arm. Expiries carrying an
    /// older generation are ignored.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    fn accept(&mut self, offset: u64, len: usize, timeout: Duration) {
        self.current_offset = offset;
        self.expected_next_offset += len as u64;
        self.generation += 1;
        self.timer.arm(timeout, self.generation);
    }

    fn reset(&mut self) {
        self.timer.cancel();
        self.started = false;
        self.current_offset = 0;
        self.expected_next_offset = 0;
        self.generation += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Callback {
    Start,
    Data,
    End,
}

impl Callback {
    fn name(self) -> &'static str {
        match self {
            Self::Start => "on_start",
            Self::Data => "on_data",
            Self::End => "on_end",
        }
    }
}

struct CallbackFailure {
    callback: Callback,
    error: HandlerError,
}

/// Drives one resource's Block1 transfers.
#[derive(Debug)]
pub struct Block1Processor {
    state: TransferState,
    timeout: Duration,
    slow_callback: Option<Duration>,
    /// Options of the most recent block, handed to `on_end` on timeout.
    last_options: Options,
}

impl Default for Block1Processor {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSFER_TIMEOUT)
    }
}

impl Block1Processor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: TransferState::default(),
            timeout,
            slow_callback: Some(Duration::from_secs(1)),
            last_options: Options::new(),
        }
    }

    pub fn from_settings(settings: &Block1Settings) -> Self {
        let mut processor = Self::new(settings.transfer_timeout());
        processor.slow_callback = settings.slow_callback_warning();
        processor
    }

    /// Route timer expiries to the protocol loop. Until bound, stalled
    /// transfers are only ended by a restart.
    pub fn bind_timer(&mut self, binding: TimerBinding) {
        self.state.timer.bind(binding);
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Process one block of an upload and produce the response for it.
    ///
    /// `builder` is used for the responses the engine generates itself:
    /// 4.00 when the BLOCK1 option is missing, and the autogenerated
    /// acknowledgement when no callback supplied a response.
    pub async fn process_block1_request<S: Block1Server + ?Sized>(
        &mut self,
        server: &mut S,
        request: &Request,
        builder: ResponseBuilder,
    ) -> Response {
        let options = request.options();
        let Some(block) = BlockInfo::from_options(options, number::BLOCK1) else {
            tracing::debug!("blockwise request without a block1 option");
            return builder.code(ResponseCode::BAD_REQUEST).build();
        };
        tracing::debug!(
            offset = block.start_offset,
            more = block.more_blocks,
            len = request.body().len(),
            expected = self.state.expected_next_offset,
            "block1 option"
        );
        self.last_options = options.clone();

        match self.run(server, options, block, request.body()).await {
            Ok(Some(response)) => response,
            Ok(None) => builder.autogenerate_blockwise(true).build(),
            Err(failure) => self.fail(server, options, failure).await,
        }
    }

    async fn run<S: Block1Server + ?Sized>(
        &mut self,
        server: &mut S,
        options: &Options,
        block: BlockInfo,
        data: &[u8],
    ) -> Result<Option<Response>, CallbackFailure> {
        let mut response = None;

        if block.is_first() {
            if self.state.started {
                self.abort(TransferAbort::Restarted);
                response = self.call_end(server, options, false).await?;
            }
            self.call_start(server, options).await?;
            self.state.started = true;
        }

        if block.start_offset == self.state.expected_next_offset {
            if let Some(r) = self.call_data(server, options, data).await? {
                response = Some(r);
            }
            let timeout = self.timeout;
            self.state.accept(block.start_offset, data.len(), timeout);
        } else if block.start_offset == self.state.current_offset {
            tracing::debug!(offset = block.start_offset, "duplicate block1, ignoring");
        } else {
            let cause = TransferAbort::OutOfOrder {
                expected: self.state.expected_next_offset,
                actual: block.start_offset,
            };
            tracing::debug!(%cause, "incorrect block1 start offset");
            self.abort(cause);
            let ended = self.call_end(server, options, false).await?;
            response = Some(ended.unwrap_or_else(|| {
                ResponseBuilder::new()
                    .code(ResponseCode::BAD_OPTION)
                    .build()
            }));
        }

        // An error response from the handler always wins over continuing.
        if let Some(code) = response
            .as_ref()
            .map(Response::code)
            .filter(ResponseCode::is_error)
        {
            self.abort(TransferAbort::ErrorResponse(code));
        }

        if !block.more_blocks && self.state.started {
            let total = self.state.expected_next_offset;
            self.state.reset();
            tracing::debug!(bytes = total, "block1 transfer complete");
            if let Some(r) = self.call_end(server, options, true).await? {
                response = Some(r);
            }
        }

        Ok(response)
    }

    /// Abort after a callback error.
    ///
    /// `on_end(false)` follows unless the failing callback was `on_end`
    /// itself or `on_start`, whose transfer never began. Its response, if
    /// any, is the answer; otherwise 5.00.
    async fn fail<S: Block1Server + ?Sized>(
        &mut self,
        server: &mut S,
        options: &Options,
        failure: CallbackFailure,
    ) -> Response {
        tracing::warn!(
            callback = failure.callback.name(),
            error = %failure.error,
            "block1 callback failed, aborting transfer"
        );
        self.abort(TransferAbort::HandlerFailed);

        let mut response = None;
        if failure.callback == Callback::Data {
            match self.call_end(server, options, false).await {
                Ok(ended) => response = ended,
                Err(f) => tracing::warn!(error = %f.error, "on_end failed while aborting transfer"),
            }
        }

        response.unwrap_or_else(|| {
            ResponseBuilder::new()
                .code(ResponseCode::INTERNAL_SERVER_ERROR)
                .build()
        })
    }

    /// Handle a timer expiry. Returns `true` if it ended a transfer.
    ///
    /// Expiries from an earlier generation, or arriving while idle, are
    /// ignored. Any response `on_end` returns is discarded: nobody is
    /// waiting for it.
    pub async fn expire<S: Block1Server + ?Sized>(&mut self, server: &mut S, generation: u64) -> bool {
        if !self.state.started || generation != self.state.generation {
            tracing::trace!(
                generation,
                current = self.state.generation,
                "stale block1 timer expiry"
            );
            return false;
        }

        tracing::debug!("block1 transfer timer expired");
        self.abort(TransferAbort::TimedOut);

        let options = std::mem::take(&mut self.last_options);
        match self.call_end(server, &options, false).await {
            Ok(Some(r)) => {
                tracing::debug!(code = %r.code(), "discarding response to timed-out transfer")
            }
            Ok(None) => {}
            Err(f) => tracing::warn!(error = %f.error, "on_end failed after transfer timeout"),
        }
        true
    }

    fn abort(&mut self, cause: TransferAbort) {
        if self.state.started {
            tracing::info!(
                %cause,
                current_offset = self.state.current_offset,
                expected = self.state.expected_next_offset,
                "block1 transfer aborted"
            );
        }
        self.state.reset();
    }

    async fn call_start<S: Block1Server + ?Sized>(
        &self,
        server: &mut S,
        options: &Options,
    ) -> Result<(), CallbackFailure> {
        let started = Instant::now();
        let result = server.on_start(options).await;
        self.check_elapsed(Callback::Start, started);
        result.map_err(|error| CallbackFailure {
            callback: Callback::Start,
            error,
        })
    }

    async fn call_data<S: Block1Server + ?Sized>(
        &self,
        server: &mut S,
        options: &Options,
        data: &[u8],
    ) -> Result<Option<Response>, CallbackFailure> {
        let started = Instant::now();
        let result = server.on_data(options, data).await;
        self.check_elapsed(Callback::Data, started);
        result.map_err(|error| CallbackFailure {
            callback: Callback::Data,
            error,
        })
    }

    async fn call_end<S: Block1Server + ?Sized>(
        &self,
        server: &mut S,
        options: &Options,
        success: bool,
    ) -> Result<Option<Response>, CallbackFailure> {
        let started = Instant::now();
        let result = server.on_end(options, success).await;
        self.check_elapsed(Callback::End, started);
        result.map_err(|error| CallbackFailure {
            callback: Callback::End,
            error,
        })
    }

    /// Warn if a callback ran longer than the configured limit. Returns
    /// whether it did.
    fn check_elapsed(&self, callback: Callback, started: Instant) -> bool {
        let Some(limit) = self.slow_callback else {
            return false;
        };
        let elapsed = started.elapsed();
        if elapsed <= limit {
            return false;
        }
        tracing::warn!(
            callback = callback.name(),
            ?elapsed,
            limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            "slow block1 callback"
        );
        true
    }
}
