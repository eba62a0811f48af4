//! The session state machine
//!
//! One live session owns one background receive task. Caller sends go
//! through the transport's serialized writer; the receive task alone
//! produces the output stream, so ordering falls out of the frame order.
//!
//! ```text
//! [Connecting] --dial ok-->         [Configuring] --setup ack--> [Ready]
//! [Ready]      --send chunk/text--> [InTurn]
//! [InTurn]     --turn complete-->   [Ready]
//! [InTurn]     --tool calls-->      [AwaitingToolResponse] --response sent--> [InTurn]
//! [Ready|InTurn|AwaitingToolResponse] --retryable drop--> [Reconnecting] --> [Configuring]
//! [any]        --close / fatal-->   [Closed]
//! ```

use crate::demux::Demultiplexer;
use crate::error::SessionError;
use crate::options::SessionOptions;
use crate::wire::{
    ClientContentEnvelope, RealtimeInputEnvelope, ServerFrame, SetupEnvelope, ToolResponseEnvelope,
};
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};
use voxstream_core::{FinishReason, MediaChunk, ModelDelta, OutputRecord, SessionSetup, ToolResponse};
use voxstream_transport::{backoff_delay, Transport, TransportConfig, TransportError};

/// Trailing zero-PCM frames sent by `end_input`. Three 100 ms frames put
/// 300 ms of observed silence on the wire, beyond any plausible server
/// silence threshold.
const SILENCE_FLUSH_FRAMES: usize = 3;
const SILENCE_FRAME_DURATION: Duration = Duration::from_millis(100);

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Configuring,
    Ready,
    InTurn,
    AwaitingToolResponse,
    Reconnecting,
    Closed,
}

#[derive(Debug)]
struct SessionInner {
    transport: RwLock<Arc<Transport>>,
    transport_config: TransportConfig,
    options: SessionOptions,
    setup: SessionSetup,
    /// Serialized setup envelope, replayed verbatim on every reconnect.
    setup_frame: String,
    state: watch::Sender<SessionState>,
    error: watch::Sender<Option<Arc<SessionError>>>,
    /// Outbound chunk count; continues across reconnects.
    chunks_sent: AtomicU64,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl SessionInner {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Transition unless already closed.
    fn set_state(&self, next: SessionState) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Closed || *state == next {
                false
            } else {
                trace!(from = ?*state, to = ?next, "session state change");
                *state = next;
                true
            }
        });
    }

    /// Latch the first fatal error; later ones are logged and dropped so
    /// the channel never blocks the receive loop.
    fn latch_error(&self, err: SessionError) -> Arc<SessionError> {
        let err = Arc::new(err);
        let latched = err.clone();
        self.error.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(latched);
                true
            } else {
                debug!(error = %err, "error channel already latched, dropping");
                false
            }
        });
        err
    }

    async fn current_transport(&self) -> Arc<Transport> {
        self.transport.read().await.clone()
    }

    /// Idempotent teardown, safe from any task.
    async fn shutdown(&self) {
        let closing = self.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
        if !closing {
            return;
        }
        debug!("closing session");
        self.cancel.cancel();
        self.current_transport().await.close().await;
        self.done.cancel();
    }
}

/// A live streaming session.
///
/// Sends may be issued from any task; the output stream is consumed by
/// exactly one.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
    output: std::sync::Mutex<Option<mpsc::Receiver<OutputRecord>>>,
}

impl Session {
    /// Dial the service, send the setup envelope, and wait for the
    /// acknowledgement before returning a ready session.
    #[instrument(skip_all, fields(model = %setup.model))]
    pub async fn connect(
        transport_config: TransportConfig,
        setup: SessionSetup,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let setup_frame = serde_json::to_string(&SetupEnvelope::from_setup(&setup))?;
        let (state_tx, _) = watch::channel(SessionState::Connecting);
        let cancel = CancellationToken::new();

        let transport = match establish(
            &transport_config,
            &setup_frame,
            options.setup_timeout,
            &cancel,
            &state_tx,
        )
        .await
        {
            Ok(transport) => transport,
            Err(err) => {
                state_tx.send_replace(SessionState::Closed);
                return Err(err);
            }
        };
        state_tx.send_replace(SessionState::Ready);

        let (output_tx, output_rx) = mpsc::channel(options.output_capacity);
        let (error_tx, _) = watch::channel(None);

        let inner = Arc::new(SessionInner {
            transport: RwLock::new(transport),
            transport_config,
            options,
            setup,
            setup_frame,
            state: state_tx,
            error: error_tx,
            chunks_sent: AtomicU64::new(0),
            cancel,
            done: CancellationToken::new(),
        });

        tokio::spawn(receive_loop(inner.clone(), output_tx));

        Ok(Self {
            inner,
            output: std::sync::Mutex::new(Some(output_rx)),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Observe lifecycle transitions.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// The immutable setup this session was created with.
    pub fn setup(&self) -> &SessionSetup {
        &self.inner.setup
    }

    /// The finite output record stream, in frame arrival order. The
    /// receiver moves out on first call; the stream ends when the session
    /// closes.
    pub fn output_stream(&self) -> OutputStream {
        let receiver = match self.output.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        match receiver {
            Some(rx) => OutputStream { rx },
            None => {
                warn!("output stream already taken, returning a terminated stream");
                let (_, rx) = mpsc::channel(1);
                OutputStream { rx }
            }
        }
    }

    /// Latched single-value channel carrying the first fatal (or skipped
    /// single-frame) error.
    pub fn error_channel(&self) -> watch::Receiver<Option<Arc<SessionError>>> {
        self.inner.error.subscribe()
    }

    pub fn last_error(&self) -> Option<Arc<SessionError>> {
        self.inner.error.borrow().clone()
    }

    /// Completes when the session reaches Closed.
    pub async fn done(&self) {
        self.inner.done.cancelled().await;
    }

    /// Base64-encode a media chunk and send it as realtime input.
    pub async fn send_chunk(&self, chunk: MediaChunk) -> Result<(), SessionError> {
        self.ensure_open()?;
        let data = voxstream_audio::encode(&chunk.payload)?;
        self.send_envelope(&RealtimeInputEnvelope::audio(data))
            .await?;

        let total = self.inner.chunks_sent.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(
            sequence = chunk.sequence,
            is_last = chunk.is_last,
            session_total = total,
            "sent media chunk"
        );
        self.note_caller_input();
        Ok(())
    }

    /// Send a user text part; `turn_complete = true` elicits an immediate
    /// response.
    pub async fn send_text(
        &self,
        text: impl Into<String>,
        turn_complete: bool,
    ) -> Result<(), SessionError> {
        self.send_envelope(&ClientContentEnvelope::user_text(text, turn_complete))
            .await?;
        self.note_caller_input();
        Ok(())
    }

    /// Signal the end of the caller's turn without new content.
    pub async fn complete_turn(&self) -> Result<(), SessionError> {
        self.send_envelope(&ClientContentEnvelope::turn_complete())
            .await?;
        self.note_caller_input();
        Ok(())
    }

    /// Like [`complete_turn`](Self::complete_turn), preceded by a burst of
    /// silence frames so server-side turn detection fires for pre-recorded
    /// or synthesized input. Skipped when the caller disabled automatic
    /// activity detection.
    pub async fn end_input(&self) -> Result<(), SessionError> {
        if !self.inner.setup.vad_disabled {
            let frame = voxstream_audio::silence(SILENCE_FRAME_DURATION);
            let data = voxstream_audio::encode(&frame)?;
            for _ in 0..SILENCE_FLUSH_FRAMES {
                self.send_envelope(&RealtimeInputEnvelope::audio(data.clone()))
                    .await?;
            }
            trace!(frames = SILENCE_FLUSH_FRAMES, "flushed trailing silence");
        }
        self.complete_turn().await
    }

    /// Inject additional system-instruction-style context mid-session.
    pub async fn send_system_context(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send_envelope(&ClientContentEnvelope::user_text(text, false))
            .await
    }

    /// Answer a single tool call.
    pub async fn send_tool_response(
        &self,
        id: impl Into<String>,
        result: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.send_tool_responses(vec![ToolResponse::ok(id, result)])
            .await
    }

    /// Answer one or more tool calls in a single envelope.
    pub async fn send_tool_responses(
        &self,
        responses: Vec<ToolResponse>,
    ) -> Result<(), SessionError> {
        if responses.is_empty() {
            return Ok(());
        }
        self.send_envelope(&ToolResponseEnvelope::from_responses(&responses))
            .await?;
        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::AwaitingToolResponse {
                *state = SessionState::InTurn;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    /// Idempotent: stops the receive loop, closes the transport, ends the
    /// output stream, and marks the session Closed.
    pub async fn close(&self) {
        self.inner.shutdown().await;
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::SessionClosed)
        } else {
            Ok(())
        }
    }

    async fn send_envelope<T: Serialize>(&self, envelope: &T) -> Result<(), SessionError> {
        self.wait_while_reconnecting().await?;
        let transport = self.inner.current_transport().await;
        transport.send(envelope).await.map_err(|err| match err {
            TransportError::AlreadyClosed => SessionError::SessionClosed,
            other => SessionError::Transport(other),
        })
    }

    /// Sends issued mid-reconnect park here until the session is usable
    /// again (or closed for good).
    async fn wait_while_reconnecting(&self) -> Result<(), SessionError> {
        let mut state_rx = self.inner.state.subscribe();
        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                SessionState::Closed => return Err(SessionError::SessionClosed),
                SessionState::Connecting
                | SessionState::Configuring
                | SessionState::Reconnecting => {
                    if state_rx.changed().await.is_err() {
                        return Err(SessionError::SessionClosed);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn note_caller_input(&self) {
        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Ready {
                *state = SessionState::InTurn;
                true
            } else {
                false
            }
        });
    }
}

/// The finite sequence of output records for one session.
pub struct OutputStream {
    rx: mpsc::Receiver<OutputRecord>,
}

impl OutputStream {
    /// Next record, or `None` once the session has closed.
    pub async fn next(&mut self) -> Option<OutputRecord> {
        self.rx.recv().await
    }
}

impl futures::Stream for OutputStream {
    type Item = OutputRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Dial, replay the setup frame, and wait for `setupComplete`. The caller
/// flips the state to Ready once the transport is installed, so senders
/// parked on the state channel never race a half-swapped transport.
async fn establish(
    config: &TransportConfig,
    setup_frame: &str,
    setup_timeout: Duration,
    cancel: &CancellationToken,
    state: &watch::Sender<SessionState>,
) -> Result<Arc<Transport>, SessionError> {
    let transport = Arc::new(Transport::connect(config).await?);
    state.send_replace(SessionState::Configuring);

    transport.send_raw(setup_frame).await?;

    match tokio::time::timeout(setup_timeout, await_setup_ack(&transport, cancel)).await {
        Ok(Ok(())) => {
            debug!("setup acknowledged");
            Ok(transport)
        }
        Ok(Err(err)) => {
            transport.close().await;
            Err(err)
        }
        Err(_) => {
            transport.close().await;
            Err(SessionError::SetupTimeout(setup_timeout))
        }
    }
}

async fn await_setup_ack(
    transport: &Transport,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    loop {
        let value = match transport.receive(cancel).await {
            Ok(value) => value,
            Err(TransportError::Frame(err)) => {
                warn!(%err, "malformed frame before setup acknowledgement");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_value::<ServerFrame>(value) {
            Ok(frame) if frame.setup_complete.is_some() => return Ok(()),
            Ok(_) => warn!("ignoring frame before setup acknowledgement"),
            Err(err) => warn!(%err, "frame with unexpected shape before setup acknowledgement"),
        }
    }
}

enum LoopExit {
    Canceled,
    ConsumerGone,
    Fatal(SessionError),
}

async fn receive_loop(inner: Arc<SessionInner>, output: mpsc::Sender<OutputRecord>) {
    let mut demux = Demultiplexer::new(inner.setup.pricing);
    let mut last_was_terminal = false;

    let exit = run_receive(&inner, &output, &mut demux, &mut last_was_terminal).await;
    match exit {
        LoopExit::Canceled => debug!("receive loop canceled"),
        LoopExit::ConsumerGone => debug!("output consumer dropped, ending session"),
        LoopExit::Fatal(err) => {
            let err = inner.latch_error(err);
            error!(%err, "session terminated");
            if !last_was_terminal {
                // Best effort: a stalled consumer must not keep the
                // teardown from finishing.
                let _ = output.try_send(OutputRecord::Terminal {
                    finish_reason: FinishReason::Error,
                    cost: None,
                });
            }
        }
    }

    inner.shutdown().await;
    // Dropping `output` here closes the stream.
}

async fn run_receive(
    inner: &Arc<SessionInner>,
    output: &mpsc::Sender<OutputRecord>,
    demux: &mut Demultiplexer,
    last_was_terminal: &mut bool,
) -> LoopExit {
    loop {
        let transport = inner.current_transport().await;
        let value = match transport.receive(&inner.cancel).await {
            Ok(value) => value,
            Err(TransportError::Canceled) => return LoopExit::Canceled,
            Err(TransportError::Frame(err)) => {
                // One bad frame does not invalidate the transport.
                warn!(%err, "skipping malformed frame");
                inner.latch_error(SessionError::Protocol(err.to_string()));
                continue;
            }
            Err(err) => {
                if err.is_retryable() && inner.options.auto_reconnect {
                    warn!(%err, "transport dropped, reconnecting");
                    match reconnect(inner).await {
                        Ok(()) => continue,
                        Err(reconnect_err) => return LoopExit::Fatal(reconnect_err),
                    }
                }
                return LoopExit::Fatal(err.into());
            }
        };

        let frame: ServerFrame = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "skipping frame with unexpected shape");
                inner.latch_error(SessionError::Protocol(err.to_string()));
                continue;
            }
        };

        let outcome = match demux.demux(frame) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, "skipping undemuxable frame");
                inner.latch_error(err);
                continue;
            }
        };
        if outcome.setup_complete {
            debug!("unexpected setup acknowledgement mid-session");
        }

        for record in outcome.records {
            apply_record_state(inner, &record);
            *last_was_terminal = matches!(
                record,
                OutputRecord::Terminal { .. }
                    | OutputRecord::Delta(ModelDelta {
                        finish_reason: Some(_),
                        ..
                    })
            );
            if output.send(record).await.is_err() {
                return LoopExit::ConsumerGone;
            }
        }
    }
}

fn apply_record_state(inner: &Arc<SessionInner>, record: &OutputRecord) {
    match record {
        OutputRecord::ToolCalls { .. } => inner.set_state(SessionState::AwaitingToolResponse),
        OutputRecord::Interrupted => inner.set_state(SessionState::Ready),
        OutputRecord::Terminal { .. } => inner.set_state(SessionState::Ready),
        OutputRecord::Delta(delta) if delta.finish_reason.is_some() => {
            inner.set_state(SessionState::Ready)
        }
        _ => {}
    }
}

/// Bounded re-dial with exponential backoff and verbatim setup replay.
/// In-flight tool responses are never re-sent; the caller observed their
/// error already.
async fn reconnect(inner: &Arc<SessionInner>) -> Result<(), SessionError> {
    inner.set_state(SessionState::Reconnecting);
    inner.current_transport().await.close().await;

    let tries = inner.options.max_reconnect_tries;
    let mut last_failure = String::new();

    for attempt in 0..tries {
        let delay = backoff_delay(attempt);
        debug!(attempt, ?delay, "reconnect backoff");
        tokio::select! {
            _ = inner.cancel.cancelled() => return Err(SessionError::Canceled),
            _ = tokio::time::sleep(delay) => {}
        }

        match establish(
            &inner.transport_config,
            &inner.setup_frame,
            inner.options.setup_timeout,
            &inner.cancel,
            &inner.state,
        )
        .await
        {
            Ok(transport) => {
                *inner.transport.write().await = transport;
                inner.set_state(SessionState::Ready);
                info!(attempt, "session reconnected");
                return Ok(());
            }
            Err(err) => {
                let retryable = match &err {
                    SessionError::Transport(transport_err) => transport_err.is_retryable(),
                    SessionError::SetupTimeout(_) => true,
                    _ => false,
                };
                if !retryable {
                    return Err(err);
                }
                warn!(%err, attempt, "reconnect attempt failed");
                last_failure = err.to_string();
                inner.set_state(SessionState::Reconnecting);
            }
        }
    }

    Err(SessionError::ReconnectExhausted {
        attempts: tries,
        last: last_failure,
    })
}
