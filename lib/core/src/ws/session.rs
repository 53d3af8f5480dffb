use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::context::{ConnectionGuard, ContextBuilder};
use crate::engine::{Engine, EngineResponse};
use crate::pipeline::error::PipelineErrorVariant;
use crate::pipeline::{normalize, parser};
use crate::request::ConnectionInfo;
use crate::shared_state::SharedState;
use crate::ws::protocol::{ClientMessage, CloseCode, CloseFrame, Outbound, ServerMessage};

/// Outbound queue depth per connection. Slow consumers exert backpressure
/// on their own operations, not on other connections.
const OUTBOUND_BUFFER: usize = 64;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opened, `connection_init` not received yet.
    Connecting,
    /// Handshake accepted, operations may start.
    Admitted,
    /// Teardown in progress.
    Closing,
    /// Fully closed; pending sends are dropped.
    Closed,
}

struct SessionState<Ctx> {
    phase: Phase,
    context: Option<Arc<Ctx>>,
    /// Active operations by client-supplied id. Dropping a sender cancels
    /// that operation's pump task.
    operations: HashMap<String, mpsc::Sender<()>>,
    last_heartbeat: Instant,
    init_stop: Option<oneshot::Sender<()>>,
    keepalive_stop: Option<oneshot::Sender<()>>,
}

/// One GraphQL over WebSocket connection: admission handshake, operation
/// bookkeeping, and cancellation. The transport glue feeds raw text frames
/// into [`Session::on_message`] and drains the outbound receiver returned
/// by [`Session::open`]; background tasks require a tokio runtime.
pub struct Session<E: Engine> {
    state: Arc<SharedState<E>>,
    guard: Arc<dyn ConnectionGuard>,
    context_builder: Arc<dyn ContextBuilder<E::Context>>,
    info: ConnectionInfo,
    inner: Arc<Mutex<SessionState<E::Context>>>,
    outbound: mpsc::Sender<Outbound>,
}

impl<E: Engine> Session<E> {
    /// Opens a session over a freshly upgraded connection and spawns its
    /// admission-timeout and keepalive tasks. The returned receiver yields
    /// every outbound message and, at most once, a close intent.
    pub fn open(
        state: Arc<SharedState<E>>,
        info: ConnectionInfo,
        guard: Arc<dyn ConnectionGuard>,
        context_builder: Arc<dyn ContextBuilder<E::Context>>,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (init_stop_tx, init_stop_rx) = oneshot::channel();
        let (keepalive_stop_tx, keepalive_stop_rx) = oneshot::channel();

        let inner = Arc::new(Mutex::new(SessionState {
            phase: Phase::Connecting,
            context: None,
            operations: HashMap::new(),
            last_heartbeat: Instant::now(),
            init_stop: Some(init_stop_tx),
            keepalive_stop: Some(keepalive_stop_tx),
        }));

        let config = &state.config.websocket;
        tokio::spawn(connection_init_timeout(
            inner.clone(),
            outbound_tx.clone(),
            init_stop_rx,
            config.connection_init_timeout,
        ));
        tokio::spawn(keepalive(
            inner.clone(),
            outbound_tx.clone(),
            keepalive_stop_rx,
            config.keepalive_interval,
            config.keepalive_timeout,
        ));

        debug!("WebSocket session opened");

        (
            Self {
                state,
                guard,
                context_builder,
                info,
                inner,
                outbound: outbound_tx,
            },
            outbound_rx,
        )
    }

    /// Processes one raw text frame from the connection. Responses and
    /// streamed results are queued on the outbound channel.
    pub async fn on_message(&self, raw: &str) {
        if matches!(self.phase(), Phase::Closing | Phase::Closed) {
            return;
        }

        let message: ClientMessage = match sonic_rs::from_str(raw) {
            Ok(message) => message,
            Err(err) => {
                error!("failed to parse client message to JSON: {}", err);
                self.emit(CloseCode::BadRequest("Invalid message received from client").into())
                    .await;
                self.shutdown();
                return;
            }
        };

        trace!("type" = message.as_ref(), "received client message");

        match message {
            ClientMessage::ConnectionInit { payload } => self.handle_connection_init(payload).await,
            ClientMessage::Ping {} => {
                // respond with pong always, regardless of admission state;
                // the peer may use protocol pings to probe liveness
                self.inner.lock().last_heartbeat = Instant::now();
                self.emit(ServerMessage::Pong {}.into()).await;
            }
            ClientMessage::Pong {} => {
                self.inner.lock().last_heartbeat = Instant::now();
            }
            ClientMessage::Subscribe { id, payload } => self.handle_subscribe(id, payload).await,
            ClientMessage::Complete { id } => self.handle_complete(&id),
        }
    }

    /// Tears the session down: cancels every active operation, stops the
    /// background tasks, and drops all pending sends.
    pub fn close(&self) {
        self.shutdown();
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// Number of operations currently running on this connection.
    pub fn active_operations(&self) -> usize {
        self.inner.lock().operations.len()
    }

    async fn handle_connection_init(&self, payload: Option<sonic_rs::Value>) {
        let phase = self.phase();
        match phase {
            Phase::Connecting => {}
            Phase::Admitted => {
                self.emit(CloseCode::TooManyInitialisationRequests.into()).await;
                self.shutdown();
                return;
            }
            Phase::Closing | Phase::Closed => return,
        }

        if let Err(err) = self.guard.admit(&self.info, payload.as_ref()).await {
            debug!("connection rejected by guard: {}", err.reason);
            self.emit(CloseCode::Forbidden(err.reason).into()).await;
            self.shutdown();
            return;
        }

        let context = match self.context_builder.build(&self.info).await {
            Ok(context) => Arc::new(context),
            Err(err) => {
                error!("failed to build the connection context: {}", err);
                self.emit(CloseCode::InternalServerError.into()).await;
                self.shutdown();
                return;
            }
        };

        {
            let mut state = self.inner.lock();
            // the init timeout may have closed the connection while the
            // guard or context builder was suspended
            if state.phase != Phase::Connecting {
                return;
            }
            state.phase = Phase::Admitted;
            state.context = Some(context);
            if let Some(tx) = state.init_stop.take() {
                let _ = tx.send(());
            }
        }

        self.emit(ServerMessage::ConnectionAck {}.into()).await;
        debug!("connection acknowledged");
    }

    async fn handle_subscribe(&self, id: String, payload: sonic_rs::Value) {
        // traffic before admission closes the connection
        let admitted = {
            let state = self.inner.lock();
            (state.phase, state.context.clone())
        };
        let context = match admitted {
            (Phase::Admitted, Some(context)) => context,
            _ => {
                self.emit(CloseCode::Unauthorized.into()).await;
                self.shutdown();
                return;
            }
        };

        // duplicate ids are a protocol violation, not a silent replace
        let cancel_rx = {
            let mut state = self.inner.lock();
            if state.operations.contains_key(&id) {
                None
            } else {
                let (cancel_tx, cancel_rx) = mpsc::channel::<()>(1);
                state.operations.insert(id.clone(), cancel_tx);
                Some(cancel_rx)
            }
        };
        let Some(cancel_rx) = cancel_rx else {
            self.emit(CloseCode::SubscriberAlreadyExists(id).into()).await;
            self.shutdown();
            return;
        };

        tokio::spawn(run_operation(
            self.state.clone(),
            self.inner.clone(),
            self.outbound.clone(),
            id,
            payload,
            context,
            cancel_rx,
        ));
    }

    fn handle_complete(&self, id: &str) {
        let removed = self.inner.lock().operations.remove(id);
        match removed {
            Some(cancel_tx) => {
                trace!(id = %id, "client requested subscription cancellation");
                let _ = cancel_tx.try_send(());
            }
            None => {
                // completing an unknown id is a benign race with server-side
                // completion, not a protocol violation
                debug!(id = %id, "complete received for unknown operation id");
            }
        }
    }

    async fn emit(&self, out: Outbound) {
        emit_to(&self.inner, &self.outbound, out).await;
    }

    fn shutdown(&self) {
        shutdown_state(&self.inner);
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Queues an outbound unit unless the session already left the admitted
/// phases; once closing, pending sends are dropped.
async fn emit_to<Ctx>(
    inner: &Mutex<SessionState<Ctx>>,
    outbound: &mpsc::Sender<Outbound>,
    out: Outbound,
) -> bool {
    let closed = matches!(inner.lock().phase, Phase::Closing | Phase::Closed);
    if closed {
        return false;
    }
    outbound.send(out).await.is_ok()
}

fn shutdown_state<Ctx>(inner: &Mutex<SessionState<Ctx>>) {
    let mut state = inner.lock();
    if state.phase == Phase::Closed {
        return;
    }
    state.phase = Phase::Closing;
    if !state.operations.is_empty() {
        trace!(
            "session closing, cancelling {} active operation(s)",
            state.operations.len()
        );
    }
    // dropping the senders cancels every operation pump, which performs
    // its own cleanup on the way out
    state.operations.clear();
    if let Some(tx) = state.init_stop.take() {
        let _ = tx.send(());
    }
    if let Some(tx) = state.keepalive_stop.take() {
        let _ = tx.send(());
    }
    state.phase = Phase::Closed;
}

/// Removes an operation from the active set when its task ends, however it
/// ends. The operation counts as closed only once this has run.
struct OperationGuard<Ctx> {
    inner: Arc<Mutex<SessionState<Ctx>>>,
    id: String,
}

impl<Ctx> Drop for OperationGuard<Ctx> {
    fn drop(&mut self) {
        self.inner.lock().operations.remove(&self.id);
        trace!(id = %self.id, "operation removed from active operations");
    }
}

/// One operation's lifetime: normalize the subscribe payload, parse it,
/// execute, and pump results until completion or cancellation.
async fn run_operation<E: Engine>(
    state: Arc<SharedState<E>>,
    inner: Arc<Mutex<SessionState<E::Context>>>,
    outbound: mpsc::Sender<Outbound>,
    id: String,
    payload: sonic_rs::Value,
    context: Arc<E::Context>,
    mut cancel_rx: mpsc::Receiver<()>,
) {
    let _guard = OperationGuard {
        inner: inner.clone(),
        id: id.clone(),
    };

    let request = match normalize::normalize_subscribe_payload(&payload) {
        Ok(request) => request,
        Err(variant) => {
            emit_to(&inner, &outbound, variant.into_server_message(&id).into()).await;
            return;
        }
    };

    let parsed = match parser::parse_operation_with_cache(&state, &request).await {
        Ok(parsed) => parsed,
        Err(variant) => {
            emit_to(&inner, &outbound, variant.into_server_message(&id).into()).await;
            return;
        }
    };

    trace!(
        id = %id,
        operation_type = parsed.operation_type.as_str(),
        "starting operation"
    );

    let response = match state.engine.execute(&request, &context).await {
        Ok(response) => response,
        Err(err) => {
            error!(id = %id, "engine reported an internal failure: {}", err);
            let variant = PipelineErrorVariant::EngineInternal(err);
            emit_to(&inner, &outbound, variant.into_server_message(&id).into()).await;
            return;
        }
    };

    match response {
        EngineResponse::Single(output) => {
            emit_to(&inner, &outbound, ServerMessage::next(&id, output.result).into()).await;
            emit_to(&inner, &outbound, ServerMessage::complete(&id).into()).await;
        }
        EngineResponse::Stream(mut stream) => {
            trace!(id = %id, "subscription started");
            let mut cancelled = false;

            loop {
                tokio::select! {
                    maybe_item = stream.next() => {
                        match maybe_item {
                            Some(result) => {
                                if !emit_to(&inner, &outbound, ServerMessage::next(&id, result).into()).await {
                                    // connection gone, stop pumping
                                    cancelled = true;
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = cancel_rx.recv() => {
                        cancelled = true;
                        break;
                    }
                }
            }

            if cancelled {
                trace!(id = %id, "subscription cancelled");
                // no complete for cancelled subscriptions: they were either
                // cancelled by the client or dropped with the connection
            } else {
                trace!(id = %id, "subscription completed");
                emit_to(&inner, &outbound, ServerMessage::complete(&id).into()).await;
            }
        }
    }
}

/// Closes connections whose handshake never arrives.
async fn connection_init_timeout<Ctx>(
    inner: Arc<Mutex<SessionState<Ctx>>>,
    outbound: mpsc::Sender<Outbound>,
    mut stop_rx: oneshot::Receiver<()>,
    timeout: Duration,
) {
    tokio::select! {
        _ = tokio::time::sleep(timeout) => {
            let pending = matches!(inner.lock().phase, Phase::Connecting);
            if pending {
                debug!("connection init timeout, closing connection");
                emit_to(&inner, &outbound, CloseCode::ConnectionInitTimeout.into()).await;
                shutdown_state(&inner);
            }
        }
        _ = &mut stop_rx => {}
    }
}

/// Pings the peer on an interval and closes the connection once it stays
/// silent past the keepalive timeout.
async fn keepalive<Ctx>(
    inner: Arc<Mutex<SessionState<Ctx>>>,
    outbound: mpsc::Sender<Outbound>,
    mut stop_rx: oneshot::Receiver<()>,
    interval: Duration,
    timeout: Duration,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let stale = {
                    let state = inner.lock();
                    Instant::now().duration_since(state.last_heartbeat) > timeout
                };
                if stale {
                    debug!("keepalive timeout, closing connection");
                    // the peer stopped answering pings, which the WebSocket
                    // spec files under protocol error
                    emit_to(
                        &inner,
                        &outbound,
                        Outbound::Close(CloseFrame {
                            code: 1002,
                            reason: "Keepalive timeout".to_string(),
                        }),
                    )
                    .await;
                    shutdown_state(&inner);
                    return;
                }
                if !emit_to(&inner, &outbound, ServerMessage::Ping {}.into()).await {
                    warn!("failed to queue keepalive ping, stopping keepalive task");
                    return;
                }
            }
            _ = &mut stop_rx => return,
        }
    }
}

impl PipelineErrorVariant {
    fn into_server_message(self, id: &str) -> ServerMessage {
        ServerMessage::error(id, vec![self.into()])
    }
}
