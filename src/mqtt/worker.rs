/// MQTT connection lifecycle and the background receive loop
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::codec;
use crate::config::ConnectionConfig;
use crate::error::{DecodeError, WorkerError};
use crate::models::{ConnectionState, WorkerEvent};
use crate::stats::MetricHistories;

const CLIENT_ID: &str = "sensor-monitor";
const REQUEST_QUEUE_CAPACITY: usize = 10;
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands the consumer can issue into a running session.
enum Command {
    /// Reset histories and statistics.
    Clear,
    /// Disconnect and terminate the session task.
    Shutdown,
}

struct Session {
    commands: UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// Background ingestion worker.
///
/// Owns the broker connection on a spawned task, decodes inbound messages,
/// maintains the rolling per-metric histories and delivers `WorkerEvent`s to
/// the consumer over an unbounded ordered channel. The session task is the
/// sole writer of history and statistics; the consumer only ever receives
/// owned snapshots, so no locking is involved.
///
/// At most one session is live per worker. There is no automatic reconnect:
/// after a transport loss the session terminates with a final `Disconnected`
/// status and reconnection is a new explicit `start` call.
pub struct ConnectionWorker {
    config: Option<ConnectionConfig>,
    session: Option<Session>,
}

impl ConnectionWorker {
    pub fn new() -> Self {
        ConnectionWorker {
            config: None,
            session: None,
        }
    }

    /// Set the connection parameters for subsequent sessions.
    ///
    /// Rejected while a session is live: a running worker's configuration is
    /// immutable, reconfiguration is stop-then-start.
    pub fn configure(&mut self, config: ConnectionConfig) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }
        self.config = Some(config);
        Ok(())
    }

    /// Whether a session task is currently live. A session that terminated
    /// on its own (transport loss) no longer counts as running, so a fresh
    /// `start` is allowed without an intervening `stop`.
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    /// Spawn a session with the configured parameters and return the event
    /// receiver for it.
    ///
    /// Each session gets its own channel; events from a previous session can
    /// never bleed into the new receiver. Fails with `AlreadyRunning` while
    /// a session is live so one worker can never hold two connections.
    pub fn start(&mut self) -> Result<UnboundedReceiver<WorkerEvent>, WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }
        let config = self.config.clone().ok_or(WorkerError::NotConfigured)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_session(config, command_rx, event_tx));
        self.session = Some(Session {
            commands: command_tx,
            task,
        });

        Ok(event_rx)
    }

    /// Stop the live session and wait for its task to terminate.
    ///
    /// Idempotent: without a live session this is a no-op, so stopping twice
    /// produces exactly one `Disconnected` status. The wait is bounded by
    /// `STOP_TIMEOUT`; on timeout the task is aborted and the error reported.
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        // Send may fail if the session already terminated on its own; the
        // join below still completes immediately in that case.
        session.commands.send(Command::Shutdown).ok();

        let abort = session.task.abort_handle();
        match timeout(STOP_TIMEOUT, session.task).await {
            Ok(_) => Ok(()),
            Err(_) => {
                abort.abort();
                error!("Worker session did not stop within {:?}", STOP_TIMEOUT);
                Err(WorkerError::StopTimeout(STOP_TIMEOUT))
            }
        }
    }

    /// Reset the live session's histories and statistics. No-op when no
    /// session is live (a fresh session starts empty anyway).
    pub fn clear(&mut self) {
        if let Some(session) = &self.session {
            session.commands.send(Command::Clear).ok();
        }
    }
}

impl Default for ConnectionWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// The session task: connect, subscribe, then multiplex consumer commands
/// against the broker event loop so a stop request is never delayed by
/// absence of traffic.
async fn run_session(
    config: ConnectionConfig,
    mut commands: UnboundedReceiver<Command>,
    events: UnboundedSender<WorkerEvent>,
) {
    let mut histories = MetricHistories::new();

    emit_status(
        &events,
        ConnectionState::Connecting,
        format!("Connecting to {}:{}", config.host(), config.port()),
    );

    let mut options = MqttOptions::new(CLIENT_ID, config.host(), config.port());
    options.set_keep_alive(config.keep_alive());

    let (client, mut event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
    let mut connected = false;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Clear) => {
                    debug!("Clearing history and statistics");
                    histories.clear();
                }
                // A dropped command sender means the worker handle is gone;
                // treat it like a shutdown request.
                Some(Command::Shutdown) | None => {
                    if connected {
                        // Best effort; the transport closes when the event
                        // loop is dropped either way.
                        client.disconnect().await.ok();
                    }
                    break;
                }
            },
            polled = event_loop.poll() => match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        connected = true;
                        info!("Connected to broker {}", config.host());
                        emit_status(
                            &events,
                            ConnectionState::Connected,
                            format!("Connected to broker {}", config.host()),
                        );
                        if let Err(e) = client.subscribe(config.topic(), QoS::AtMostOnce).await {
                            error!("Failed to subscribe to {}: {}", config.topic(), e);
                            emit_status(
                                &events,
                                ConnectionState::Error(format!("Subscribe failed: {}", e)),
                                format!("Failed to subscribe to {}", config.topic()),
                            );
                            break;
                        }
                    } else {
                        error!("Connection refused by broker: {:?}", ack.code);
                        emit_status(
                            &events,
                            ConnectionState::Error(format!("Connection refused ({:?})", ack.code)),
                            "Broker refused the connection".to_string(),
                        );
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handle_message(&publish.payload, &mut histories, &events);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("Broker closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    if connected {
                        warn!("Connection lost: {}", e);
                    } else {
                        error!("Connection failed: {}", e);
                        emit_status(
                            &events,
                            ConnectionState::Error(e.to_string()),
                            format!("Connection failed: {}", e),
                        );
                    }
                    // No automatic reconnect: the consumer decides when to
                    // start a new session.
                    break;
                }
            },
        }
    }

    emit_status(
        &events,
        ConnectionState::Disconnected,
        "Disconnected from broker".to_string(),
    );
}

/// Decode one inbound message and deliver it with fresh statistics.
///
/// Decode failures are diagnostics, not session errors: a malformed payload
/// is dropped with a warning, an unparsable metric field skips its
/// statistics update while the rest of the message is still delivered.
fn handle_message(
    payload: &[u8],
    histories: &mut MetricHistories,
    events: &UnboundedSender<WorkerEvent>,
) {
    let sample = match codec::decode(payload) {
        Ok(sample) => sample,
        Err(e) => {
            warn!("Dropping message: {}", e);
            return;
        }
    };

    for (name, reading) in [
        ("temperature", &sample.temperature),
        ("pressure", &sample.pressure),
        ("humidity", &sample.humidity),
    ] {
        if reading.value.is_none() {
            warn!("{}", DecodeError::FieldInvalid(name));
        }
    }

    debug!(
        "Received sample: timestamp={}, temp={}, press={}, hum={}",
        sample.timestamp,
        sample.temperature.display,
        sample.pressure.display,
        sample.humidity.display
    );

    let stats = histories.record(&sample);
    events.send(WorkerEvent::Data { sample, stats }).ok();
}

fn emit_status(events: &UnboundedSender<WorkerEvent>, state: ConnectionState, message: String) {
    // The receiver may already be gone (consumer shut down first); the
    // session still terminates cleanly on its own.
    events.send(WorkerEvent::Status { state, message }).ok();
}
