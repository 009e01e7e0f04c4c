use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout as await_timeout;

use crate::events::RawEvent;
use crate::protocol::{Origin, Packet, ProtocolError, read_packet};
use crate::util::words;

const EVENT_QUEUE_DEPTH: usize = 1_024;

/// Failures surfaced by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  /// Establishing, authenticating or re-establishing the link failed.
  #[error("connection error: {0}")]
  Connection(String),
  /// A command could not be completed; the link may be unusable.
  #[error("protocol error: {0}")]
  Protocol(String),
  /// No event arrived within the listen window.
  #[error("no event received within {} ms", .0.as_millis())]
  Timeout(Duration),
  /// The transport was shut down.
  #[error("transport is closed")]
  Closed,
}

/// Connected, authenticated channel to the game server.
///
/// All methods take `&self` so that the event listener and the liveness
/// poller can share one instance.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Open the link for the first time.
  async fn connect(&self) -> Result<(), TransportError>;

  /// Tear down the current link and open a new one.
  async fn reconnect(&self) -> Result<(), TransportError>;

  /// Send one command and return the server's response words.
  async fn send_command(
    &self,
    words: &[String],
  ) -> Result<Vec<String>, TransportError>;

  /// Wait for the next server-pushed event.
  async fn listen(&self) -> Result<RawEvent, TransportError>;

  /// Release the link. Later calls fail with [`TransportError::Closed`].
  async fn close(&self);
}

/// Settings for [`FrostbiteTransport`].
#[derive(Clone)]
pub struct TransportConfig {
  pub host: String,
  pub port: u16,
  pub password: Option<String>,
  /// Deadline for connecting and for each command round trip.
  pub timeout: Duration,
  /// How long a single `listen` call waits before reporting a timeout.
  pub listen_timeout: Duration,
  pub reconnect_attempts: u32,
  pub reconnect_backoff: Duration,
}

impl Default for TransportConfig {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".to_owned(),
      port: 47_200,
      password: None,
      timeout: Duration::from_secs(8),
      listen_timeout: Duration::from_secs(5),
      reconnect_attempts: 3,
      reconnect_backoff: Duration::from_secs(2),
    }
  }
}

impl fmt::Debug for TransportConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TransportConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("password", &self.password.as_ref().map(|_| "<redacted>"))
      .field("timeout", &self.timeout)
      .field("listen_timeout", &self.listen_timeout)
      .field("reconnect_attempts", &self.reconnect_attempts)
      .field("reconnect_backoff", &self.reconnect_backoff)
      .finish()
  }
}

type SharedWriter = Arc<Mutex<BufWriter<OwnedWriteHalf>>>;
type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Vec<String>>>>>;

/// One live TCP connection plus the task reading from it.
struct Link {
  writer: SharedWriter,
  pending: Pending,
  alive: Arc<AtomicBool>,
  reader: JoinHandle<()>,
}

impl Drop for Link {
  fn drop(&mut self) {
    self.reader.abort();
  }
}

impl Link {
  /// Send a request and wait for the matching response.
  ///
  /// Any status other than `OK` is reported as a protocol error.
  async fn exchange(
    &self,
    sequence: u32,
    command: Vec<String>,
    label: &str,
    deadline: Duration,
  ) -> Result<Vec<String>, TransportError> {
    if !self.alive.load(Ordering::Acquire) {
      return Err(TransportError::Protocol("link is down".to_owned()));
    }

    let (tx, rx) = oneshot::channel();
    self.pending.lock().await.insert(sequence, tx);
    // The reader may have cleared `pending` between the check and the insert.
    if !self.alive.load(Ordering::Acquire) {
      self.pending.lock().await.remove(&sequence);
      return Err(TransportError::Protocol("link is down".to_owned()));
    }

    tracing::debug!("--> {}", label);
    let request = Packet::request(sequence, command);
    let written = match await_timeout(
      deadline,
      write_packet(&self.writer, &request),
    )
    .await
    {
      Ok(result) => result,
      Err(_) => Err(TransportError::Protocol(format!(
        "writing `{label}` timed out after {} ms",
        deadline.as_millis()
      ))),
    };
    if let Err(err) = written {
      self.pending.lock().await.remove(&sequence);
      return Err(err);
    }

    let response = match await_timeout(deadline, rx).await {
      Ok(Ok(response)) => response,
      Ok(Err(_)) => {
        return Err(TransportError::Protocol(format!(
          "no usable response to `{label}`"
        )));
      }
      Err(_) => {
        self.pending.lock().await.remove(&sequence);
        return Err(TransportError::Protocol(format!(
          "response to `{label}` timed out after {} ms",
          deadline.as_millis()
        )));
      }
    };
    tracing::debug!("<-- {}", words::render(&response));

    match response.first().map(String::as_str) {
      Some("OK") => Ok(response),
      Some(status) => Err(TransportError::Protocol(format!(
        "server answered `{status}` to `{label}`"
      ))),
      None => Err(TransportError::Protocol(format!(
        "server sent an empty response to `{label}`"
      ))),
    }
  }
}

/// [`Transport`] speaking the Frostbite RCON protocol over TCP.
///
/// A background task owns the read half of the socket. It resolves command
/// responses by sequence number and acknowledges server events before
/// queueing them. The event queue outlives individual connections, so
/// `listen` never observes a link that is being rebuilt.
pub struct FrostbiteTransport {
  config: TransportConfig,
  link: Mutex<Option<Link>>,
  events_tx: mpsc::Sender<RawEvent>,
  events_rx: Mutex<mpsc::Receiver<RawEvent>>,
  sequence: AtomicU32,
  closed: AtomicBool,
}

impl FrostbiteTransport {
  /// Create an unconnected transport; call [`Transport::connect`] next.
  pub fn new(config: TransportConfig) -> Self {
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    Self {
      config,
      link: Mutex::new(None),
      events_tx,
      events_rx: Mutex::new(events_rx),
      sequence: AtomicU32::new(0),
      closed: AtomicBool::new(false),
    }
  }

  fn next_sequence(&self) -> u32 {
    self.sequence.fetch_add(1, Ordering::Relaxed) & 0x3fff_ffff
  }

  fn endpoint(&self) -> String {
    format!("{}:{}", self.config.host, self.config.port)
  }

  async fn open_link(&self) -> Result<Link, TransportError> {
    let endpoint = self.endpoint();
    let stream = await_timeout(
      self.config.timeout,
      TcpStream::connect((self.config.host.as_str(), self.config.port)),
    )
    .await
    .map_err(|_| {
      TransportError::Connection(format!("connect to {endpoint} timed out"))
    })?
    .map_err(|err| {
      TransportError::Connection(format!("connect to {endpoint} failed: {err}"))
    })?;

    stream.set_nodelay(true).map_err(|err| {
      TransportError::Connection(format!("failed to set TCP_NODELAY: {err}"))
    })?;

    let (read_half, write_half) = stream.into_split();
    let writer: SharedWriter = Arc::new(Mutex::new(BufWriter::new(write_half)));
    let pending = Pending::default();
    let alive = Arc::new(AtomicBool::new(true));

    let reader = tokio::spawn(read_loop(
      BufReader::new(read_half),
      Arc::clone(&writer),
      Arc::clone(&pending),
      Arc::clone(&alive),
      self.events_tx.clone(),
    ));

    Ok(Link {
      writer,
      pending,
      alive,
      reader,
    })
  }

  /// Open a link, log in and subscribe to events.
  async fn establish(&self) -> Result<Link, TransportError> {
    let link = self.open_link().await?;

    if let Some(password) = self.config.password.as_deref() {
      link
        .exchange(
          self.next_sequence(),
          vec!["login.plainText".to_owned(), password.to_owned()],
          "login.plainText <redacted>",
          self.config.timeout,
        )
        .await
        .map_err(|err| {
          TransportError::Connection(format!("login failed: {err}"))
        })?;
    }

    link
      .exchange(
        self.next_sequence(),
        vec!["admin.eventsEnabled".to_owned(), "true".to_owned()],
        "admin.eventsEnabled true",
        self.config.timeout,
      )
      .await
      .map_err(|err| {
        TransportError::Connection(format!("failed to enable events: {err}"))
      })?;

    Ok(link)
  }
}

#[async_trait]
impl Transport for FrostbiteTransport {
  async fn connect(&self) -> Result<(), TransportError> {
    let mut slot = self.link.lock().await;
    let link = self.establish().await?;
    *slot = Some(link);
    self.closed.store(false, Ordering::Release);

    tracing::info!(
      endpoint = %self.endpoint(),
      authenticated = self.config.password.is_some(),
      "connected to RCON server"
    );
    Ok(())
  }

  async fn reconnect(&self) -> Result<(), TransportError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TransportError::Closed);
    }

    // Holding the slot for the whole rebuild keeps commands off a half-built link.
    let mut slot = self.link.lock().await;
    slot.take();

    let attempts = self.config.reconnect_attempts.max(1);
    let mut attempt = 1;
    loop {
      match self.establish().await {
        Ok(link) => {
          *slot = Some(link);
          tracing::info!(endpoint = %self.endpoint(), attempt, "reconnected");
          return Ok(());
        }
        Err(err) if attempt >= attempts => return Err(err),
        Err(err) => {
          tracing::warn!(
            attempt,
            attempts,
            error = %err,
            "reconnect attempt failed"
          );
          attempt += 1;
          tokio::time::sleep(self.config.reconnect_backoff).await;
        }
      }
    }
  }

  async fn send_command(
    &self,
    command: &[String],
  ) -> Result<Vec<String>, TransportError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TransportError::Closed);
    }
    if command.is_empty() {
      return Err(TransportError::Protocol(
        "command must not be empty".to_owned(),
      ));
    }

    let slot = self.link.lock().await;
    let link = slot
      .as_ref()
      .ok_or_else(|| TransportError::Protocol("not connected".to_owned()))?;

    link
      .exchange(
        self.next_sequence(),
        command.to_vec(),
        &words::render(command),
        self.config.timeout,
      )
      .await
  }

  async fn listen(&self) -> Result<RawEvent, TransportError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TransportError::Closed);
    }

    let mut events = self.events_rx.lock().await;
    match await_timeout(self.config.listen_timeout, events.recv()).await {
      Ok(Some(event)) => Ok(event),
      Ok(None) => Err(TransportError::Closed),
      Err(_) => Err(TransportError::Timeout(self.config.listen_timeout)),
    }
  }

  async fn close(&self) {
    self.closed.store(true, Ordering::Release);
    if self.link.lock().await.take().is_some() {
      tracing::debug!(endpoint = %self.endpoint(), "connection released");
    }
  }
}

async fn write_packet(
  writer: &Mutex<BufWriter<OwnedWriteHalf>>,
  packet: &Packet,
) -> Result<(), TransportError> {
  let bytes = packet
    .encode()
    .map_err(|err| TransportError::Protocol(err.to_string()))?;

  let mut writer = writer.lock().await;
  writer
    .write_all(&bytes)
    .await
    .map_err(|err| TransportError::Protocol(format!("write failed: {err}")))?;
  writer
    .flush()
    .await
    .map_err(|err| TransportError::Protocol(format!("flush failed: {err}")))
}

async fn read_loop(
  mut reader: BufReader<OwnedReadHalf>,
  writer: SharedWriter,
  pending: Pending,
  alive: Arc<AtomicBool>,
  events: mpsc::Sender<RawEvent>,
) {
  loop {
    let packet = match read_packet(&mut reader).await {
      Ok(Some(packet)) => packet,
      Ok(None) => {
        tracing::debug!("server closed the connection");
        break;
      }
      Err(ProtocolError::Malformed {
        sequence,
        origin,
        is_response,
        source,
      }) => {
        tracing::debug!(sequence, error = %source, "skipping malformed packet");
        if origin == Origin::Server && !is_response {
          let ack = Packet {
            sequence,
            origin,
            is_response: true,
            words: vec!["OK".to_owned()],
          };
          if let Err(err) = write_packet(&writer, &ack).await {
            tracing::warn!(error = %err, "failed to acknowledge event");
            break;
          }
        } else if is_response {
          // Dropping the slot fails the waiting command right away.
          pending.lock().await.remove(&sequence);
        }
        continue;
      }
      Err(err) => {
        tracing::warn!(error = %err, "failed to read packet; dropping link");
        break;
      }
    };

    if packet.is_server_request() {
      let ack = packet.reply(vec!["OK".to_owned()]);
      if let Err(err) = write_packet(&writer, &ack).await {
        tracing::warn!(error = %err, "failed to acknowledge event");
        break;
      }
      tracing::trace!(event = %words::render(&packet.words), "event received");
      if events.send(packet.words).await.is_err() {
        break;
      }
    } else if packet.is_response {
      match pending.lock().await.remove(&packet.sequence) {
        Some(slot) => {
          let _ = slot.send(packet.words);
        }
        None => tracing::trace!(
          sequence = packet.sequence,
          "discarding unsolicited response"
        ),
      }
    } else {
      tracing::trace!(
        sequence = packet.sequence,
        "ignoring client-originated request from server"
      );
    }
  }

  alive.store(false, Ordering::Release);
  pending.lock().await.clear();
}
