pub mod cli;
pub mod core;
pub mod events;
pub mod logging;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod server_info;
pub mod session;
pub mod signals;
pub mod transport;
pub mod ui;
pub mod util;

pub use cli::Cli;
pub use core::run;
pub use events::{EventKind, RawEvent, ServerEvent, ValidationError};
pub use router::{Dispatch, Router};
pub use runtime::Runtime;
pub use session::{EventSink, LogSink, Session, SessionConfig, Termination};
pub use transport::{
  FrostbiteTransport, Transport, TransportConfig, TransportError,
};
pub use util::words;
