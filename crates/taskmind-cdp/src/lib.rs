//! Chrome DevTools Protocol session layer for task-mind.
//!
//! One [`Session`] owns one WebSocket connection to one browser target.
//!
//! ```text
//! ┌──────────────────┐   invoke / events   ┌───────────┐   WebSocket (CDP)   ┌──────────┐
//! │ command modules  │ ◄─────────────────► │  Session  │ ◄──(proxy tunnel)──► │  target  │
//! └──────────────────┘                     └───────────┘                      └──────────┘
//! ```
//!
//! ## Behaviour
//!
//! - Requests are multiplexed by id; many calls may be in flight at once.
//! - A call that exceeds its deadline fails with [`CdpError::Timeout`] and the
//!   connection stays up.
//! - When the socket drops, in-flight calls fail with
//!   [`CdpError::ConnectionLost`] and the session reconnects with exponential
//!   backoff. Once the attempt budget is spent the session is dead and every
//!   call fails with [`CdpError::SessionDead`].
//! - Events are delivered to subscribers in transport order.
//!
//! ```rust,ignore
//! use taskmind_cdp::{Invoker, Session};
//! use taskmind_config::SessionConfig;
//!
//! let session = Session::connect(SessionConfig::default()).await?;
//! let title = session
//!     .call("Runtime.evaluate", json!({"expression": "document.title"}), None)
//!     .await?;
//! ```

mod backoff;
mod error;
mod events;
mod invoker;
mod protocol;
mod proxy;
mod result;
mod session;
mod transport;

pub use backoff::{Backoff, ReconnectPolicy};
pub use error::{CdpError, ErrorKind};
pub use events::EventStream;
pub use invoker::Invoker;
pub use protocol::{CdpErrorResponse, CdpMessage, CdpRequest, Event, PageInfo};
pub use result::{CommandFailure, CommandResult};
pub use session::{Session, SessionState};
