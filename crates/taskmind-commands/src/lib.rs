//! Command modules for task-mind.
//!
//! Each module turns one high-level verb into a sequence of CDP calls and
//! returns a [`CommandResult`]. Failures are returned, never raised: the
//! result carries an [`ErrorKind`] so callers can decide whether to retry.
//!
//! Every module declares a [`CapabilityDescriptor`]; [`CommandRegistry`]
//! collects them into the static capability list used by recipe validation
//! and the consistency audit.

mod command;
mod content;
mod effects;
mod error;
mod interact;
mod navigation;
mod page;
mod poll;
mod registry;
mod schema;
mod screenshot;
mod scroll;
mod wait;
mod zoom;

#[cfg(test)]
mod testing;

pub use command::Command;
pub use content::{GetContentCommand, GetTitleCommand, GetUrlCommand, StatusCommand};
pub use effects::{ClearEffectsCommand, EffectCommand, EffectKind};
pub use error::CommandError;
pub use interact::{ClickCommand, ScriptCommand};
pub use navigation::NavigateCommand;
pub use poll::Poller;
pub use registry::CommandRegistry;
pub use schema::{CapabilityDescriptor, FieldSpec, ValueType};
pub use screenshot::ScreenshotCommand;
pub use scroll::{ScrollCommand, ScrollToTextCommand};
pub use wait::WaitCommand;
pub use zoom::ZoomCommand;

pub use taskmind_cdp::{CommandFailure, CommandResult, ErrorKind, Invoker};
