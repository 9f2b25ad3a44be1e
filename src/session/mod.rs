//! Session screen logic
//!
//! - `timer`: elapsed time display for the running session
//! - `shell`: the start/stop state machine, form, entry list, and delete gate
//! - `command`: line commands for the interactive front-end

mod command;
mod shell;
mod timer;

pub use command::{is_confirmed, Command, HELP};
pub use shell::{AppShell, SessionState, ShellError, DELETE_ERROR, LOAD_ERROR, SAVE_ERROR};
pub use timer::{format_elapsed, SessionTimer, TimerHandle, TICK, ZERO_ELAPSED};
