mod command;
mod handle;

pub use {
    command::{CommandSpec, ProcessRole},
    handle::{ProcessHandle, TerminateOutcome},
};
