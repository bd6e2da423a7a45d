use crate::session::Session;
use anyhow::Result;
use std::io::Write;

/// Conventional exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// The interpreter never turns a non-zero code into process termination, it only
/// reports it back to the caller of [`crate::Interpreter::run`].
pub type ExitCode = i32;

/// Exit code of a command that failed while operating on the file handle.
pub const FAILURE: ExitCode = 1;

/// Exit code of a command whose arguments could not be parsed.
pub const USAGE: ExitCode = 2;

/// Exit code reported for a verb no factory recognizes.
pub const NOT_FOUND: ExitCode = 127;

/// Object-safe trait for any command that can be executed by the interpreter.
///
/// This is implemented by built-ins via a blanket impl.
pub trait ExecutableCommand {
    /// Executes the command, writing its response line to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a verb and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided verb and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;

    /// Attempt to create a command whose single argument is the raw rest of the line.
    ///
    /// Returns `None` by default, in which case the caller falls back to [`Self::try_create`].
    fn try_create_raw(&self, _name: &str, _tail: &[u8]) -> Option<Box<dyn ExecutableCommand>> {
        None
    }
}
