use crate::command::{CommandFactory, ExecutableCommand, ExitCode, FAILURE, USAGE};
use crate::handle::{HandleError, OpenMode, Whence};
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::convert::Infallible;
use std::io::Write;
use std::str::FromStr;

/// Built-in commands known to the interpreter at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// against the [`Session`].
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "open" or "seek".
    fn name() -> &'static str;

    /// Argument synopsis printed after `Usage:` when parsing fails.
    fn usage() -> &'static str;

    /// Build the command straight from the raw rest of the line, bypassing argh.
    ///
    /// Only verbs that take their argument verbatim override this.
    fn from_raw_tail(_tail: &[u8]) -> Option<Self> {
        None
    }

    /// Executes the command, writing exactly one response line on success.
    ///
    /// An `Err` is turned into its one-line response by the blanket [`ExecutableCommand`] impl.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                if session.verbose {
                    eprintln!("{}: {:#}", T::name(), e);
                }
                writeln!(stdout, "{}", e)?;
                Ok(FAILURE)
            }
        }
    }
}

struct InvalidArgs {
    usage: &'static str,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> anyhow::Result<ExitCode> {
        writeln!(stdout, "Usage: {}", self.usage)?;
        Ok(USAGE)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        // everything after `--` is positional, so "-5" and "help" reach the command as values
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("--");
        argv.extend_from_slice(args);
        let cmd: Box<dyn ExecutableCommand> = match T::from_args(&[name], &argv) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { .. }) => Box::new(InvalidArgs { usage: T::usage() }),
        };
        Some(cmd)
    }

    fn try_create_raw(&self, name: &str, tail: &[u8]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        let cmd: Box<dyn ExecutableCommand> = Box::new(T::from_raw_tail(tail)?);
        Some(cmd)
    }
}

#[derive(FromArgs)]
/// Open a file and make it the active handle.
pub struct Open {
    #[argh(positional)]
    /// path of the file to open.
    pub path: String,

    #[argh(positional)]
    /// one of r, w, a, r+.
    pub mode: String,
}

impl BuiltinCommand for Open {
    fn name() -> &'static str {
        "open"
    }

    fn usage() -> &'static str {
        "open <path> <mode>"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        if session.is_open() {
            return Err(HandleError::AlreadyOpen.into());
        }
        let mode: OpenMode = self.mode.parse()?;
        session.open(&self.path, mode)?;
        writeln!(stdout, "File opened successfully.")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Flush and close the active handle.
pub struct Close {}

impl BuiltinCommand for Close {
    fn name() -> &'static str {
        "close"
    }

    fn usage() -> &'static str {
        "close"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.close()?;
        writeln!(stdout, "File closed successfully.")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Read up to `size` bytes at the cursor.
pub struct Read {
    #[argh(positional)]
    /// maximum number of bytes to read.
    pub size: u64,
}

impl BuiltinCommand for Read {
    fn name() -> &'static str {
        "read"
    }

    fn usage() -> &'static str {
        "read <n>"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let bytes = session.handle_mut()?.read(self.size)?;
        stdout.write_all(b"Read: ")?;
        stdout.write_all(&bytes)?;
        writeln!(stdout)?;
        Ok(0)
    }
}

/// Bytes handed to `write` exactly as they appeared on the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(pub Vec<u8>);

impl FromStr for Payload {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Payload(s.as_bytes().to_vec()))
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload(s.as_bytes().to_vec())
    }
}

#[derive(FromArgs)]
/// Write text at the cursor, or at end of file for handles opened with `a`.
pub struct WriteText {
    #[argh(positional)]
    /// the rest of the line, written as-is.
    pub text: Payload,
}

impl BuiltinCommand for WriteText {
    fn name() -> &'static str {
        "write"
    }

    fn usage() -> &'static str {
        "write <text>"
    }

    fn from_raw_tail(tail: &[u8]) -> Option<Self> {
        Some(WriteText {
            text: Payload(tail.to_vec()),
        })
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.handle_mut()?.write(&self.text.0)?;
        writeln!(stdout, "Write successful.")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Move the cursor.
pub struct Seek {
    #[argh(positional)]
    /// signed byte offset.
    pub offset: i64,

    #[argh(positional)]
    /// origin: 0 = start of file, 1 = current cursor, 2 = end of file.
    pub whence: i32,
}

impl BuiltinCommand for Seek {
    fn name() -> &'static str {
        "seek"
    }

    fn usage() -> &'static str {
        "seek <offset> <whence>"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let handle = session.handle_mut()?;
        let whence = Whence::try_from(self.whence)?;
        handle.seek(self.offset, whence)?;
        writeln!(stdout, "Seek successful.")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the cursor of the active handle.
pub struct Tell {}

impl BuiltinCommand for Tell {
    fn name() -> &'static str {
        "tell"
    }

    fn usage() -> &'static str {
        "tell"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let cursor = session.handle_mut()?.cursor();
        writeln!(stdout, "Position: {}", cursor)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Stop reading commands. An open handle is released without output.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn usage() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.should_exit = true;
        Ok(0)
    }
}
