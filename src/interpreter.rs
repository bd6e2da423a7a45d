use crate::command::{CommandFactory, ExitCode, NOT_FOUND};
use crate::parser::{self, ParsedLine};
use crate::session::Session;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, i.e. `BuiltinCommand` implementors.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A line-oriented interpreter driving a single file handle.
///
/// The interpreter owns a [`Session`] and a list of [`CommandFactory`] objects that are
/// queried to create commands by verb. See [`Default`] for the commands included out
/// of the box.
///
/// Example
/// ```
/// use file_commands::Interpreter;
/// let mut interp = Interpreter::default();
/// let mut out = Vec::new();
/// interp.run_script("close\nexit\n".as_bytes(), &mut out).unwrap();
/// assert_eq!(out, b"No file is currently open.\n");
/// ```
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            session: Session::new(),
            commands,
        }
    }

    /// Report the cause of failed commands on stderr.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.session.verbose = verbose;
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a single command by verb with already split arguments.
    ///
    /// Returns the command's exit code. An unrecognized verb answers `Unknown command.`
    /// and yields [`NOT_FOUND`]. Errors are only returned when `stdout` itself fails.
    pub fn run(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, args) {
                return cmd.execute(stdout, &mut self.session);
            }
        }
        self.unknown(name, stdout)
    }

    /// Run a verb whose argument is the raw rest of the line.
    ///
    /// Factories without a raw form get the tail as a single (lossily decoded) argument.
    pub fn run_raw(
        &mut self,
        name: &str,
        tail: &[u8],
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create_raw(name, tail) {
                return cmd.execute(stdout, &mut self.session);
            }
        }
        let text = String::from_utf8_lossy(tail);
        self.run(name, &[text.as_ref()], stdout)
    }

    fn unknown(&mut self, name: &str, stdout: &mut dyn Write) -> anyhow::Result<ExitCode> {
        if self.session.verbose {
            eprintln!("{}: command not found", name);
        }
        writeln!(stdout, "Unknown command.")?;
        Ok(NOT_FOUND)
    }

    /// Parse and run one input line, then flush `stdout`.
    ///
    /// Blank lines are skipped and yield `None`. Every other line answers exactly once,
    /// lines without a usable verb with `Unknown command.`
    pub fn execute_line(
        &mut self,
        line: impl AsRef<[u8]>,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<Option<ExitCode>> {
        let code = match parser::parse_line(line.as_ref()) {
            ParsedLine::Blank => return Ok(None),
            ParsedLine::Unrecognized => self.unknown("<unreadable>", stdout)?,
            ParsedLine::Command(cmd) => match cmd.tail {
                Some(tail) => self.run_raw(cmd.verb, tail, stdout)?,
                None => {
                    let args: Vec<&str> = cmd.args.iter().map(|arg| arg.as_ref()).collect();
                    self.run(cmd.verb, &args, stdout)?
                }
            },
        };
        stdout.flush().context("failed to flush output")?;
        Ok(Some(code))
    }

    /// Execute commands from `input` until `exit` or end of input.
    ///
    /// A handle left open is released before returning, without any output.
    pub fn run_script<R: BufRead>(
        &mut self,
        mut input: R,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let mut buf = Vec::new();
        let result = loop {
            buf.clear();
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(anyhow::Error::new(e).context("failed to read command")),
            }
            if let Err(e) = self.execute_line(&buf, stdout) {
                break Err(e);
            }
            if self.session.should_exit {
                break Ok(());
            }
        };
        self.finish();
        result
    }

    /// Interactive Read-Eval-Print Loop on top of a line editor.
    ///
    /// Ctrl-C and Ctrl-D end the session like `exit` does.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        // Stolen from basic example in: https://github.com/kkawakam/rustyline
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        let result = loop {
            if self.session.should_exit {
                break Ok(());
            }
            match rl.readline("> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(err) = self.execute_line(&line, &mut stdout) {
                        break Err(err);
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break Ok(()),
                Err(err) => break Err(err.into()),
            }
        };
        self.finish();
        result
    }

    /// Implicit close at the end of a session.
    fn finish(&mut self) {
        if let Err(e) = self.session.release() {
            if self.session.verbose {
                eprintln!("exit: {:#}", anyhow::Error::new(e));
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// `open`, `close`, `read`, `write`, `seek`, `tell` and `exit`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Open>::default()),
            Box::new(Factory::<Close>::default()),
            Box::new(Factory::<Read>::default()),
            Box::new(Factory::<WriteText>::default()),
            Box::new(Factory::<Seek>::default()),
            Box::new(Factory::<Tell>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}
