//! A line-oriented interpreter driving a single open file.
//!
//! Each input line is one command (`open`, `close`, `read`, `write`, `seek`, `tell`,
//! `exit`) and produces exactly one response line. At most one file handle is open at a
//! time, owned by the interpreter's [`session::Session`], and its cursor decides where
//! the next read or write happens according to the mode the file was opened with.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and [`handle`]
//! expose the traits for adding commands and the file handle itself.

mod builtin;
pub mod command;
pub mod handle;
mod interpreter;
mod parser;
pub mod session;

/// Just a convenient re-export of the command interpreter.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
