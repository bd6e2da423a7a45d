use crate::handle::{FileHandle, HandleError, OpenMode};
use std::path::Path;

/// Mutable state shared by all commands of one interpreter.
///
/// The session contains:
/// - the active file handle, if any. At most one exists at a time.
/// - `should_exit`: a flag the command loop checks to know when to terminate.
/// - `verbose`: whether failed commands report their cause on stderr.
///
/// Dropping the session drops the handle, which releases its descriptor.
#[derive(Debug, Default)]
pub struct Session {
    handle: Option<FileHandle>,
    /// When set to true, indicates that the command loop should exit.
    pub should_exit: bool,
    /// When set to true, failures are also described on stderr.
    pub verbose: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` and make it the active handle.
    ///
    /// Rejected while another handle is open; the existing one is left untouched.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<(), HandleError> {
        if self.handle.is_some() {
            return Err(HandleError::AlreadyOpen);
        }
        self.handle = Some(FileHandle::open(path, mode)?);
        Ok(())
    }

    /// Close the active handle. The session has no handle afterwards, even on error.
    pub fn close(&mut self) -> Result<(), HandleError> {
        self.handle.take().ok_or(HandleError::NotOpen)?.close()
    }

    /// Close the active handle if there is one. Used when the command loop ends.
    pub fn release(&mut self) -> Result<(), HandleError> {
        match self.handle.take() {
            Some(handle) => handle.close(),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&FileHandle> {
        self.handle.as_ref()
    }

    /// The active handle, or [`HandleError::NotOpen`].
    pub fn handle_mut(&mut self) -> Result<&mut FileHandle, HandleError> {
        self.handle.as_mut().ok_or(HandleError::NotOpen)
    }
}
