//! The single file handle driven by the interpreter and the byte-level rules of each open mode.

use std::error::Error;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How a file was opened. Each variant corresponds to exactly one textual mode token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `r`: the file must exist, reading only.
    ReadOnly,
    /// `w`: created if missing, truncated otherwise, writing only.
    WriteCreate,
    /// `a`: created if missing, never truncated, every write lands at end of file.
    AppendCreate,
    /// `r+`: the file must exist, reading and writing at any offset.
    ReadWrite,
}

const MODE_TABLE: [(&str, OpenMode); 4] = [
    ("r", OpenMode::ReadOnly),
    ("w", OpenMode::WriteCreate),
    ("a", OpenMode::AppendCreate),
    ("r+", OpenMode::ReadWrite),
];

impl OpenMode {
    /// The token this mode is spelled with on the command line.
    pub fn token(self) -> &'static str {
        match self {
            OpenMode::ReadOnly => "r",
            OpenMode::WriteCreate => "w",
            OpenMode::AppendCreate => "a",
            OpenMode::ReadWrite => "r+",
        }
    }

    pub fn can_read(self) -> bool {
        matches!(self, OpenMode::ReadOnly | OpenMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::ReadOnly => options.read(true),
            OpenMode::WriteCreate => options.write(true).create(true).truncate(true),
            OpenMode::AppendCreate => options.append(true).create(true),
            OpenMode::ReadWrite => options.read(true).write(true),
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o666);
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = HandleError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        MODE_TABLE
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| HandleError::InvalidMode(UnknownMode(token.to_string())))
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Origin of a seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// 0: from the start of the file.
    Start,
    /// 1: from the current cursor.
    Current,
    /// 2: from the end of the file.
    End,
}

impl TryFrom<i32> for Whence {
    type Error = HandleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(HandleError::InvalidSeek),
        }
    }
}

/// A mode token outside of `r`, `w`, `a` and `r+`.
#[derive(Debug)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported open mode `{}`", self.0)
    }
}

impl Error for UnknownMode {}

/// Everything that can go wrong while driving the handle.
///
/// The `Display` text of each variant is the exact response line sent back to the caller.
/// The underlying OS error, if any, is available through [`Error::source`].
#[derive(Debug)]
pub enum HandleError {
    /// `open` while another handle is still active.
    AlreadyOpen,
    /// A handle operation with no file open.
    NotOpen,
    /// The mode token is not one of `r`, `w`, `a`, `r+`.
    InvalidMode(UnknownMode),
    /// The OS refused to open the file, e.g. it is missing for `r` / `r+`.
    Open(io::Error),
    /// `read` on a handle opened with `w` or `a`.
    ReadNotPermitted(OpenMode),
    /// The OS failed while reading.
    Read(io::Error),
    /// `write` on a handle opened with `r`.
    WriteNotPermitted(OpenMode),
    /// The OS failed while writing.
    Write(io::Error),
    /// Unknown whence, overflow, or a target before the start of the file.
    InvalidSeek,
    /// The file length needed for whence 2 could not be read.
    Seek(io::Error),
    /// Flushing pending writes failed while closing.
    Close(io::Error),
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self {
            HandleError::AlreadyOpen => "File already open. Close it first.",
            HandleError::NotOpen => "No file is currently open.",
            HandleError::InvalidMode(_) | HandleError::Open(_) => "Failed to open file.",
            HandleError::ReadNotPermitted(_) | HandleError::Read(_) => {
                "Failed to read from file."
            }
            HandleError::WriteNotPermitted(_) | HandleError::Write(_) => "Write failed.",
            HandleError::InvalidSeek | HandleError::Seek(_) => "Seek failed.",
            HandleError::Close(_) => "Failed to close file.",
        };
        f.write_str(line)
    }
}

impl Error for HandleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandleError::Open(e)
            | HandleError::Read(e)
            | HandleError::Write(e)
            | HandleError::Seek(e)
            | HandleError::Close(e) => Some(e),
            HandleError::InvalidMode(e) => Some(e),
            _ => None,
        }
    }
}

/// An open file together with the cursor the interpreter reads and writes at.
///
/// The cursor is authoritative: the OS file position is moved to it before every
/// read or write, so it never drifts from what `seek` reported.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    path: PathBuf,
    mode: OpenMode,
    cursor: u64,
}

impl FileHandle {
    /// Open `path` following the creation and truncation rules of `mode`.
    ///
    /// In append mode the cursor starts at the current end of file, everywhere else at 0.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, HandleError> {
        let path = path.as_ref();
        let file = mode.options().open(path).map_err(HandleError::Open)?;
        let cursor = match mode {
            OpenMode::AppendCreate => file.metadata().map_err(HandleError::Open)?.len(),
            _ => 0,
        };
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
            cursor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Read up to `n` bytes at the cursor.
    ///
    /// Hitting end of file early is not an error: the returned buffer is simply shorter,
    /// possibly empty.
    pub fn read(&mut self, n: u64) -> Result<Vec<u8>, HandleError> {
        if !self.mode.can_read() {
            return Err(HandleError::ReadNotPermitted(self.mode));
        }
        self.file
            .seek(SeekFrom::Start(self.cursor))
            .map_err(HandleError::Read)?;
        let mut buf = Vec::new();
        (&mut self.file)
            .take(n)
            .read_to_end(&mut buf)
            .map_err(HandleError::Read)?;
        self.cursor += buf.len() as u64;
        Ok(buf)
    }

    /// Write all of `data`, overwriting in place at the cursor, or at end of file in append mode.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, HandleError> {
        if !self.mode.can_write() {
            return Err(HandleError::WriteNotPermitted(self.mode));
        }
        match self.mode {
            OpenMode::AppendCreate => {
                self.file.write_all(data).map_err(HandleError::Write)?;
                self.cursor = self.file.stream_position().map_err(HandleError::Write)?;
                Ok(data.len())
            }
            _ => {
                self.file
                    .seek(SeekFrom::Start(self.cursor))
                    .map_err(HandleError::Write)?;
                self.file.write_all(data).map_err(HandleError::Write)?;
                self.cursor += data.len() as u64;
                Ok(data.len())
            }
        }
    }

    /// Move the cursor to `offset` relative to `whence` and return the new absolute position.
    ///
    /// Positions past the end of file are fine, negative ones are rejected and leave the
    /// cursor where it was.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, HandleError> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.cursor,
            Whence::End => self.file.metadata().map_err(HandleError::Seek)?.len(),
        };
        let target = i64::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .and_then(|pos| u64::try_from(pos).ok())
            .ok_or(HandleError::InvalidSeek)?;
        self.cursor = target;
        Ok(target)
    }

    /// Flush pending writes and release the descriptor.
    ///
    /// The descriptor is released even when the flush fails.
    pub fn close(mut self) -> Result<(), HandleError> {
        self.file.flush().map_err(HandleError::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env as stdenv;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    const EXISTING: &str = "This is a test file.\nIt has multiple lines.\n";

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("handle_test_{}_{}_{}", tag, std::process::id(), nanos));
        fs::create_dir_all(&p).expect("failed to create temp dir");
        p
    }

    fn existing_file(dir: &Path) -> PathBuf {
        let path = dir.join("existing.txt");
        fs::write(&path, EXISTING).expect("write fixture");
        path
    }

    #[test]
    fn test_mode_tokens() {
        assert_eq!("r".parse::<OpenMode>().unwrap(), OpenMode::ReadOnly);
        assert_eq!("w".parse::<OpenMode>().unwrap(), OpenMode::WriteCreate);
        assert_eq!("a".parse::<OpenMode>().unwrap(), OpenMode::AppendCreate);
        assert_eq!("r+".parse::<OpenMode>().unwrap(), OpenMode::ReadWrite);
        assert_eq!(OpenMode::ReadWrite.to_string(), "r+");

        for bad in ["R", "w+", "a+", "rw", ""] {
            let err = bad.parse::<OpenMode>().unwrap_err();
            assert!(matches!(err, HandleError::InvalidMode(_)), "{bad:?} accepted");
            assert_eq!(err.to_string(), "Failed to open file.");
        }
    }

    #[test]
    fn test_whence_from_int() {
        assert_eq!(Whence::try_from(0).unwrap(), Whence::Start);
        assert_eq!(Whence::try_from(1).unwrap(), Whence::Current);
        assert_eq!(Whence::try_from(2).unwrap(), Whence::End);
        assert!(Whence::try_from(3).is_err());
        assert!(Whence::try_from(-1).is_err());
    }

    #[test]
    fn test_open_missing_file_fails_for_read_modes() {
        let dir = make_unique_temp_dir("missing");
        let path = dir.join("non_existing.txt");

        for mode in [OpenMode::ReadOnly, OpenMode::ReadWrite] {
            let err = FileHandle::open(&path, mode).unwrap_err();
            assert!(matches!(err, HandleError::Open(_)));
        }
        assert!(!path.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_write_mode_creates_and_truncates() {
        let dir = make_unique_temp_dir("truncate");
        let fresh = dir.join("fresh.txt");
        FileHandle::open(&fresh, OpenMode::WriteCreate)
            .unwrap()
            .close()
            .unwrap();
        assert_eq!(fs::metadata(&fresh).unwrap().len(), 0);

        let existing = existing_file(&dir);
        FileHandle::open(&existing, OpenMode::WriteCreate)
            .unwrap()
            .close()
            .unwrap();
        assert_eq!(fs::metadata(&existing).unwrap().len(), 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_advances_cursor_and_stops_at_eof() {
        let dir = make_unique_temp_dir("read");
        let path = existing_file(&dir);
        let mut handle = FileHandle::open(&path, OpenMode::ReadOnly).unwrap();

        assert_eq!(handle.read(10).unwrap(), b"This is a ");
        assert_eq!(handle.cursor(), 10);

        let rest = handle.read(1000).unwrap();
        assert_eq!(rest, &EXISTING.as_bytes()[10..]);
        assert_eq!(handle.cursor(), EXISTING.len() as u64);

        assert!(handle.read(5).unwrap().is_empty());
        assert_eq!(handle.cursor(), EXISTING.len() as u64);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_overwrite_in_place() {
        let dir = make_unique_temp_dir("overwrite");
        let path = existing_file(&dir);
        let mut handle = FileHandle::open(&path, OpenMode::ReadWrite).unwrap();

        handle.seek(5, Whence::Start).unwrap();
        assert_eq!(handle.write(b"MIDDLE").unwrap(), 6);
        assert_eq!(handle.cursor(), 11);
        handle.seek(5, Whence::Start).unwrap();
        assert_eq!(handle.read(10).unwrap(), b"MIDDLEest ");
        handle.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.len(), EXISTING.len());
        assert!(content.starts_with("This MIDDLEest file."));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_write_past_eof_extends_file() {
        let dir = make_unique_temp_dir("extend");
        let path = dir.join("short.txt");
        fs::write(&path, "abc").unwrap();

        let mut handle = FileHandle::open(&path, OpenMode::ReadWrite).unwrap();
        handle.seek(1, Whence::Start).unwrap();
        handle.write(b"XYZW").unwrap();
        handle.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "aXYZW");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_append_ignores_seek() {
        let dir = make_unique_temp_dir("append");
        let path = existing_file(&dir);
        let mut handle = FileHandle::open(&path, OpenMode::AppendCreate).unwrap();
        assert_eq!(handle.cursor(), EXISTING.len() as u64);

        handle.seek(0, Whence::Start).unwrap();
        handle.write(b"Appended text").unwrap();
        assert_eq!(handle.cursor(), (EXISTING.len() + 13) as u64);
        handle.close().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{EXISTING}Appended text")
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_seek_origins() {
        let dir = make_unique_temp_dir("seek");
        let path = existing_file(&dir);
        let len = EXISTING.len() as u64;
        let mut handle = FileHandle::open(&path, OpenMode::ReadOnly).unwrap();

        assert_eq!(handle.seek(10, Whence::Start).unwrap(), 10);
        assert_eq!(handle.seek(10, Whence::Start).unwrap(), 10);
        assert_eq!(handle.read(5).unwrap(), b"test ");
        assert_eq!(handle.seek(-5, Whence::Current).unwrap(), 10);
        assert_eq!(handle.read(5).unwrap(), b"test ");
        assert_eq!(handle.seek(-7, Whence::End).unwrap(), len - 7);
        assert_eq!(handle.read(100).unwrap(), b"lines.\n");
        assert_eq!(handle.seek(3, Whence::End).unwrap(), len + 3);
        assert!(handle.read(4).unwrap().is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_negative_seek_keeps_cursor() {
        let dir = make_unique_temp_dir("negative");
        let path = existing_file(&dir);
        let mut handle = FileHandle::open(&path, OpenMode::ReadOnly).unwrap();
        handle.seek(4, Whence::Start).unwrap();

        assert!(matches!(
            handle.seek(-5, Whence::Current),
            Err(HandleError::InvalidSeek)
        ));
        assert!(matches!(
            handle.seek(-1, Whence::Start),
            Err(HandleError::InvalidSeek)
        ));
        assert!(matches!(
            handle.seek(i64::MAX, Whence::Current),
            Err(HandleError::InvalidSeek)
        ));
        assert_eq!(handle.cursor(), 4);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn test_close_character_device() {
        let mut handle = FileHandle::open("/dev/null", OpenMode::WriteCreate).unwrap();
        assert_eq!(handle.write(b"x").unwrap(), 1);
        assert!(handle.close().is_ok());

        let handle = FileHandle::open("/dev/null", OpenMode::AppendCreate).unwrap();
        assert!(handle.close().is_ok());
    }

    #[test]
    fn test_token_matches_parse() {
        for mode in [
            OpenMode::ReadOnly,
            OpenMode::WriteCreate,
            OpenMode::AppendCreate,
            OpenMode::ReadWrite,
        ] {
            assert_eq!(mode.token().parse::<OpenMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_violations() {
        let dir = make_unique_temp_dir("violations");
        let path = existing_file(&dir);

        let mut reader = FileHandle::open(&path, OpenMode::ReadOnly).unwrap();
        assert!(matches!(
            reader.write(b"nope"),
            Err(HandleError::WriteNotPermitted(OpenMode::ReadOnly))
        ));
        drop(reader);

        let mut appender = FileHandle::open(&path, OpenMode::AppendCreate).unwrap();
        let err = appender.read(3).unwrap_err();
        assert_eq!(err.to_string(), "Failed to read from file.");
        drop(appender);

        assert_eq!(fs::read_to_string(&path).unwrap(), EXISTING);

        let _ = fs::remove_dir_all(&dir);
    }
}
