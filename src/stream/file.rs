//! §4.5 File object lifecycle and §4.6 standard-stream wrappers.
//!
//! Grounded in the teacher's `fs::File` (open/create via an `OpenOptions`
//! builder around a `sys`-level handle) generalized to the Lisp file
//! object's bind/unbind/close-but-reusable lifecycle from
//! `original_source/src/streams.c`'s `cmd_open`/`cmd_close`/`file_sweep`.

use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::{Error, Result};

/// Anything a `FileObject` can hold open: a real OS file, or one of the
/// three process standard streams. Standard streams only support one
/// direction; the unsupported direction reports an I/O error rather than
/// panicking, the same way a real fd opened `O_RDONLY` would.
trait RawFile: Read + Write {}
impl RawFile for std::fs::File {}

struct StdinHandle;
impl Read for StdinHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }
}
impl Write for StdinHandle {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "<stdin> is not writable"))
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl RawFile for StdinHandle {}

struct StdoutHandle;
impl Read for StdoutHandle {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "<stdout> is not readable"))
    }
}
impl Write for StdoutHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().lock().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}
impl RawFile for StdoutHandle {}

struct StderrHandle;
impl Read for StderrHandle {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "<stderr> is not readable"))
    }
}
impl Write for StderrHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().lock().write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}
impl RawFile for StderrHandle {}

/// A bound OS handle plus the one-byte pushback buffer `ungetc` needs.
struct Handle {
    raw: Box<dyn RawFile>,
    pushback: Option<u8>,
    eof: bool,
}

impl Handle {
    fn getc(&mut self) -> Option<u8> {
        if let Some(b) = self.pushback.take() {
            return Some(b);
        }
        let mut byte = [0u8; 1];
        match self.raw.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => {
                self.eof = true;
                None
            }
        }
    }

    fn ungetc(&mut self, c: u8) -> bool {
        if self.pushback.is_some() {
            false
        } else {
            self.pushback = Some(c);
            self.eof = false;
            true
        }
    }

    fn putc(&mut self, c: u8) -> bool {
        self.raw.write_all(&[c]).is_ok()
    }

    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        let mut written = 0;
        for chunk in buf.iter() {
            if self.raw.write_all(std::slice::from_ref(chunk)).is_ok() {
                written += 1;
            } else {
                break;
            }
        }
        written
    }
}

/// A Lisp file object: an owning handle, a bound name (or unbound), and
/// the "don't close" flag used by the three pinned standard streams.
pub struct FileObject {
    name: Option<String>,
    handle: Option<Handle>,
    dont_close: bool,
}

impl FileObject {
    fn empty() -> FileObject {
        FileObject { name: None, handle: None, dont_close: false }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    pub fn getc(&mut self) -> Option<u8> {
        self.handle.as_mut().and_then(Handle::getc)
    }

    pub fn ungetc(&mut self, c: u8) -> bool {
        self.handle.as_mut().map(|h| h.ungetc(c)).unwrap_or(false)
    }

    pub fn putc(&mut self, c: u8) -> bool {
        self.handle.as_mut().map(|h| h.putc(c)).unwrap_or(false)
    }

    pub fn write_bytes(&mut self, buf: &[u8]) -> usize {
        self.handle.as_mut().map(|h| h.write_bytes(buf)).unwrap_or(0)
    }

    pub fn flush(&mut self) {
        if let Some(h) = self.handle.as_mut() {
            let _ = h.raw.flush();
        }
    }

    pub fn is_eof(&self) -> bool {
        self.handle.as_ref().map(|h| h.eof).unwrap_or(true)
    }

    /// `close`: drop the handle unless "don't close"; idempotent.
    pub fn close(&mut self) {
        if !self.dont_close {
            self.handle = None;
        }
        self.name = None;
    }

    fn bind(&mut self, name: String, raw: Box<dyn RawFile>, dont_close: bool) {
        self.name = Some(name);
        self.handle = Some(Handle { raw, pushback: None, eof: false });
        self.dont_close = dont_close;
    }

    /// `file_cmp`: two file objects are the same file if both are bound to
    /// the same name. The C source compares the raw bound name string;
    /// this canonicalizes both sides first so `"a"` and `"./a"` agree.
    pub fn same_file(&self, other: &FileObject) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => {
                let canon = |p: &str| std::fs::canonicalize(p).ok();
                match (canon(a), canon(b)) {
                    (Some(a), Some(b)) => a == b,
                    _ => a == b,
                }
            }
            _ => false,
        }
    }

    /// Line-oriented read capped at `max_len - 1` bytes, truncating longer
    /// lines, matching `fgets(buf, 400, file)`.
    pub fn read_line(&mut self, max_len: usize) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.getc() {
                Some(b) => {
                    out.push(b);
                    if b == b'\n' || out.len() >= max_len - 1 {
                        break;
                    }
                }
                None => break,
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

/// Parse a C-style `fopen` mode string into Rust's `OpenOptions`, keeping
/// the Lisp-facing `open` API's two-string shape while using the teacher's
/// builder pattern underneath.
fn parse_mode(mode: &str) -> Result<OpenOptions> {
    let mut opts = OpenOptions::new();
    match mode {
        "r" => {
            opts.read(true);
        }
        "r+" => {
            opts.read(true).write(true);
        }
        "w" => {
            opts.write(true).create(true).truncate(true);
        }
        "w+" => {
            opts.read(true).write(true).create(true).truncate(true);
        }
        "a" => {
            opts.append(true).create(true);
        }
        "a+" => {
            opts.read(true).append(true).create(true);
        }
        other => return Err(Error::bad_arg(format!("unrecognized file mode {other:?}"))),
    }
    Ok(opts)
}

/// The intrusive chain of live file objects, rebuilt each sweep (spec.md
/// §4.5 "GC participation"), plus the three pinned standard-stream
/// singletons, which never enter the chain and so are never swept.
#[derive(Default)]
pub struct FileTable {
    chain: Vec<Rc<RefCell<FileObject>>>,
    stdin: RefCell<Option<Rc<RefCell<FileObject>>>>,
    stdout: RefCell<Option<Rc<RefCell<FileObject>>>>,
    stderr: RefCell<Option<Rc<RefCell<FileObject>>>>,
}

impl FileTable {
    pub fn new() -> FileTable {
        FileTable::default()
    }

    /// `open`: allocate a fresh file object, or reuse `reuse` after closing
    /// its current handle. Returning an unbound file (when `name`/`mode`
    /// are absent) is legal.
    pub fn open(
        &mut self,
        name: Option<&str>,
        mode: Option<&str>,
        reuse: Option<Rc<RefCell<FileObject>>>,
    ) -> Result<Rc<RefCell<FileObject>>> {
        let target = match reuse {
            Some(existing) => {
                existing.borrow_mut().close();
                existing
            }
            None => {
                let fresh = Rc::new(RefCell::new(FileObject::empty()));
                self.chain.push(fresh.clone());
                fresh
            }
        };

        if let (Some(name), Some(mode)) = (name, mode) {
            let opts = parse_mode(mode)?;
            match opts.open(name) {
                Ok(file) => {
                    log::debug!("opened file {name:?} mode {mode:?}");
                    target.borrow_mut().bind(name.to_string(), Box::new(file), false);
                }
                Err(e) => {
                    log::warn!("failed to open file {name:?}: {e}");
                    return Err(Error::file_error(e.to_string(), name.to_string()));
                }
            }
        }
        Ok(target)
    }

    /// `file_sweep`: close and drop every file the collaborator's mark
    /// phase did not mark live; relink the rest. `is_live` stands in for
    /// the GC's reachability trace (spec.md §6's "mark/sweep chain hooks").
    pub fn sweep(&mut self, is_live: impl Fn(&Rc<RefCell<FileObject>>) -> bool) {
        let old = std::mem::take(&mut self.chain);
        let before = old.len();
        for file in old {
            if is_live(&file) {
                self.chain.push(file);
            } else {
                file.borrow_mut().close();
            }
        }
        log::debug!("file sweep: {} live of {} checked", self.chain.len(), before);
    }

    /// Drain the chain on interpreter shutdown, force-closing every bound
    /// non-pinned handle.
    pub fn shutdown(&mut self) {
        for file in self.chain.drain(..) {
            file.borrow_mut().close();
        }
    }

    fn pinned_std(
        slot: &RefCell<Option<Rc<RefCell<FileObject>>>>,
        name: &str,
        raw: impl FnOnce() -> Box<dyn RawFile>,
    ) -> Rc<RefCell<FileObject>> {
        if let Some(existing) = slot.borrow().as_ref() {
            return existing.clone();
        }
        let mut obj = FileObject::empty();
        obj.bind(name.to_string(), raw(), true);
        let rc = Rc::new(RefCell::new(obj));
        *slot.borrow_mut() = Some(rc.clone());
        rc
    }

    pub fn stdin_file(&self) -> Rc<RefCell<FileObject>> {
        Self::pinned_std(&self.stdin, "<stdin>", || Box::new(StdinHandle))
    }

    pub fn stdout_file(&self) -> Rc<RefCell<FileObject>> {
        Self::pinned_std(&self.stdout, "<stdout>", || Box::new(StdoutHandle))
    }

    pub fn stderr_file(&self) -> Rc<RefCell<FileObject>> {
        Self::pinned_std(&self.stderr, "<stderr>", || Box::new(StderrHandle))
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

impl std::fmt::Display for FileObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "#<file {name}>"),
            None => write!(f, "#<file *unbound*>"),
        }
    }
}
