//! §4.2 Stream dispatcher: the tagged-variant `Stream` value and the four
//! primitive operations (`get_char`, `unget_char`, `put_char`, `put_bytes`).
//!
//! The eight backing variants are a closed sum (Design Note "Tagged
//! variants over inheritance") so `Stream` is a plain `enum` dispatched
//! with `match`, never a trait object hierarchy.

pub mod accumulator;
pub mod file;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::gc::GcState;
use crate::position::{pos_getc, pos_putc, pos_puts, pos_ungetc};
use crate::value::{Buffer, CallArg, Callable, Mark, Position, ProcessSink, StatusLine};

pub use accumulator::{InputCursor, OutputAccumulator};
pub use file::{FileObject, FileTable};

/// The closed set of backing variants from spec.md §3.
#[derive(Clone)]
pub enum Stream {
    File(Rc<RefCell<FileObject>>),
    Mark(Rc<RefCell<Mark>>),
    Buffer(Rc<RefCell<Buffer>>),
    /// `(Int . String)`: read-only cursor.
    InputCursor(Rc<RefCell<InputCursor>>),
    /// `(String . Int)`: output accumulator.
    OutputAccumulator(Rc<RefCell<OutputAccumulator>>),
    /// `(Buffer . Pos)`: position held inline in the stream value.
    BufferPos(Rc<RefCell<Buffer>>, Rc<RefCell<Position>>),
    /// `(Buffer . t)`: appends at the buffer's restriction end.
    BufferRestriction(Rc<RefCell<Buffer>>),
    Callable(Rc<RefCell<dyn Callable>>),
    /// The `t` symbol: the editor status line.
    StatusLine(Rc<RefCell<StatusLine>>),
    Process(Rc<RefCell<dyn ProcessSink>>),
}

/// Interpreter state threaded explicitly through every primitive call
/// (Design Note "Default-stream fallback via dynamic binding"): nothing
/// here is a hidden global.
#[derive(Default)]
pub struct StreamContext {
    pub gc: GcState,
    pub standard_input: Option<Stream>,
    pub standard_output: Option<Stream>,
}

fn resolve(explicit: Option<&Stream>, default: &Option<Stream>) -> Option<Stream> {
    match explicit {
        Some(s) => Some(s.clone()),
        None => default.clone(),
    }
}

/// `get-char` / `stream_getc`: read one byte, or `None` at EOF.
pub fn get_char(ctx: &StreamContext, stream: Option<&Stream>) -> Result<Option<u8>> {
    let stream = match resolve(stream, &ctx.standard_input) {
        Some(s) => s,
        None => return Ok(None),
    };
    match &stream {
        Stream::File(f) => Ok(f.borrow_mut().getc()),
        Stream::Mark(m) => {
            let mut m = m.borrow_mut();
            if !m.resident {
                return Err(Error::invalid_stream("Marks used as streams must be resident"));
            }
            let buffer = m.buffer.clone();
            let buf = buffer.borrow();
            Ok(pos_getc(&buf, &mut m.pos))
        }
        Stream::Buffer(b) => {
            let mut buf = b.borrow_mut();
            let mut cursor = buf.cursor;
            let c = pos_getc(&buf, &mut cursor);
            buf.cursor = cursor;
            Ok(c)
        }
        Stream::InputCursor(c) => Ok(c.borrow_mut().getc()),
        Stream::BufferPos(buffer, pos) => {
            let buf = buffer.borrow();
            let mut p = pos.borrow_mut();
            Ok(pos_getc(&buf, &mut p))
        }
        Stream::OutputAccumulator(_) | Stream::BufferRestriction(_) => {
            log::warn!("get_char: output-only stream used as input");
            Err(Error::invalid_stream("stream is not readable"))
        }
        Stream::Callable(c) => Ok(ctx.gc.with_inhibited(|| c.borrow_mut().read())),
        Stream::StatusLine(_) => Err(Error::invalid_stream("the status line is not readable")),
        Stream::Process(_) => {
            log::warn!("get_char: process stream used as input");
            Err(Error::invalid_stream("Processes are not input streams"))
        }
    }
}

/// `unget-char` / `stream_ungetc`: only valid immediately after a
/// successful `get_char` on the same stream. Unsupported variants simply
/// report failure, matching the source (no signal is raised here).
pub fn unget_char(ctx: &StreamContext, stream: Option<&Stream>, c: u8) -> bool {
    let stream = match resolve(stream, &ctx.standard_input) {
        Some(s) => s,
        None => return false,
    };
    match &stream {
        Stream::File(f) => f.borrow_mut().ungetc(c),
        Stream::Mark(m) => {
            let mut m = m.borrow_mut();
            if !m.resident {
                return false;
            }
            let buffer = m.buffer.clone();
            let buf = buffer.borrow();
            pos_ungetc(&buf, &mut m.pos);
            true
        }
        Stream::Buffer(b) => {
            let mut buf = b.borrow_mut();
            let mut cursor = buf.cursor;
            pos_ungetc(&buf, &mut cursor);
            buf.cursor = cursor;
            true
        }
        Stream::InputCursor(cur) => {
            cur.borrow_mut().ungetc();
            true
        }
        Stream::BufferPos(buffer, pos) => {
            let buf = buffer.borrow();
            let mut p = pos.borrow_mut();
            pos_ungetc(&buf, &mut p);
            true
        }
        Stream::Callable(callable) => {
            ctx.gc.with_inhibited(|| callable.borrow_mut().unget(c as i64))
        }
        Stream::OutputAccumulator(_)
        | Stream::BufferRestriction(_)
        | Stream::StatusLine(_)
        | Stream::Process(_) => false,
    }
}

/// `put-char` / `stream_putc`: returns `1` on success, `0` otherwise.
pub fn put_char(ctx: &StreamContext, stream: Option<&Stream>, c: u8) -> Result<usize> {
    let stream = match resolve(stream, &ctx.standard_output) {
        Some(s) => s,
        None => return Ok(0),
    };
    match &stream {
        Stream::File(f) => Ok(f.borrow_mut().putc(c) as usize),
        Stream::Mark(m) => {
            let mut m = m.borrow_mut();
            if !m.resident {
                return Err(Error::invalid_stream("Marks used as streams must be resident"));
            }
            let buffer = m.buffer.clone();
            let mut buf = buffer.borrow_mut();
            let mut pos = m.pos;
            let ok = pos_putc(&mut buf, &mut pos, c);
            m.pos = pos;
            Ok(ok as usize)
        }
        Stream::Buffer(b) => {
            let mut buf = b.borrow_mut();
            let mut cursor = buf.cursor;
            let ok = pos_putc(&mut buf, &mut cursor, c);
            buf.cursor = cursor;
            Ok(ok as usize)
        }
        Stream::OutputAccumulator(acc) => {
            acc.borrow_mut().putc(c);
            Ok(1)
        }
        Stream::BufferPos(buffer, pos) => {
            let mut buf = buffer.borrow_mut();
            let mut p = pos.borrow_mut();
            Ok(pos_putc(&mut buf, &mut p, c) as usize)
        }
        Stream::BufferRestriction(buffer) => {
            let mut buf = buffer.borrow_mut();
            let mut pos = buf.restriction_end();
            Ok(pos_putc(&mut buf, &mut pos, c) as usize)
        }
        Stream::Callable(callable) => Ok(ctx
            .gc
            .with_inhibited(|| callable.borrow_mut().write(CallArg::Char(c as i64)))
            .map(|_| 1)
            .unwrap_or(0)),
        Stream::StatusLine(status) => {
            status.borrow_mut().post_bytes(&[c]);
            Ok(1)
        }
        Stream::Process(proc) => Ok(proc.borrow_mut().write_to_process(&[c]).map(|n| n.min(1)).unwrap_or(0)),
        Stream::InputCursor(_) => Err(Error::invalid_stream("stream is not writable")),
    }
}

/// `put-bytes` / `stream_puts`: bulk write, returns bytes written.
pub fn put_bytes(ctx: &StreamContext, stream: Option<&Stream>, bytes: &[u8]) -> Result<usize> {
    let stream = match resolve(stream, &ctx.standard_output) {
        Some(s) => s,
        None => return Ok(0),
    };
    match &stream {
        Stream::File(f) => Ok(f.borrow_mut().write_bytes(bytes)),
        Stream::Mark(m) => {
            let mut m = m.borrow_mut();
            if !m.resident {
                return Err(Error::invalid_stream("Marks used as streams must be resident"));
            }
            let buffer = m.buffer.clone();
            let mut buf = buffer.borrow_mut();
            let mut pos = m.pos;
            let n = pos_puts(&mut buf, &mut pos, bytes).unwrap_or(0);
            m.pos = pos;
            Ok(n)
        }
        Stream::Buffer(b) => {
            let mut buf = b.borrow_mut();
            let mut cursor = buf.cursor;
            let n = pos_puts(&mut buf, &mut cursor, bytes).unwrap_or(0);
            buf.cursor = cursor;
            Ok(n)
        }
        Stream::OutputAccumulator(acc) => {
            acc.borrow_mut().puts(bytes);
            Ok(bytes.len())
        }
        Stream::BufferPos(buffer, pos) => {
            let mut buf = buffer.borrow_mut();
            let mut p = pos.borrow_mut();
            Ok(pos_puts(&mut buf, &mut p, bytes).unwrap_or(0))
        }
        Stream::BufferRestriction(buffer) => {
            let mut buf = buffer.borrow_mut();
            let mut pos = buf.restriction_end();
            Ok(pos_puts(&mut buf, &mut pos, bytes).unwrap_or(0))
        }
        Stream::Callable(callable) => {
            let payload = bytes.to_vec();
            let n = ctx.gc.with_inhibited(|| callable.borrow_mut().write(CallArg::Bytes(payload)));
            Ok(n.unwrap_or(bytes.len()))
        }
        Stream::StatusLine(status) => {
            status.borrow_mut().post_bytes(bytes);
            Ok(bytes.len())
        }
        Stream::Process(proc) => Ok(proc.borrow_mut().write_to_process(bytes).unwrap_or(0)),
        Stream::InputCursor(_) => Err(Error::invalid_stream("stream is not writable")),
    }
}

/// `streamp`: structural check against the eight shapes. Always `true`
/// here since `Stream`'s variant set *is* the eight shapes; kept as a
/// function so callers that hold an untyped value elsewhere in the
/// interpreter have a single place to ask the question.
pub fn streamp(_stream: &Stream) -> bool {
    true
}
