//! Minimal shape for the Lisp-value and editor-buffer collaborators that
//! spec.md §1 declares out of scope ("the core only uses their exposed
//! predicates, accessors, and constructors"). This module gives those
//! collaborators just enough concrete form for the stream subsystem to
//! compile and be tested standalone; it is not a Lisp value system.

use std::cell::RefCell;
use std::rc::Rc;

/// A `(row, col)` pair addressing a cell inside a buffer's line array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Position {
        Position { row, col }
    }
}

/// The editor buffer collaborator: a line array plus a cursor and a
/// restriction window, standing in for the buffer model spec.md §1 places
/// out of scope. Lines do not store their own trailing newline; `ln_len`
/// below is `line.len() + 1` to match the C source's "terminator slot"
/// convention (`ln_Strlen` includes the newline).
#[derive(Debug, Default)]
pub struct Buffer {
    pub lines: Vec<Vec<u8>>,
    pub cursor: Position,
    /// Exclusive end-of-restriction row; `None` means "whole buffer".
    pub restriction_end_row: Option<usize>,
    pub read_only: bool,
}

impl Buffer {
    pub fn new(lines: Vec<Vec<u8>>) -> Buffer {
        Buffer { lines, cursor: Position::new(0, 0), restriction_end_row: None, read_only: false }
    }

    pub fn from_text(text: &str) -> Buffer {
        let lines = text.split('\n').map(|l| l.as_bytes().to_vec()).collect();
        Buffer::new(lines)
    }

    /// Logical end-of-buffer row (exclusive), respecting any restriction.
    pub fn end_row(&self) -> usize {
        self.restriction_end_row.unwrap_or(self.lines.len())
    }

    /// `ln_Strlen`: line length plus one terminator slot.
    pub fn line_len(&self, row: usize) -> usize {
        self.lines[row].len() + 1
    }

    /// The position at the end of the current restriction, used by the
    /// `(Buffer . t)` stream variant.
    pub fn restriction_end(&self) -> Position {
        let row = self.end_row().saturating_sub(1).min(self.lines.len().saturating_sub(1));
        Position::new(row, self.lines.get(row).map(|l| l.len()).unwrap_or(0))
    }

    /// `pad_pos`: if `pos` lies past the current line end, pad with spaces
    /// so an insertion at `pos` is contiguous. Returns `false` if `pos` is
    /// out of range of the buffer entirely.
    pub fn pad_pos(&mut self, pos: Position) -> bool {
        if pos.row >= self.lines.len() {
            return false;
        }
        let line = &mut self.lines[pos.row];
        if pos.col > line.len() {
            line.resize(pos.col, b' ');
        }
        true
    }

    /// `insert_string`: splice `bytes` into the line array at `pos`,
    /// returning the position just past the inserted text, or `None` on
    /// failure (read-only buffer, or `pos` out of range).
    pub fn insert_string(&mut self, bytes: &[u8], pos: Position) -> Option<Position> {
        if self.read_only || !self.pad_pos(pos) {
            return None;
        }
        let mut row = pos.row;
        let mut col = pos.col;
        for &b in bytes {
            if b == b'\n' {
                let rest = self.lines[row].split_off(col);
                self.lines.insert(row + 1, rest);
                row += 1;
                col = 0;
            } else {
                self.lines[row].insert(col, b);
                col += 1;
            }
        }
        Some(Position::new(row, col))
    }
}

/// A buffer + position pair kept up to date across edits by the (out of
/// scope) editor layer; "resident" means attached to a loaded buffer.
pub struct Mark {
    pub buffer: Rc<RefCell<Buffer>>,
    pub pos: Position,
    pub resident: bool,
}

impl Mark {
    pub fn new(buffer: Rc<RefCell<Buffer>>, pos: Position) -> Mark {
        Mark { buffer, pos, resident: true }
    }
}

/// Stand-in for the subprocess collaborator (`write_to_process`).
pub trait ProcessSink {
    fn write_to_process(&mut self, bytes: &[u8]) -> std::io::Result<usize>;
}

/// Stand-in for the editor status-line / minibuffer message collaborator.
#[derive(Debug, Default)]
pub struct StatusLine {
    message: Option<Vec<u8>>,
    pub dirty: bool,
}

impl StatusLine {
    pub fn post_bytes(&mut self, bytes: &[u8]) {
        match &mut self.message {
            Some(buf) => buf.extend_from_slice(bytes),
            None => self.message = Some(bytes.to_vec()),
        }
        self.dirty = true;
    }

    pub fn message(&self) -> Option<&[u8]> {
        self.message.as_deref()
    }
}

/// Payload passed to a callable stream on write: either a single character
/// code or a bulk byte run, mirroring `stream_putc` vs `stream_puts`.
pub enum CallArg {
    Char(i64),
    Bytes(Vec<u8>),
}

/// A user-supplied callable used as a character source and/or sink.
/// Modeled as a trait object rather than reimplementing generic Lisp
/// `apply`, since the Lisp value/apply machinery is an out-of-scope
/// collaborator (spec.md §1).
pub trait Callable {
    /// Invoked with no arguments to pull the next character; `None` is EOF.
    fn read(&mut self) -> Option<i64>;
    /// Invoked with the character to push back; `true` on success.
    fn unget(&mut self, c: i64) -> bool {
        let _ = c;
        false
    }
    /// Invoked with a char or byte-run payload; `None` means failure,
    /// `Some(n)` overrides the byte count reported to the caller.
    fn write(&mut self, data: CallArg) -> Option<usize>;
}

/// Minimal Lisp-value surface `format`'s `%s`/`%S` specifiers print and
/// callable streams exchange with their invoker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Int(i64),
    Str(String),
    Symbol(String),
}

/// Stand-in for the (out of scope) Lisp printer: `princ` (unquoted) and
/// `print`/`prin1` (readable) renderings, which `format`'s `%s`/`%S` and
/// `ops::print`/`ops::princ` delegate to.
pub trait Printer {
    fn princ(&self) -> String;
    fn print(&self) -> String;
}

impl Printer for Value {
    fn princ(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Symbol(s) => s.clone(),
        }
    }

    fn print(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Str(s) => format!("{:?}", s),
            Value::Symbol(s) => s.clone(),
        }
    }
}
