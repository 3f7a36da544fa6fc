//! Polymorphic character stream subsystem for an embedded Lisp
//! interpreter: a closed set of backing values (files, editor buffers,
//! marks, callables, string cursors/accumulators, the status line, and
//! subprocess pipes) dispatched through four primitive operations, plus
//! the derived operations layered on top of them.
//!
//! The interpreter's value system, buffer model, and garbage collector
//! are external collaborators; this crate only depends on the minimal
//! shapes declared in [`value`].

pub mod error;
pub mod escape;
pub mod gc;
pub mod interrupt;
pub mod ops;
pub mod position;
pub mod stream;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use stream::{get_char, put_bytes, put_char, streamp, unget_char, Stream, StreamContext};
