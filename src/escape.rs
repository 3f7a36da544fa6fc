//! §4.3 escape-sequence reader, grounded in `stream_read_esc`
//! (`original_source/src/streams.c`).
//!
//! `read_escape` is handed the character immediately following a `\`
//! that the caller has already consumed, plus the stream to keep
//! reading lookahead from, and returns the resolved byte together with
//! the next lookahead character (mirroring the C source's in/out
//! `*c_p` parameter). Most escapes read exactly one character past the
//! resolved sequence to prime that lookahead; the octal and hex paths
//! are the exception, since they already hold the next lookahead the
//! moment they decide to stop.

use crate::stream::{get_char, Stream, StreamContext};

fn next(ctx: &StreamContext, stream: Option<&Stream>) -> Option<u8> {
    get_char(ctx, stream).unwrap_or(None)
}

/// Resolve one escape sequence. `first` is the character right after the
/// backslash. Returns `(resolved_byte, lookahead)`, where `lookahead` is
/// the next unconsumed character (`None` at EOF).
pub fn read_escape(ctx: &StreamContext, stream: Option<&Stream>, first: u8) -> (u8, Option<u8>) {
    match first {
        b'0'..=b'7' => read_octal(ctx, stream, first),
        b'x' => read_hex(ctx, stream),
        b'^' => {
            let ctrl = next(ctx, stream);
            let c = ctrl.map(|b| b.to_ascii_uppercase() ^ 0x40).unwrap_or(0x40);
            (c, next(ctx, stream))
        }
        other => {
            let c = match other {
                b'n' => b'\n',
                b'r' => b'\r',
                b'f' => 0x0c,
                b't' => b'\t',
                b'v' => 0x0b,
                b'a' => 0x07,
                _ => other,
            };
            (c, next(ctx, stream))
        }
    }
}

fn read_octal(ctx: &StreamContext, stream: Option<&Stream>, first: u8) -> (u8, Option<u8>) {
    let mut c = first - b'0';
    let second = next(ctx, stream);
    let second_digit = match second {
        Some(b) if (b'0'..=b'7').contains(&b) => b,
        _ => return (c, second),
    };
    c = c.wrapping_mul(8).wrapping_add(second_digit - b'0');
    let third = next(ctx, stream);
    let third_digit = match third {
        Some(b) if (b'0'..=b'7').contains(&b) => b,
        _ => return (c, third),
    };
    c = c.wrapping_mul(8).wrapping_add(third_digit - b'0');
    (c, next(ctx, stream))
}

fn read_hex(ctx: &StreamContext, stream: Option<&Stream>) -> (u8, Option<u8>) {
    let mut c: u8 = 0;
    loop {
        let lookahead = next(ctx, stream);
        match lookahead {
            Some(b) if b.is_ascii_hexdigit() => {
                let digit = if b.is_ascii_digit() {
                    b - b'0'
                } else {
                    b.to_ascii_uppercase() - b'A' + 10
                };
                c = c.wrapping_mul(16).wrapping_add(digit);
            }
            _ => return (c, lookahead),
        }
    }
}
