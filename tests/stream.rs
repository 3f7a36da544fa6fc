use std::cell::RefCell;
use std::rc::Rc;

use lispstreams::ops::{make_string_input_stream, make_string_output_stream};
use lispstreams::stream::{get_char, put_bytes, put_char, unget_char};
use lispstreams::value::{Buffer, Mark, Position};
use lispstreams::{Stream, StreamContext};

#[test]
fn default_input_falls_back_to_standard_input() {
    let mut ctx = StreamContext::default();
    ctx.standard_input = Some(make_string_input_stream(b"xy".to_vec(), None));
    assert_eq!(get_char(&ctx, None).unwrap(), Some(b'x'));
    assert_eq!(get_char(&ctx, None).unwrap(), Some(b'y'));
    assert_eq!(get_char(&ctx, None).unwrap(), None);
}

#[test]
fn mark_stream_reads_through_its_buffer() {
    let ctx = StreamContext::default();
    let buffer = Rc::new(RefCell::new(Buffer::from_text("hi\nthere")));
    let mark = Rc::new(RefCell::new(Mark::new(buffer.clone(), Position::new(0, 0))));
    let stream = Stream::Mark(mark.clone());
    assert_eq!(get_char(&ctx, Some(&stream)).unwrap(), Some(b'h'));
    assert_eq!(get_char(&ctx, Some(&stream)).unwrap(), Some(b'i'));
    assert_eq!(get_char(&ctx, Some(&stream)).unwrap(), Some(b'\n'));
    assert_eq!(mark.borrow().pos, Position::new(1, 0));
}

#[test]
fn buffer_stream_write_inserts_at_cursor() {
    let ctx = StreamContext::default();
    let buffer = Rc::new(RefCell::new(Buffer::from_text("ac")));
    buffer.borrow_mut().cursor = Position::new(0, 1);
    let stream = Stream::Buffer(buffer.clone());
    put_char(&ctx, Some(&stream), b'b').unwrap();
    assert_eq!(buffer.borrow().lines[0], b"abc");
    assert_eq!(buffer.borrow().cursor, Position::new(0, 2));
}

#[test]
fn buffer_restriction_appends_past_restriction_end() {
    let ctx = StreamContext::default();
    let buffer = Rc::new(RefCell::new(Buffer::from_text("ab\ncd")));
    buffer.borrow_mut().restriction_end_row = Some(1);
    let stream = Stream::BufferRestriction(buffer.clone());
    put_bytes(&ctx, Some(&stream), b"X").unwrap();
    assert_eq!(buffer.borrow().lines[0], b"abX");
}

#[test]
fn string_output_stream_round_trips_through_get_output_stream_string() {
    let ctx = StreamContext::default();
    let out = make_string_output_stream();
    put_bytes(&ctx, Some(&out), b"hello ").unwrap();
    put_char(&ctx, Some(&out), b'!').unwrap();
    let text = lispstreams::ops::get_output_stream_string(&out).unwrap();
    assert_eq!(text, b"hello !");
}

#[test]
fn unget_then_reget_returns_same_byte_on_input_cursor() {
    let ctx = StreamContext::default();
    let input = make_string_input_stream(b"ab".to_vec(), None);
    let c = get_char(&ctx, Some(&input)).unwrap().unwrap();
    assert!(unget_char(&ctx, Some(&input), c));
    assert_eq!(get_char(&ctx, Some(&input)).unwrap(), Some(c));
    assert_eq!(get_char(&ctx, Some(&input)).unwrap(), Some(b'b'));
}

#[test]
fn non_resident_mark_signals_invalid_stream() {
    let ctx = StreamContext::default();
    let buffer = Rc::new(RefCell::new(Buffer::from_text("x")));
    let mut mark = Mark::new(buffer, Position::new(0, 0));
    mark.resident = false;
    let stream = Stream::Mark(Rc::new(RefCell::new(mark)));
    let err = put_char(&ctx, Some(&stream), b'x').unwrap_err();
    assert_eq!(*err.kind(), lispstreams::ErrorKind::InvalidStream);
}
