//! Creating and consuming data in wire format.

use bytes::{BufMut, BytesMut};
use core::fmt;
use octseq::parse::ShortInput;

//------------ compose functions ---------------------------------------------

/// Composes some data prefixed by its length.
///
/// # Panics
///
/// The function panics if the length of the composed data is greater than
/// 0xFFFF.
pub fn compose_len_prefixed<F>(target: &mut BytesMut, op: F)
where
    F: FnOnce(&mut BytesMut),
{
    target.put_u16(0);
    let pos = target.len();
    op(target);
    let len = u16::try_from(target.len() - pos).expect("long data");
    target[pos - 2..pos].copy_from_slice(&len.to_be_bytes());
}

//------------ ParseError ----------------------------------------------------

/// An error happened while parsing data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// An attempt was made to go beyond the end of the parser.
    ShortInput,

    /// A formatting error occurred.
    Form(FormError),
}

impl ParseError {
    /// Creates a new parse error as a form error with the given message.
    pub fn form_error(msg: &'static str) -> Self {
        FormError::new(msg).into()
    }
}

//--- From

impl From<ShortInput> for ParseError {
    fn from(_: ShortInput) -> Self {
        ParseError::ShortInput
    }
}

impl From<FormError> for ParseError {
    fn from(err: FormError) -> Self {
        ParseError::Form(err)
    }
}

//--- Display and Error

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::ShortInput => f.write_str("unexpected end of input"),
            ParseError::Form(ref err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ParseError {}

//------------ FormError -----------------------------------------------------

/// A formatting error occured.
///
/// This is a generic error for all kinds of error cases that result in data
/// not being accepted. For diagnostics, the error is being given a static
/// string describing the error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormError(&'static str);

impl FormError {
    /// Creates a new form error value with the given diagnostics string.
    pub fn new(msg: &'static str) -> Self {
        FormError(msg)
    }
}

//--- Display and Error

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for FormError {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn len_prefixed() {
        let mut buf = BytesMut::new();
        buf.put_u8(7);
        compose_len_prefixed(&mut buf, |buf| buf.put_slice(b"abc"));
        assert_eq!(buf.as_ref(), b"\x07\x00\x03abc");
    }
}
