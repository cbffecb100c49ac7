//! The `errors` module defines the crate-wide error type.
//!
//! Frame parsing itself does not use this type: `Parser::parse_frame` reports
//! outcomes through `FrameStatus`, since `Incomplete` and `NoSync` are routine,
//! expected control flow for a streaming parser rather than exceptional
//! conditions. `Error` is reserved for the smaller set of APIs that really do
//! have a binary success/failure shape, such as decoding a `udts` box.

use std::error;
use std::fmt;

/// `Error` enumerates failures reported outside of frame parsing.
#[derive(Debug)]
pub enum Error {
    /// A `udts` box, or other auxiliary structure, was truncated or malformed.
    Malformed(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Malformed(ref msg) => write!(f, "malformed input: {}", msg),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Constructs a `Result::Err(Error::Malformed(..))`.
pub fn malformed<T>(desc: &'static str) -> Result<T> {
    Err(Error::Malformed(desc))
}
