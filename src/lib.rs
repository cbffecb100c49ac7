//! A parser for the DTS-UHD (DTS:X Profile 2) audio bitstream, as specified
//! by ETSI TS 103 491.
//!
//! The entry point is [`Parser`]: feed it successive frames from a `STRMDATA`
//! payload (see [`locate_strmdata`] for pulling one out of a `DTSHDHDR`
//! container) and it reports per-frame timing through [`FrameInfo`] and, for
//! sync frames, a stream [`Descriptor`] describing the default audio
//! program. [`write_udts_box`]/[`read_udts_box`] serialize a `Descriptor` for
//! callers that need to carry it across a process boundary.
//!
//! ```no_run
//! use dtsuhd::{FrameInfo, FrameStatus, Parser};
//!
//! let mut parser = Parser::new();
//! let mut info = FrameInfo::default();
//! let frame: &[u8] = &[]; // one frame's worth of bytes from the stream
//! match parser.parse_frame(frame, Some(&mut info), None) {
//!     FrameStatus::Ok => println!("{} samples at {} Hz", info.sample_count, info.sample_rate),
//!     FrameStatus::Incomplete => {} // read more bytes and retry
//!     FrameStatus::NoSync | FrameStatus::InvalidFrame => {} // resynchronize
//! }
//! ```

mod bitreader;
mod bitwriter;
mod channels;
mod container;
mod crc;
mod descriptor;
mod errors;
mod md01;
mod navi;
mod object;
mod parser;
mod udts;
mod vlc;

pub use channels::Channels;
pub use container::{is_syncword, locate_strmdata, StrmDataLocation, MAX_FRAME_SIZE, RECOMMENDED_BUFFER_SIZE};
pub use descriptor::Descriptor;
pub use errors::{Error, Result};
pub use object::{MDObject, RepType};
pub use parser::{FrameInfo, FrameStatus, Parser};
pub use udts::{read_udts_box, write_udts_box};
