mod byte_offset;
mod time_cursor;

pub use byte_offset::{ByteOffsetReader, LineUnwrapper};
pub use time_cursor::TimeCursorReader;
