//! Time coordinates shared by clips and overlaps: play direction,
//! millisecond/sample conversion and the signed read cursor.

pub mod cursor;
pub mod direction;
pub mod time;

pub use cursor::SampleCursor;
pub use direction::PlayDirection;
