/// Wire-level codecs: point geometry and pagination cursors
pub mod cursor;
pub mod geometry;

pub use cursor::CursorError;
pub use geometry::GeometryError;
