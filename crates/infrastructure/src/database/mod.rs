pub mod sqlite_buffer;

pub use sqlite_buffer::SQLiteBuffer;
