/// Platform module - window boundary and blocking file access

pub mod window;
pub mod file_stream;

pub use window::*;
pub use file_stream::*;
