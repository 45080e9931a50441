//! I/O wrappers shared by the codec sessions.

pub mod counting;

pub use counting::CountingWriter;
