//! Line-oriented JSONL I/O with optional gzip and chunked iteration, plus
//! the scoped KGX node/edge writer.

pub mod jsonl;
pub mod kgx_writer;

pub use jsonl::{chunk, read_jsonl, Chunks, JsonlReader, JsonlWriter, StreamError};
pub use kgx_writer::KgxWriter;
