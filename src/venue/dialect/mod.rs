//! Per-venue wire dialects: URL construction, control messages, and login
//! framing for the two exemplar wire protocols this crate supports.

pub mod channel_arg;
pub mod combined_stream;
