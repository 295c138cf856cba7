// Domain model shared by every pipeline stage.

pub mod codec;
pub mod graph;
pub mod serde_bytes;
pub mod unit;
