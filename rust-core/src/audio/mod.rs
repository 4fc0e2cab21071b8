//! Sample history and per-channel frame scheduling

pub mod buffer;
pub mod channel;

pub use buffer::{RingCursor, Segments};
pub use channel::ChannelState;
