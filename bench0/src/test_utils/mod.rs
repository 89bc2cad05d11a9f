//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the trait APIs are usable and give the
//! orchestration crates something to exercise without a live network.

mod countdown_component;
mod journal;
mod loopback_node;
mod recording_sink;

pub use countdown_component::CountdownComponent;
pub use journal::Journal;
pub use loopback_node::{DownloadOutcome, LoopbackDownload, LoopbackHandle, LoopbackNode};
pub use recording_sink::RecordingSink;
