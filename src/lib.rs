//! gridseq - a grid-based, look-ahead sample sequencer
//!
//! - `sequencer`: transport state machine, look-ahead scheduler, gain/mute
//!   control and notifications
//! - `pipeline`: the grid data model, transport state and engine config
//! - `audio`: a cpal output that starts samples on exact frames
//! - `loader`: WAV decoding into registered sample handles
//! - `middle`: turns front-end input into sequencer operations and
//!   notifications into display state

pub mod audio;
pub mod audio_api;
pub mod error;
pub mod loader;
pub mod logging;
pub mod middle;
pub mod pipeline;
pub mod sequencer;
pub mod shared;

// Re-export commonly used types
pub use audio_api::{AssetRef, AudioClock, AudioOutput, BusId, TriggerRequest};
pub use error::EngineError;
pub use pipeline::config::EngineConfig;
pub use pipeline::project::{Placement, Track, TrackRegistry};
pub use sequencer::{Notification, NotificationKind, Runner, Sequencer};
pub use shared::TransportStatus;
