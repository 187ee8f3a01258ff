//! Playback ordering: which playlist entry comes next under the active [`PlayMode`].
pub mod error;
mod logic;
mod play_mode;
pub use logic::Sequencer;
pub use play_mode::PlayMode;
