//! Audio storage and playback.
//!
//! Float WAV writing/reading and an in-memory playable handle.

pub mod playback;
pub mod wav;

pub use playback::PlayableHandle;
pub use wav::{read_wav, samples_to_duration, write_wav, write_wav_to_buffer};
