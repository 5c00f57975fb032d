//! Narrow interfaces to the collaborators the scheduler drives.
//!
//! Window creation, image decoding, tone playback and keyboard handling all
//! live behind these traits so the timing logic can run against fakes.

use crate::{AudioCategory, AudioCue, ImageId, Result};
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Draws stimuli into a back buffer and flips it.
pub trait StimulusDisplay {
    fn draw_fixation(&mut self) -> Result<()>;
    fn draw_image(&mut self, image: ImageId) -> Result<()>;
    /// Flip the back buffer. May wait for vsync, never longer.
    fn present(&mut self) -> Result<()>;

    /// Deliver input that is still queued without drawing anything.
    fn poll_events(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fire-and-forget cue playback with polled completion.
pub trait AudioOutput {
    fn make_cue(&mut self, category: AudioCategory) -> Result<AudioCue>;
    /// Starts playback and returns immediately.
    fn play(&mut self, cue: &AudioCue) -> Result<()>;
    fn is_finished(&self, cue: &AudioCue) -> bool;
}

/// Lists the images available for a run in a stable order.
pub trait ImageSource {
    fn list_images(&mut self) -> Result<Vec<ImageId>>;
}

/// One press of a registered key, stamped with the timer reading taken when
/// the key went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub at: Duration,
}

/// Keyboard registration. Presses arrive on the returned channel and are
/// drained by the scheduler at safe points.
pub trait KeyInput {
    fn on_key(&mut self, key: &str) -> Result<Receiver<KeyPress>>;
    fn remove_key(&mut self, key: &str) -> Result<()>;
}
