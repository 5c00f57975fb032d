use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one image among those an image source listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub usize);

/// Pitch category of an audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCategory {
    Low,
    High,
}

impl AudioCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioCategory::Low => "low",
            AudioCategory::High => "high",
        }
    }
}

impl fmt::Display for AudioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle issued by an audio collaborator for one playable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CueId(pub usize);

/// A playable cue. Its playback status lives in the audio collaborator that
/// issued it and is polled through [`crate::AudioOutput::is_finished`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCue {
    id: CueId,
    category: AudioCategory,
}

impl AudioCue {
    pub fn new(id: CueId, category: AudioCategory) -> Self {
        Self { id, category }
    }

    pub fn id(&self) -> CueId {
        self.id
    }

    pub fn category(&self) -> AudioCategory {
        self.category
    }
}
