pub mod device;
pub mod error;
pub mod event;
pub mod stimulus;
pub mod trial;

pub use device::{AudioOutput, ImageSource, KeyInput, KeyPress, StimulusDisplay};
pub use error::{PsylabError, Result};
pub use event::EventKind;
pub use stimulus::{AudioCategory, AudioCue, CueId, ImageId};
pub use trial::{Trial, TrialState};
