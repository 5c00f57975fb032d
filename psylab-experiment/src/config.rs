use psylab_core::{PsylabError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the per-trial cue sequence is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuePolicy {
    /// Exactly `low_cue_count` + `high_cue_count` cues, shuffled once.
    #[default]
    PreShuffled,
    /// Random draw per trial, forced once one category's quota is met.
    CountBalanced,
}

/// Everything a run needs, fixed before the first trial.
///
/// Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    pub fixation_duration: f64,
    pub stimulus_duration: f64,
    /// Time into the stimulus phase at which the cue starts.
    pub audio_trigger_offset: f64,
    pub audio_duration: f64,
    pub low_cue_count: usize,
    pub high_cue_count: usize,
    pub cue_policy: CuePolicy,
    pub low_frequency_hz: f32,
    pub high_frequency_hz: f32,
    pub trigger_key: String,
    pub image_dir: PathBuf,
    /// File extension of image files, without the dot.
    pub image_suffix: String,
    /// Width and height of the image box as fractions of the screen.
    pub image_size: (f32, f32),
    /// Extent of the fixation cross as a fraction of the screen height.
    pub fixation_size: f32,
    pub output_path: PathBuf,
    /// Seeds the image and cue shuffles. Random when absent.
    pub seed: Option<u64>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            fixation_duration: 0.1,
            stimulus_duration: 0.4,
            audio_trigger_offset: 0.1,
            audio_duration: 0.2,
            low_cue_count: 15,
            high_cue_count: 5,
            cue_policy: CuePolicy::PreShuffled,
            low_frequency_hz: 440.0,
            high_frequency_hz: 500.0,
            trigger_key: "space".to_string(),
            image_dir: PathBuf::from("images"),
            image_suffix: "jpg".to_string(),
            image_size: (0.5, 0.375),
            fixation_size: 0.05,
            output_path: PathBuf::from("exampleOutput.csv"),
            seed: None,
        }
    }
}

impl RunConfiguration {
    /// Loads overrides from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(PsylabError::config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PsylabError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn total_cues(&self) -> usize {
        self.low_cue_count + self.high_cue_count
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("fixation_duration", self.fixation_duration),
            ("stimulus_duration", self.stimulus_duration),
            ("audio_trigger_offset", self.audio_trigger_offset),
            ("audio_duration", self.audio_duration),
        ];
        for (name, value) in durations {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(PsylabError::config(format!(
                    "{name} must be a non-negative, representable number of seconds, got {value}"
                )));
            }
        }
        if self.audio_trigger_offset >= self.stimulus_duration {
            return Err(PsylabError::config(format!(
                "audio_trigger_offset ({}) must be shorter than stimulus_duration ({})",
                self.audio_trigger_offset, self.stimulus_duration
            )));
        }
        if self.total_cues() == 0 {
            return Err(PsylabError::config("at least one audio cue is required"));
        }
        if self.trigger_key.trim().is_empty() {
            return Err(PsylabError::config("trigger_key must not be empty"));
        }
        Ok(())
    }
}
