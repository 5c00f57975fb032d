use psylab_core::{AudioCategory, AudioCue, AudioOutput, CueId, PsylabError, Result};
use psylab_experiment::RunConfiguration;
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;
use tracing::{debug, info};

const AMPLITUDE: f32 = 0.25;

/// Pitch per category and length shared by every cue of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSettings {
    pub duration: Duration,
    pub low_hz: f32,
    pub high_hz: f32,
}

impl ToneSettings {
    pub fn from_config(config: &RunConfiguration) -> Result<Self> {
        let duration = Duration::try_from_secs_f64(config.audio_duration).map_err(|e| {
            PsylabError::config(format!("audio_duration {}: {e}", config.audio_duration))
        })?;
        for (name, hz) in [
            ("low_frequency_hz", config.low_frequency_hz),
            ("high_frequency_hz", config.high_frequency_hz),
        ] {
            if !(hz.is_finite() && hz > 0.0) {
                return Err(PsylabError::config(format!(
                    "{name} must be a positive frequency, got {hz}"
                )));
            }
        }
        Ok(Self {
            duration,
            low_hz: config.low_frequency_hz,
            high_hz: config.high_frequency_hz,
        })
    }

    pub fn frequency(&self, category: AudioCategory) -> f32 {
        match category {
            AudioCategory::Low => self.low_hz,
            AudioCategory::High => self.high_hz,
        }
    }
}

struct DeviceTone {
    category: AudioCategory,
    frequency_hz: f32,
    sink: Option<Sink>,
}

/// Sine cues played on the default output device.
///
/// Each `play` queues a fresh tone on its own sink, which stops a previous
/// playback of the same cue. A cue is finished once its sink has drained.
pub struct DeviceAudio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    settings: ToneSettings,
    tones: Vec<DeviceTone>,
}

impl DeviceAudio {
    pub fn open(settings: ToneSettings) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| PsylabError::Audio(format!("cannot open the output device: {e}")))?;
        info!(
            low_hz = settings.low_hz,
            high_hz = settings.high_hz,
            duration = ?settings.duration,
            "audio output opened"
        );
        Ok(Self {
            _stream: stream,
            handle,
            settings,
            tones: Vec::new(),
        })
    }

    fn tone_index(&self, cue: &AudioCue) -> Result<usize> {
        let index = cue.id().0;
        match self.tones.get(index) {
            Some(tone) if tone.category == cue.category() => Ok(index),
            _ => Err(PsylabError::Audio(format!("unknown cue {:?}", cue.id()))),
        }
    }
}

impl AudioOutput for DeviceAudio {
    fn make_cue(&mut self, category: AudioCategory) -> Result<AudioCue> {
        self.tones.push(DeviceTone {
            category,
            frequency_hz: self.settings.frequency(category),
            sink: None,
        });
        Ok(AudioCue::new(CueId(self.tones.len() - 1), category))
    }

    fn play(&mut self, cue: &AudioCue) -> Result<()> {
        let index = self.tone_index(cue)?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| PsylabError::Audio(format!("cannot start a tone: {e}")))?;
        let tone = &mut self.tones[index];
        sink.append(
            SineWave::new(tone.frequency_hz)
                .take_duration(self.settings.duration)
                .amplify(AMPLITUDE),
        );
        tone.sink = Some(sink);
        debug!(cue = %tone.category, hz = tone.frequency_hz, "tone started");
        Ok(())
    }

    fn is_finished(&self, cue: &AudioCue) -> bool {
        self.tone_index(cue)
            .ok()
            .and_then(|i| self.tones[i].sink.as_ref())
            .is_some_and(Sink::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psylab_timing::{ManualTimer, Timer};

    /// Finishes `duration` after its last start on the shared timer.
    struct TimedTone<T: Timer> {
        timer: T,
        settings: ToneSettings,
        started: Vec<(AudioCategory, Option<Duration>)>,
    }

    impl<T: Timer> TimedTone<T> {
        fn new(timer: T, settings: ToneSettings) -> Self {
            Self {
                timer,
                settings,
                started: Vec::new(),
            }
        }
    }

    impl<T: Timer> AudioOutput for TimedTone<T> {
        fn make_cue(&mut self, category: AudioCategory) -> Result<AudioCue> {
            self.started.push((category, None));
            Ok(AudioCue::new(CueId(self.started.len() - 1), category))
        }

        fn play(&mut self, cue: &AudioCue) -> Result<()> {
            let now = self.timer.now();
            match self.started.get_mut(cue.id().0) {
                Some((category, started)) if *category == cue.category() => {
                    *started = Some(now);
                    Ok(())
                }
                _ => Err(PsylabError::Audio(format!("unknown cue {:?}", cue.id()))),
            }
        }

        fn is_finished(&self, cue: &AudioCue) -> bool {
            match self.started.get(cue.id().0) {
                Some((_, Some(at))) => self.timer.elapsed(*at) >= self.settings.duration,
                _ => false,
            }
        }
    }

    fn settings() -> ToneSettings {
        ToneSettings::from_config(&RunConfiguration::default()).unwrap()
    }

    #[test]
    fn settings_follow_the_configuration() {
        let s = settings();
        assert_eq!(s.duration, Duration::from_millis(200));
        assert_eq!(s.frequency(AudioCategory::Low), 440.0);
        assert_eq!(s.frequency(AudioCategory::High), 500.0);
    }

    #[test]
    fn unrepresentable_duration_is_a_configuration_error() {
        let config = RunConfiguration {
            audio_duration: 1e20,
            ..RunConfiguration::default()
        };
        assert!(ToneSettings::from_config(&config).unwrap_err().is_config());
    }

    #[test]
    fn invalid_frequencies_are_configuration_errors() {
        let config = RunConfiguration {
            high_frequency_hz: 0.0,
            ..RunConfiguration::default()
        };
        assert!(ToneSettings::from_config(&config).unwrap_err().is_config());

        let config = RunConfiguration {
            low_frequency_hz: f32::NAN,
            ..RunConfiguration::default()
        };
        assert!(ToneSettings::from_config(&config).is_err());
    }

    #[test]
    fn timed_tone_finishes_after_the_configured_duration() {
        let timer = ManualTimer::new();
        let mut audio = TimedTone::new(timer.clone(), settings());
        let cue = audio.make_cue(AudioCategory::Low).unwrap();
        assert!(!audio.is_finished(&cue));

        audio.play(&cue).unwrap();
        timer.advance(Duration::from_millis(199));
        assert!(!audio.is_finished(&cue));
        timer.advance(Duration::from_millis(1));
        assert!(audio.is_finished(&cue));

        audio.play(&cue).unwrap();
        assert!(!audio.is_finished(&cue));
    }

    #[test]
    fn timed_tone_rejects_foreign_cues() {
        let mut audio = TimedTone::new(ManualTimer::new(), settings());
        let stranger = AudioCue::new(CueId(3), AudioCategory::Low);
        assert!(matches!(audio.play(&stranger), Err(PsylabError::Audio(_))));
        assert!(!audio.is_finished(&stranger));
    }
}
