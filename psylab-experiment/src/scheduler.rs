use crate::config::RunConfiguration;
use crate::cue_pool::AudioCuePool;
use crate::event_log::EventLog;
use psylab_core::{
    AudioCategory, AudioOutput, EventKind, ImageId, KeyPress, Result, StimulusDisplay, Trial,
    TrialState,
};
use psylab_timing::{Clock, Timer};
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

/// Phase lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PhaseTiming {
    fixation: f64,
    stimulus: f64,
    audio_offset: f64,
}

/// What one trial did with its cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub index: usize,
    pub image: ImageId,
    pub category: AudioCategory,
    pub audio_started: bool,
    pub audio_finished: bool,
}

/// Borrowed resources one trial runs against.
pub struct Stage<'a, T: Timer, D: ?Sized, A: ?Sized> {
    /// Global clock, reset once at run start.
    pub clock: &'a Clock<T>,
    pub display: &'a mut D,
    pub audio: &'a mut A,
    pub cues: &'a mut AudioCuePool,
    pub log: &'a mut EventLog,
    pub keys: Option<&'a Receiver<KeyPress>>,
}

impl<T: Timer, D: ?Sized, A: ?Sized> Stage<'_, T, D, A> {
    fn stamp(&mut self, kind: EventKind) -> f64 {
        let t = self.clock.elapsed();
        self.log.record(kind, t);
        t
    }

    fn drain_keys(&mut self) -> usize {
        match self.keys {
            Some(keys) => drain_keys(self.clock, self.log, keys),
            None => 0,
        }
    }
}

/// Moves every queued key press into the log without blocking. Each press
/// keeps the timer reading it was taken with.
pub fn drain_keys<T: Timer>(
    clock: &Clock<T>,
    log: &mut EventLog,
    keys: &Receiver<KeyPress>,
) -> usize {
    let mut drained = 0;
    while let Ok(press) = keys.try_recv() {
        let t = clock.at(press.at);
        log.record(EventKind::KeyPress, t);
        debug!(key = %press.key, t, "key press");
        drained += 1;
    }
    drained
}

/// Drives a single trial through fixation and stimulus phases.
///
/// Each phase is a busy-wait loop on a phase-local clock: every iteration
/// draws, flips and drains input, so the loop can never sleep.
#[derive(Debug)]
pub struct TrialScheduler {
    timing: PhaseTiming,
    state: TrialState,
    completed: usize,
}

impl TrialScheduler {
    pub fn new(config: &RunConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            timing: PhaseTiming {
                fixation: config.fixation_duration,
                stimulus: config.stimulus_duration,
                audio_offset: config.audio_trigger_offset,
            },
            state: TrialState::Idle,
            completed: 0,
        })
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    /// Trials run to completion so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Runs `trial` to completion. Any collaborator failure aborts the trial
    /// with the scheduler left in the phase that failed.
    pub fn run_trial<T, D, A>(
        &mut self,
        trial: &Trial,
        stage: &mut Stage<'_, T, D, A>,
    ) -> Result<TrialOutcome>
    where
        T: Timer,
        D: StimulusDisplay + ?Sized,
        A: AudioOutput + ?Sized,
    {
        debug_assert_eq!(self.state, TrialState::Idle);

        self.state = self.state.next();
        self.fixation_phase(stage)?;

        self.state = self.state.next();
        let outcome = self.stimulus_phase(trial, stage)?;

        self.state = self.state.next();
        self.completed += 1;
        Ok(outcome)
    }

    fn fixation_phase<T, D, A>(&self, stage: &mut Stage<'_, T, D, A>) -> Result<()>
    where
        T: Timer,
        D: StimulusDisplay + ?Sized,
        A: ?Sized,
    {
        let start = stage.stamp(EventKind::FixationStart);
        let phase = stage.clock.fork();
        while phase.elapsed() < self.timing.fixation {
            stage.display.draw_fixation()?;
            stage.display.present()?;
            stage.drain_keys();
        }
        let end = stage.stamp(EventKind::FixationEnd);
        stage.drain_keys();
        debug!(start, end, "fixation");
        Ok(())
    }

    fn stimulus_phase<T, D, A>(
        &self,
        trial: &Trial,
        stage: &mut Stage<'_, T, D, A>,
    ) -> Result<TrialOutcome>
    where
        T: Timer,
        D: StimulusDisplay + ?Sized,
        A: AudioOutput + ?Sized,
    {
        let start = stage.stamp(EventKind::StimulusStart);
        let phase = stage.clock.fork();
        let cue = stage.cues.next_cue()?;

        let mut audio_triggered = false;
        let mut audio_end_recorded = false;
        while phase.elapsed() < self.timing.stimulus {
            stage.display.draw_image(trial.image)?;
            stage.display.present()?;
            stage.drain_keys();

            if !audio_triggered && phase.elapsed() >= self.timing.audio_offset {
                let t = stage.stamp(EventKind::AudioStart);
                stage.audio.play(&cue)?;
                audio_triggered = true;
                debug!(t, category = %cue.category(), "cue started");
            }

            if audio_triggered && !audio_end_recorded && stage.audio.is_finished(&cue) {
                let t = stage.stamp(EventKind::AudioEnd);
                audio_end_recorded = true;
                debug!(t, "cue finished");
            }
        }
        let end = stage.stamp(EventKind::StimulusEnd);
        stage.drain_keys();
        debug!(start, end, image = trial.image.0, "stimulus");

        if audio_triggered && !audio_end_recorded {
            warn!(trial = trial.index, "cue still playing when the stimulus phase ended");
        }

        Ok(TrialOutcome {
            index: trial.index,
            image: trial.image,
            category: cue.category(),
            audio_started: audio_triggered,
            audio_finished: audio_end_recorded,
        })
    }
}
