use crate::config::{CuePolicy, RunConfiguration};
use crate::cue_pool::{AudioCuePool, CueCounts};
use crate::event_log::EventLog;
use crate::export::TableSink;
use crate::scheduler::{Stage, TrialOutcome, TrialScheduler, drain_keys};
use psylab_core::{
    AudioOutput, EventKind, ImageSource, KeyInput, PsylabError, Result, StimulusDisplay, Trial,
};
use psylab_timing::{Clock, Timer};
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use tracing::{info, warn};

/// The output-side collaborators a run drives.
pub struct Devices<D, A, K> {
    pub display: D,
    pub audio: A,
    pub input: K,
}

/// Counts describing a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub trials: usize,
    pub audio_started: usize,
    pub audio_finished: usize,
    pub key_presses: usize,
    pub cues: CueCounts,
    pub output: Option<PathBuf>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub log: EventLog,
    pub outcomes: Vec<TrialOutcome>,
    pub summary: RunSummary,
}

/// Orchestrates a whole run: trial list, global clock, key channel, export.
pub struct RunController<T: Timer, D, A, K> {
    config: RunConfiguration,
    clock: Clock<T>,
    devices: Devices<D, A, K>,
    trials: Vec<Trial>,
    cues: AudioCuePool,
    scheduler: TrialScheduler,
    log: EventLog,
    outcomes: Vec<TrialOutcome>,
}

impl<T, D, A, K> RunController<T, D, A, K>
where
    T: Timer,
    D: StimulusDisplay,
    A: AudioOutput,
    K: KeyInput,
{
    /// Validates the configuration, lists and shuffles the images and builds
    /// the cue pool. Nothing is presented yet.
    pub fn new<I, R>(
        config: RunConfiguration,
        timer: T,
        mut devices: Devices<D, A, K>,
        images: &mut I,
        rng: &mut R,
    ) -> Result<Self>
    where
        I: ImageSource + ?Sized,
        R: Rng + ?Sized,
    {
        let scheduler = TrialScheduler::new(&config)?;

        let mut order = images.list_images()?;
        if order.is_empty() {
            return Err(PsylabError::NoImages {
                dir: config.image_dir.display().to_string(),
                suffix: config.image_suffix.clone(),
            });
        }
        order.shuffle(rng);
        let trials: Vec<Trial> = order
            .into_iter()
            .enumerate()
            .map(|(index, image)| Trial::new(index, image))
            .collect();

        let cues = AudioCuePool::new(&config, &mut devices.audio, rng)?;
        if let Some(available) = cues.remaining() {
            if trials.len() > available {
                return Err(PsylabError::config(format!(
                    "{} trials but only {available} audio cues",
                    trials.len()
                )));
            }
        }
        if cues.policy() == CuePolicy::CountBalanced && trials.len() != config.total_cues() {
            warn!(
                trials = trials.len(),
                cues = config.total_cues(),
                "trial count differs from the cue quota; category totals will not match it"
            );
        }

        Ok(Self {
            clock: Clock::new(timer),
            config,
            devices,
            trials,
            cues,
            scheduler,
            log: EventLog::new(),
            outcomes: Vec::new(),
        })
    }

    /// Trials in presentation order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Presents every trial, then writes the table to the configured
    /// output path.
    pub fn run(self) -> Result<RunRecord> {
        let path = self.config.output_path.clone();
        let mut record = self.present()?;
        record.log.export_csv(&path)?;
        info!(path = %path.display(), rows = record.log.row_count(), "timings exported");
        record.summary.output = Some(path);
        Ok(record)
    }

    /// Presents every trial, then writes the table into `sink`.
    pub fn run_into<S: TableSink + ?Sized>(self, sink: &mut S) -> Result<RunRecord> {
        let record = self.present()?;
        record.log.export(sink).map_err(PsylabError::Export)?;
        Ok(record)
    }

    fn present(mut self) -> Result<RunRecord> {
        let key = self.config.trigger_key.clone();
        let keys = self.devices.input.on_key(&key)?;

        self.clock.reset();
        info!(
            trials = self.trials.len(),
            policy = ?self.cues.policy(),
            "run started"
        );

        for trial in &self.trials {
            let mut stage = Stage {
                clock: &self.clock,
                display: &mut self.devices.display,
                audio: &mut self.devices.audio,
                cues: &mut self.cues,
                log: &mut self.log,
                keys: Some(&keys),
            };
            let outcome = self.scheduler.run_trial(trial, &mut stage)?;
            info!(
                trial = outcome.index,
                image = outcome.image.0,
                cue = %outcome.category,
                audio_finished = outcome.audio_finished,
                "trial complete"
            );
            self.outcomes.push(outcome);
        }

        // presses still queued behind the last stimulus frame
        self.devices.display.poll_events()?;
        drain_keys(&self.clock, &mut self.log, &keys);
        self.devices.input.remove_key(&key)?;

        let summary = RunSummary {
            trials: self.scheduler.completed(),
            audio_started: self.log.len(EventKind::AudioStart),
            audio_finished: self.log.len(EventKind::AudioEnd),
            key_presses: self.log.len(EventKind::KeyPress),
            cues: self.cues.served(),
            output: None,
        };
        info!(
            trials = summary.trials,
            audio_started = summary.audio_started,
            audio_finished = summary.audio_finished,
            key_presses = summary.key_presses,
            "run finished"
        );
        Ok(RunRecord {
            log: self.log,
            outcomes: self.outcomes,
            summary,
        })
    }
}
