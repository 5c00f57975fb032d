#![allow(dead_code)]

use psylab_core::{
    AudioCategory, AudioCue, AudioOutput, CueId, ImageId, ImageSource, KeyInput, KeyPress,
    PsylabError, Result, StimulusDisplay,
};
use psylab_experiment::{CsvSink, Devices, RunConfiguration, RunController, RunRecord};
use psylab_timing::{ManualTimer, Timer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EPS: f64 = 1e-9;

/// Shared between the fake display (which "types" keys) and the fake input.
#[derive(Clone, Default)]
pub struct KeyBus {
    inner: Arc<Mutex<BusState>>,
}

#[derive(Default)]
struct BusState {
    sender: Option<Sender<KeyPress>>,
    registered: Vec<String>,
    removed: Vec<String>,
}

impl KeyBus {
    fn send(&self, at: Duration) {
        let state = self.inner.lock().unwrap();
        if let Some(tx) = &state.sender {
            tx.send(KeyPress {
                key: "space".into(),
                at,
            })
            .unwrap();
        }
    }

    pub fn registered(&self) -> Vec<String> {
        self.inner.lock().unwrap().registered.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.inner.lock().unwrap().removed.clone()
    }
}

/// Counts frames and injects scripted key presses once the timer passes them.
///
/// `queued` presses sit in the event queue until the next `poll_events`.
pub struct ScriptedDisplay {
    timer: ManualTimer,
    bus: KeyBus,
    script: Vec<Duration>,
    queued: Vec<Duration>,
    pub frames: usize,
    pub polls: usize,
    pub drawn: Vec<ImageId>,
}

impl ScriptedDisplay {
    pub fn new(
        timer: &ManualTimer,
        bus: &KeyBus,
        mut script: Vec<Duration>,
        queued: Vec<Duration>,
    ) -> Self {
        script.sort();
        script.reverse();
        Self {
            timer: timer.clone(),
            bus: bus.clone(),
            script,
            queued,
            frames: 0,
            polls: 0,
            drawn: Vec::new(),
        }
    }
}

impl StimulusDisplay for ScriptedDisplay {
    fn draw_fixation(&mut self) -> Result<()> {
        Ok(())
    }

    fn draw_image(&mut self, image: ImageId) -> Result<()> {
        if self.drawn.last() != Some(&image) {
            self.drawn.push(image);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.frames += 1;
        let now = self.timer.peek();
        while self.script.last().is_some_and(|at| *at <= now) {
            if let Some(at) = self.script.pop() {
                self.bus.send(at);
            }
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Result<()> {
        self.polls += 1;
        for at in self.queued.drain(..) {
            self.bus.send(at);
        }
        Ok(())
    }
}

pub struct FakeInput {
    bus: KeyBus,
}

impl FakeInput {
    pub fn new(bus: &KeyBus) -> Self {
        Self { bus: bus.clone() }
    }
}

impl KeyInput for FakeInput {
    fn on_key(&mut self, key: &str) -> Result<mpsc::Receiver<KeyPress>> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.bus.inner.lock().unwrap();
        state.sender = Some(tx);
        state.registered.push(key.to_string());
        Ok(rx)
    }

    fn remove_key(&mut self, key: &str) -> Result<()> {
        let mut state = self.bus.inner.lock().unwrap();
        state.sender = None;
        state.removed.push(key.to_string());
        Ok(())
    }
}

/// Cues finish `length` after `play`, or never when `length` is `None`.
pub struct FakeAudio {
    timer: ManualTimer,
    length: Option<Duration>,
    started: HashMap<CueId, Duration>,
    pub fail_play: bool,
    pub made: Vec<AudioCategory>,
}

impl FakeAudio {
    pub fn new(timer: &ManualTimer, length: Option<Duration>) -> Self {
        Self {
            timer: timer.clone(),
            length,
            started: HashMap::new(),
            fail_play: false,
            made: Vec::new(),
        }
    }
}

impl AudioOutput for FakeAudio {
    fn make_cue(&mut self, category: AudioCategory) -> Result<AudioCue> {
        self.made.push(category);
        Ok(AudioCue::new(CueId(self.made.len() - 1), category))
    }

    fn play(&mut self, cue: &AudioCue) -> Result<()> {
        if self.fail_play {
            return Err(PsylabError::Audio("device lost".into()));
        }
        self.started.insert(cue.id(), self.timer.now());
        Ok(())
    }

    fn is_finished(&self, cue: &AudioCue) -> bool {
        match (self.length, self.started.get(&cue.id())) {
            (Some(length), Some(start)) => self.timer.peek() >= *start + length,
            _ => false,
        }
    }
}

pub struct FakeImages(pub usize);

impl ImageSource for FakeImages {
    fn list_images(&mut self) -> Result<Vec<ImageId>> {
        Ok((0..self.0).map(ImageId).collect())
    }
}

pub type FakeController = RunController<ManualTimer, ScriptedDisplay, FakeAudio, FakeInput>;

pub struct Harness {
    pub timer: ManualTimer,
    pub bus: KeyBus,
    pub config: RunConfiguration,
    pub images: usize,
    pub audio_length: Option<Duration>,
    pub keys: Vec<Duration>,
    /// Presses the display only hands over when polled after the last frame.
    pub queued_keys: Vec<Duration>,
    pub seed: u64,
}

impl Harness {
    pub fn new(images: usize) -> Self {
        Self {
            timer: ManualTimer::with_step(Duration::from_micros(250)),
            bus: KeyBus::default(),
            config: RunConfiguration::default(),
            images,
            audio_length: Some(Duration::from_millis(50)),
            keys: Vec::new(),
            queued_keys: Vec::new(),
            seed: 42,
        }
    }

    pub fn controller(&self) -> Result<FakeController> {
        self.controller_with(FakeAudio::new(&self.timer, self.audio_length))
    }

    pub fn controller_with(&self, audio: FakeAudio) -> Result<FakeController> {
        let devices = Devices {
            display: ScriptedDisplay::new(
                &self.timer,
                &self.bus,
                self.keys.clone(),
                self.queued_keys.clone(),
            ),
            audio,
            input: FakeInput::new(&self.bus),
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        RunController::new(
            self.config.clone(),
            self.timer.clone(),
            devices,
            &mut FakeImages(self.images),
            &mut rng,
        )
    }

    /// Presents every trial and exports into memory.
    pub fn run(&self) -> RunRecord {
        match self.controller() {
            Ok(controller) => controller.run_into(&mut CsvSink::new(Vec::new())).unwrap(),
            Err(e) => panic!("controller rejected the harness: {e}"),
        }
    }

    /// Absolute timer reading `secs` into the future.
    pub fn in_future(&self, secs: f64) -> Duration {
        self.timer.peek() + Duration::from_secs_f64(secs)
    }
}
