use crate::audio::{DeviceAudio, ToneSettings};
use crate::images::ImageLibrary;
use crate::keys::{self, KeyRouter};
use crate::window::WindowDisplay;
use anyhow::{Context, Result};
use psylab_core::PsylabError;
use psylab_experiment::{Devices, RunController, RunConfiguration, RunSummary};
use psylab_timing::HighPrecisionTimer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Optional JSON overrides, read from the working directory.
pub const CONFIG_PATH: &str = "psylab.json";

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_COLLABORATOR: u8 = 1;
/// The `-1` status export failures are reported with, as an exit byte.
pub const EXIT_EXPORT: u8 = 255;

pub const EXPORT_FAILURE_MESSAGE: &str = "Program exited with exit code -1 due to an error";

pub struct App {
    config: RunConfiguration,
    tones: ToneSettings,
}

impl App {
    pub fn new() -> Result<Self> {
        Self::from_config(RunConfiguration::load(CONFIG_PATH)?)
    }

    /// Rejects settings the devices could not honour before anything opens.
    pub fn from_config(config: RunConfiguration) -> Result<Self> {
        config.validate()?;
        if keys::key_code(&config.trigger_key).is_none() {
            return Err(PsylabError::config(format!(
                "trigger_key {:?} is not a supported key",
                config.trigger_key
            ))
            .into());
        }
        let tones = ToneSettings::from_config(&config)?;
        Ok(Self { config, tones })
    }

    /// Opens the window, loads the images and presents the whole run.
    pub fn run(self) -> Result<RunSummary> {
        let Self { config, tones } = self;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting psylab"
        );

        let mut library = ImageLibrary::scan(&config.image_dir, &config.image_suffix)?;
        if library.is_empty() {
            return Err(PsylabError::NoImages {
                dir: library.dir().display().to_string(),
                suffix: library.suffix().to_string(),
            }
            .into());
        }

        let timer = HighPrecisionTimer::new();
        let keys = KeyRouter::new();
        let mut window = WindowDisplay::open(&config, timer, keys.clone())
            .map_err(|e| PsylabError::Display(format!("{e:#}")))?;

        for image in library.decode_scaled(window.image_box())? {
            window.add_image(image).context("failed to upload image")?;
        }
        info!(
            images = library.len(),
            dir = %library.dir().display(),
            refresh_hz = ?window.refresh_rate(),
            "images loaded"
        );

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        info!(seed, "shuffle seed");
        let mut rng = StdRng::seed_from_u64(seed);

        let audio = DeviceAudio::open(tones)?;
        let devices = Devices {
            display: window,
            audio,
            input: keys,
        };
        let controller = RunController::new(config, timer, devices, &mut library, &mut rng)?;
        let record = controller.run()?;
        Ok(record.summary)
    }
}

/// Process exit status for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PsylabError>() {
        Some(e) if e.is_export() => EXIT_EXPORT,
        Some(e) if e.is_config() => EXIT_CONFIG,
        _ => EXIT_COLLABORATOR,
    }
}
