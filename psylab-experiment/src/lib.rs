pub mod config;
pub mod cue_pool;
pub mod event_log;
pub mod export;
pub mod run;
pub mod scheduler;

pub use config::{CuePolicy, RunConfiguration};
pub use cue_pool::{AudioCuePool, CueCounts};
pub use event_log::{EventLog, Row};
pub use export::{CsvSink, TableSink};
pub use run::{Devices, RunController, RunRecord, RunSummary};
pub use scheduler::{Stage, TrialOutcome, TrialScheduler, drain_keys};
