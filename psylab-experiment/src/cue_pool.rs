use crate::config::{CuePolicy, RunConfiguration};
use psylab_core::{AudioCategory, AudioCue, AudioOutput, PsylabError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Number of cues handed out per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CueCounts {
    pub low: usize,
    pub high: usize,
}

impl CueCounts {
    pub fn total(&self) -> usize {
        self.low + self.high
    }

    fn bump(&mut self, category: AudioCategory) {
        match category {
            AudioCategory::Low => self.low += 1,
            AudioCategory::High => self.high += 1,
        }
    }
}

enum Selection {
    PreShuffled {
        cues: Vec<AudioCue>,
        next: usize,
    },
    CountBalanced {
        low: AudioCue,
        high: AudioCue,
        rng: StdRng,
    },
}

/// Produces one cue per trial under the configured [`CuePolicy`].
pub struct AudioCuePool {
    selection: Selection,
    quota: CueCounts,
    served: CueCounts,
}

impl AudioCuePool {
    /// Asks `audio` for one cue per category; every cue of a category replays
    /// that same unit.
    pub fn new<A, R>(config: &RunConfiguration, audio: &mut A, rng: &mut R) -> Result<Self>
    where
        A: AudioOutput + ?Sized,
        R: Rng + ?Sized,
    {
        let low = audio.make_cue(AudioCategory::Low)?;
        let high = audio.make_cue(AudioCategory::High)?;
        let quota = CueCounts {
            low: config.low_cue_count,
            high: config.high_cue_count,
        };
        Ok(Self::from_cues(config.cue_policy, quota, low, high, rng))
    }

    pub fn from_cues<R: Rng + ?Sized>(
        policy: CuePolicy,
        quota: CueCounts,
        low: AudioCue,
        high: AudioCue,
        rng: &mut R,
    ) -> Self {
        let selection = match policy {
            CuePolicy::PreShuffled => {
                let mut cues = Vec::with_capacity(quota.total());
                cues.extend(std::iter::repeat_n(low, quota.low));
                cues.extend(std::iter::repeat_n(high, quota.high));
                cues.shuffle(rng);
                Selection::PreShuffled { cues, next: 0 }
            }
            CuePolicy::CountBalanced => Selection::CountBalanced {
                low,
                high,
                rng: StdRng::seed_from_u64(rng.random()),
            },
        };
        Self {
            selection,
            quota,
            served: CueCounts::default(),
        }
    }

    pub fn policy(&self) -> CuePolicy {
        match self.selection {
            Selection::PreShuffled { .. } => CuePolicy::PreShuffled,
            Selection::CountBalanced { .. } => CuePolicy::CountBalanced,
        }
    }

    /// Cues left before exhaustion, or `None` for a pool that never runs out.
    pub fn remaining(&self) -> Option<usize> {
        match &self.selection {
            Selection::PreShuffled { cues, next } => Some(cues.len() - next),
            Selection::CountBalanced { .. } => None,
        }
    }

    pub fn served(&self) -> CueCounts {
        self.served
    }

    /// Hands out the next cue. A pre-shuffled pool rejects requests past its
    /// size.
    pub fn next_cue(&mut self) -> Result<AudioCue> {
        let cue = match &mut self.selection {
            Selection::PreShuffled { cues, next } => {
                let cue = cues
                    .get(*next)
                    .cloned()
                    .ok_or(PsylabError::CuePoolExhausted(cues.len()))?;
                *next += 1;
                cue
            }
            Selection::CountBalanced { low, high, rng } => {
                let category = if self.served.low >= self.quota.low {
                    AudioCategory::High
                } else if self.served.high >= self.quota.high {
                    AudioCategory::Low
                } else if rng.random_bool(0.5) {
                    AudioCategory::Low
                } else {
                    AudioCategory::High
                };
                match category {
                    AudioCategory::Low => low.clone(),
                    AudioCategory::High => high.clone(),
                }
            }
        };
        self.served.bump(cue.category());
        Ok(cue)
    }
}
