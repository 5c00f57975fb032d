use crate::ImageId;
use serde::{Deserialize, Serialize};

/// Position of the scheduler inside one trial.
///
/// Transitions are strictly linear: `Idle -> FixationActive -> StimulusActive -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrialState {
    #[default]
    Idle,
    FixationActive,
    StimulusActive,
}

impl TrialState {
    pub fn next(self) -> TrialState {
        match self {
            TrialState::Idle => TrialState::FixationActive,
            TrialState::FixationActive => TrialState::StimulusActive,
            TrialState::StimulusActive => TrialState::Idle,
        }
    }
}

/// One fixation + image + cue cycle. Built once at run start, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub image: ImageId,
}

impl Trial {
    pub fn new(index: usize, image: ImageId) -> Self {
        Self { index, image }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_cycle_back_to_idle() {
        let mut state = TrialState::default();
        let mut seen = vec![state];
        for _ in 0..3 {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                TrialState::Idle,
                TrialState::FixationActive,
                TrialState::StimulusActive,
                TrialState::Idle,
            ]
        );
    }
}
