/// Result alias that carries [`PsylabError`].
pub type Result<T> = std::result::Result<T, PsylabError>;

/// Every failure a run can surface. None of them is recovered from locally.
#[derive(Debug, thiserror::Error)]
pub enum PsylabError {
    /// Rejected before any trial runs.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no images matching *.{suffix} found under {dir}")]
    NoImages { dir: String, suffix: String },
    /// More cues requested than a pre-shuffled pool holds.
    #[error("audio cue pool exhausted after {0} cues")]
    CuePoolExhausted(usize),
    #[error("display failure: {0}")]
    Display(String),
    #[error("audio failure: {0}")]
    Audio(String),
    #[error("input failure: {0}")]
    Input(String),
    #[error("image source failure: {0}")]
    ImageSource(String),
    /// The timing table could not be written.
    #[error("export failed: {0}")]
    Export(#[source] std::io::Error),
}

impl PsylabError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PsylabError::Config(_) | PsylabError::NoImages { .. }
        )
    }

    pub fn is_export(&self) -> bool {
        matches!(self, PsylabError::Export(_))
    }
}
