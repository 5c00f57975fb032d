use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic category of a recorded timestamp.
///
/// The declaration order is the column order of the exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    FixationStart,
    FixationEnd,
    StimulusStart,
    StimulusEnd,
    AudioStart,
    AudioEnd,
    KeyPress,
}

/// Column headers, kept apart from the variant identifiers so renaming a
/// variant never changes the output format.
const HEADERS: [(EventKind, &str); EventKind::COUNT] = [
    (EventKind::FixationStart, "FixationStart"),
    (EventKind::FixationEnd, "FixationEnd"),
    (EventKind::StimulusStart, "StimulusStart"),
    (EventKind::StimulusEnd, "StimulusEnd"),
    (EventKind::AudioStart, "AudioStart"),
    (EventKind::AudioEnd, "AudioEnd"),
    (EventKind::KeyPress, "KeyPress"),
];

impl EventKind {
    pub const COUNT: usize = 7;

    /// Every kind in column order.
    pub const ALL: [EventKind; EventKind::COUNT] = [
        EventKind::FixationStart,
        EventKind::FixationEnd,
        EventKind::StimulusStart,
        EventKind::StimulusEnd,
        EventKind::AudioStart,
        EventKind::AudioEnd,
        EventKind::KeyPress,
    ];

    /// Position of this kind in the column order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used as the column header when exporting.
    pub fn header(self) -> &'static str {
        HEADERS[self.index()].1
    }

    /// All headers in column order.
    pub fn headers() -> [&'static str; EventKind::COUNT] {
        HEADERS.map(|(_, name)| name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}
