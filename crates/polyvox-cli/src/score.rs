//! Text scores: timed note lists for offline and real-time playback.
//!
//! A score is a list of notes separated by commas or whitespace, each
//! written `key@start+duration[*velocity]`:
//!
//! ```text
//! 40@0+1, 44@0.5+1*0.7, 47@1+2
//! ```
//!
//! Times are in seconds; velocity defaults to 1.0.

use std::str::FromStr;

use crate::keymap;

/// Errors raised while building a score.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoreError {
    /// The score has no notes.
    #[error("score is empty")]
    Empty,

    /// A note token could not be parsed.
    #[error("bad note '{token}': {reason}")]
    Malformed {
        /// The offending token.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `--keys` character has no note.
    #[error("character '{0}' is not on the note keyboard")]
    UnmappedKey(char),
}

/// One note of a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNote {
    /// Key number (49 = A4).
    pub key: i32,
    /// Start time in seconds.
    pub start: f64,
    /// Held duration in seconds.
    pub duration: f64,
    /// Velocity (0.0 to 1.0).
    pub velocity: f32,
}

/// Note-on or note-off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// Key pressed with velocity.
    On(f32),
    /// Key released.
    Off,
}

/// A timestamped key event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEvent {
    /// Seconds from score start.
    pub time: f64,
    /// Key number.
    pub key: i32,
    /// Press or release.
    pub kind: EventKind,
}

/// Parsed score.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    notes: Vec<ScoreNote>,
}

impl Score {
    /// Build a score from notes.
    pub fn new(notes: Vec<ScoreNote>) -> Result<Self, ScoreError> {
        if notes.is_empty() {
            return Err(ScoreError::Empty);
        }
        Ok(Self { notes })
    }

    /// Play keyboard characters one after another, `step` seconds each.
    /// Whitespace is a rest.
    pub fn from_keys(chars: &str, step: f64, velocity: f32) -> Result<Self, ScoreError> {
        let mut notes = Vec::new();
        for (i, c) in chars.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let key = keymap::key_for_char(c).ok_or(ScoreError::UnmappedKey(c))?;
            notes.push(ScoreNote {
                key,
                start: i as f64 * step,
                duration: step,
                velocity,
            });
        }
        Self::new(notes)
    }

    /// Notes in the order written.
    pub fn notes(&self) -> &[ScoreNote] {
        &self.notes
    }

    /// Time of the last note-off.
    pub fn end_time(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.start + n.duration)
            .fold(0.0, f64::max)
    }

    /// All events sorted by time. At equal times releases come first, so a
    /// repeated key is released before it is struck again.
    pub fn events(&self) -> Vec<ScoreEvent> {
        let mut events: Vec<ScoreEvent> = self
            .notes
            .iter()
            .flat_map(|n| {
                [
                    ScoreEvent {
                        time: n.start,
                        key: n.key,
                        kind: EventKind::On(n.velocity),
                    },
                    ScoreEvent {
                        time: n.start + n.duration,
                        key: n.key,
                        kind: EventKind::Off,
                    },
                ]
            })
            .collect();
        let is_on = |e: &ScoreEvent| matches!(e.kind, EventKind::On(_));
        events.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then_with(|| is_on(a).cmp(&is_on(b)))
        });
        events
    }
}

impl FromStr for Score {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notes = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(parse_note)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(notes)
    }
}

fn parse_note(token: &str) -> Result<ScoreNote, ScoreError> {
    let malformed = |reason: &str| ScoreError::Malformed {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    let (key, rest) = token
        .split_once('@')
        .ok_or_else(|| malformed("expected key@start+duration"))?;
    let (timing, velocity) = match rest.split_once('*') {
        Some((timing, velocity)) => (timing, Some(velocity)),
        None => (rest, None),
    };
    let (start, duration) = timing
        .split_once('+')
        .ok_or_else(|| malformed("expected start+duration after '@'"))?;

    let key: i32 = key.parse().map_err(|_| malformed("key is not an integer"))?;
    let start: f64 = start.parse().map_err(|_| malformed("start is not a number"))?;
    let duration: f64 = duration
        .parse()
        .map_err(|_| malformed("duration is not a number"))?;
    let velocity: f32 = match velocity {
        Some(v) => v.parse().map_err(|_| malformed("velocity is not a number"))?,
        None => 1.0,
    };

    if !start.is_finite() || start < 0.0 {
        return Err(malformed("start must be >= 0"));
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(malformed("duration must be > 0"));
    }
    if !(0.0..=1.0).contains(&velocity) {
        return Err(malformed("velocity must be in [0, 1]"));
    }

    Ok(ScoreNote {
        key,
        start,
        duration,
        velocity,
    })
}
