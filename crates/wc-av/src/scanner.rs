//! Pattern-driven scanner for ffprobe/ffmpeg diagnostic output.
//!
//! The tools print free-form text; three facts are pulled out of it and
//! everything else is ignored:
//!
//! - `Duration: HH:MM:SS.CS` -> total milliseconds
//! - `<digits> Hz` (any case) -> sample rate
//! - `out_time_ms=<digits>` -> playback position. Despite the name the value
//!   carries three sub-millisecond digits, which are dropped by integer
//!   division by 1000.
//!
//! For every fact the most recent match wins.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("valid duration regex")
    })
}

fn sample_rate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+) Hz").expect("valid sample rate regex"))
}

fn position_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"out_time_ms=(\d+)").expect("valid position regex"))
}

/// Facts extracted so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamFacts {
    pub duration_ms: Option<u64>,
    pub sample_rate_hz: Option<u32>,
    pub position_ms: Option<u64>,
}

/// Incremental scanner; feed it lines in the order the tool wrote them.
#[derive(Debug, Clone, Default)]
pub struct TextStreamScanner {
    facts: StreamFacts,
}

impl TextStreamScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one line, updating any fact it mentions.
    ///
    /// Returns `true` when the line carried a position update.
    pub fn feed(&mut self, line: &str) -> bool {
        if let Some(caps) = duration_re().captures(line) {
            if let Some(ms) = duration_ms(&caps) {
                self.facts.duration_ms = Some(ms);
            }
        }

        if let Some(hz) = sample_rate_re()
            .captures(line)
            .and_then(|caps| caps[1].parse::<u32>().ok())
        {
            self.facts.sample_rate_hz = Some(hz);
        }

        match position_re()
            .captures(line)
            .and_then(|caps| caps[1].parse::<u64>().ok())
        {
            Some(raw) => {
                self.facts.position_ms = Some(raw / 1000);
                true
            }
            None => false,
        }
    }

    /// Scan a whole block of text.
    pub fn feed_text(&mut self, text: &str) {
        for line in text.lines() {
            self.feed(line);
        }
    }

    pub fn facts(&self) -> StreamFacts {
        self.facts
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.facts.duration_ms
    }

    pub fn sample_rate_hz(&self) -> Option<u32> {
        self.facts.sample_rate_hz
    }

    pub fn position_ms(&self) -> Option<u64> {
        self.facts.position_ms
    }
}

/// `3_600_000·H + 60_000·M + 1000·S + 10·CS`.
fn duration_ms(caps: &Captures<'_>) -> Option<u64> {
    let field = |i: usize| caps[i].parse::<u64>().ok();
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let centis = field(4)?;
    Some(3_600_000 * hours + 60_000 * minutes + 1000 * seconds + 10 * centis)
}
