//! Stdin escape-sequence buffering.
//!
//! Splits raw input bytes into complete sequences, bracketed paste content,
//! and registered raw sequences.

use std::time::{Duration, Instant};

const ESC: char = '\x1b';
const BRACKETED_PASTE_START: &str = "\x1b[200~";
const BRACKETED_PASTE_END: &str = "\x1b[201~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinEvent {
    Data(String),
    Paste(String),
    /// Input that exactly matched a registered raw sequence.
    Raw(String),
}

/// Buffers stdin input and emits complete sequences.
///
/// An incomplete escape tail stays buffered until more bytes arrive or its
/// flush deadline passes, then it is emitted verbatim.
#[derive(Debug)]
pub struct StdinBuffer {
    pending: String,
    esc_timeout: Duration,
    paste: Option<String>,
    flush_deadline: Option<Instant>,
    raw_seqs: Vec<String>,
}

impl StdinBuffer {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            pending: String::new(),
            esc_timeout: Duration::from_millis(timeout_ms),
            paste: None,
            flush_deadline: None,
            raw_seqs: Vec::new(),
        }
    }

    /// Replaces the set of sequences reported as [`StdinEvent::Raw`].
    pub fn set_raw_seqs(&mut self, seqs: &[String]) {
        self.raw_seqs = seqs.to_vec();
        // Longest first so a sequence never shadows one it prefixes.
        self.raw_seqs.sort_by_key(|seq| std::cmp::Reverse(seq.len()));
    }

    pub fn process(&mut self, data: &[u8]) -> Vec<StdinEvent> {
        self.flush_deadline = None;
        let text = match data {
            // A lone high byte is the 8-bit form of Meta+key.
            [byte] if *byte > 127 => {
                let mut meta = String::from(ESC);
                meta.push((byte - 128) as char);
                meta
            }
            _ => String::from_utf8_lossy(data).into_owned(),
        };
        self.feed(text)
    }

    /// Emits a buffered tail whose deadline has passed.
    pub fn flush_due(&mut self, now: Instant) -> Vec<StdinEvent> {
        if self.pending.is_empty() {
            self.flush_deadline = None;
            return Vec::new();
        }
        match self.flush_deadline {
            Some(deadline) if now >= deadline => {
                self.flush_deadline = None;
                vec![StdinEvent::Data(std::mem::take(&mut self.pending))]
            }
            _ => Vec::new(),
        }
    }

    /// Poll timeout: `default_ms`, shortened to the flush deadline.
    pub fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        match self.flush_deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(now).as_millis();
                remaining.min(default_ms.max(0) as u128) as i32
            }
            None => default_ms,
        }
    }

    fn feed(&mut self, mut input: String) -> Vec<StdinEvent> {
        let mut events = Vec::new();
        loop {
            if let Some(paste) = self.paste.as_mut() {
                paste.push_str(&input);
                let Some(end) = paste.find(BRACKETED_PASTE_END) else {
                    return events;
                };
                let after = paste.split_off(end);
                events.extend(self.paste.take().map(StdinEvent::Paste));
                input = after[BRACKETED_PASTE_END.len()..].to_string();
                if input.is_empty() {
                    return events;
                }
                continue;
            }

            self.pending.push_str(&input);
            let Some(start) = self.pending.find(BRACKETED_PASTE_START) else {
                let split = split_sequences(&self.pending, &self.raw_seqs);
                events.extend(split.events);
                self.pending = split.remainder;
                if !self.pending.is_empty() {
                    self.flush_deadline = Some(Instant::now() + self.esc_timeout);
                }
                return events;
            };

            let tail = self.pending.split_off(start);
            let before = std::mem::take(&mut self.pending);
            events.extend(split_sequences(&before, &self.raw_seqs).events);
            self.paste = Some(String::new());
            input = tail[BRACKETED_PASTE_START.len()..].to_string();
        }
    }
}

struct Split {
    events: Vec<StdinEvent>,
    remainder: String,
}

enum RawMatch<'a> {
    Full(&'a str),
    Partial,
    None,
}

fn match_raw_seq<'a>(rest: &str, raw_seqs: &'a [String]) -> RawMatch<'a> {
    let mut partial = false;
    for seq in raw_seqs.iter().filter(|seq| !seq.is_empty()) {
        if rest.starts_with(seq.as_str()) {
            return RawMatch::Full(seq);
        }
        partial |= seq.starts_with(rest);
    }
    if partial {
        RawMatch::Partial
    } else {
        RawMatch::None
    }
}

/// Splits `input` into events; an unfinished sequence at the end is returned
/// as the remainder.
fn split_sequences(input: &str, raw_seqs: &[String]) -> Split {
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        match match_raw_seq(rest, raw_seqs) {
            RawMatch::Full(seq) => {
                events.push(StdinEvent::Raw(seq.to_string()));
                pos += seq.len();
                continue;
            }
            RawMatch::Partial => break,
            RawMatch::None => {}
        }

        let len = if rest.starts_with(ESC) {
            let end = rest
                .char_indices()
                .skip(1)
                .map(|(index, ch)| index + ch.len_utf8())
                .find(|&end| escape_complete(&rest[..end]));
            match end {
                Some(end) => end,
                None => break,
            }
        } else {
            rest.chars().next().map_or(rest.len(), char::len_utf8)
        };
        events.push(StdinEvent::Data(rest[..len].to_string()));
        pos += len;
    }

    Split {
        events,
        remainder: input[pos..].to_string(),
    }
}

/// Whether `data` (starting with ESC) is a whole escape sequence.
fn escape_complete(data: &str) -> bool {
    let body = &data[ESC.len_utf8()..];
    match body.as_bytes().first() {
        None => false,
        // Legacy X10 mouse: ESC [ M plus three bytes.
        Some(b'[') if body.starts_with("[M") => body.len() >= 5,
        Some(b'[') => csi_complete(&body[1..]),
        Some(b']') => body.ends_with('\x07') || body.ends_with("\x1b\\"),
        Some(b'P') | Some(b'_') => body.ends_with("\x1b\\"),
        Some(b'O') => body.len() >= 2,
        Some(_) => true,
    }
}

fn csi_complete(params: &str) -> bool {
    let Some(&last) = params.as_bytes().last() else {
        return false;
    };
    if !(0x40..=0x7e).contains(&last) {
        return false;
    }
    let Some(mouse) = params.strip_prefix('<') else {
        return true;
    };
    // SGR mouse: `<button;x;y` ended by M or m.
    if last != b'M' && last != b'm' {
        return false;
    }
    let fields: Vec<&str> = mouse[..mouse.len() - 1].split(';').collect();
    fields.len() == 3
        && fields
            .iter()
            .all(|field| !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit()))
}
