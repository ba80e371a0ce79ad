//! The word-list scan: check each word in turn, stream matches, and keep a
//! progress line updated.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::check::{CheckError, Client, Mode, Service, check};

/// Errors that end a scan.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanError {
    /// A check failed; the scan stops at the word that caused it.
    #[error(transparent)]
    Check(#[from] CheckError),
    /// Reading words or writing output failed.
    #[error("i/o error during scan: {0}")]
    Io(#[from] io::Error),
}

/// Running tallies over the words reported so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    found: usize,
    min_word_length: Option<usize>,
}

impl ScanState {
    /// A state with nothing found yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            found: 0,
            min_word_length: None,
        }
    }

    /// Number of words reported.
    #[must_use]
    pub const fn found(&self) -> usize {
        self.found
    }

    /// Length of the shortest word reported, in chars.
    #[must_use]
    pub const fn min_word_length(&self) -> Option<usize> {
        self.min_word_length
    }

    /// Count a reported word.
    pub fn record_match(&mut self, word: &str) {
        let len = word.chars().count();
        self.found += 1;
        if self.min_word_length.is_none_or(|min| len < min) {
            self.min_word_length = Some(len);
        }
    }

    /// Write the progress line. It ends in `\r` so the next one overwrites it.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `status`.
    pub fn write_status<W: Write>(&self, status: &mut W, last_word: &str) -> io::Result<()> {
        write!(status, "\x1b[Kmin word length found: ")?;
        match self.min_word_length {
            Some(len) => write!(status, "{len}")?,
            None => write!(status, "none")?,
        }
        write!(
            status,
            " || words found: {} || last word searched: {last_word}\r",
            self.found
        )?;
        status.flush()
    }
}

/// Sequential scanner over a word list for one service and mode.
#[derive(Debug)]
pub struct Scanner<'a> {
    client: &'a Client,
    service: Service,
    mode: Mode,
    wait: Duration,
}

impl<'a> Scanner<'a> {
    /// A scanner with no delay between words.
    #[must_use]
    pub const fn new(client: &'a Client, service: Service, mode: Mode) -> Self {
        Self {
            client,
            service,
            mode,
            wait: Duration::ZERO,
        }
    }

    /// Sleep `wait` after every word, matched or not.
    #[must_use]
    pub const fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Check every word, writing matches to `out` and progress to `status`.
    ///
    /// Each match is written as `word` or `word<TAB>m` and flushed at once,
    /// so results survive an interrupt. When the input ends, a final newline
    /// goes to `status` so the progress line is not overwritten by the
    /// shell prompt. Pass [`io::sink`] as `status` to suppress progress.
    ///
    /// # Errors
    ///
    /// The first [`CheckError`] (e.g. rate limiting) stops the scan; later
    /// words are not checked. I/O errors on any stream are also fatal.
    pub fn run<I, O, S>(&self, words: I, mut out: O, mut status: S) -> Result<ScanState, ScanError>
    where
        I: IntoIterator<Item = io::Result<String>>,
        O: Write,
        S: Write,
    {
        info!(service = %self.service, mode = %self.mode, "scan started");
        let mut state = ScanState::new();

        for word in words {
            let word = word?;
            let verdict = check(self.client, &word, self.service, self.mode)?;

            if verdict.is_match() {
                match verdict.marker() {
                    Some(marker) => writeln!(out, "{word}\t{marker}")?,
                    None => writeln!(out, "{word}")?,
                }
                out.flush()?;
                state.record_match(&word);
                debug!(word = %word, %verdict, "match");
            }

            state.write_status(&mut status, &word)?;
            thread::sleep(self.wait);
        }

        writeln!(status)?;
        status.flush()?;
        info!(found = state.found(), "scan finished");
        Ok(state)
    }
}
