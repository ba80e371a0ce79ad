//! Scan settings, the dictionary source, and configuration errors.
//!
//! Everything here is checked before the first word is looked up, so a bad
//! `--wait` or a missing dictionary never costs a request.

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::iter;
use std::path::PathBuf;
use std::str;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::check::{Mode, Service};

/// Word list used when `--dictionary` is not given.
pub const DEFAULT_DICTIONARY: &str = "/usr/share/dict/words";

/// Seconds slept after every word when `--wait` is not given.
pub const DEFAULT_WAIT_SECS: f64 = 0.25;

/// Invalid settings, detected before scanning starts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `--wait` was negative, NaN or infinite.
    #[error("wait time (--wait, -w) must be a non-negative number of seconds, but {0} was entered")]
    InvalidWait(f64),
    /// `--maybe` was not one of `yes`, `no`, `annotate`.
    #[error("maybe (--maybe, -m) must be one of {{yes, no, annotate}}, but `{0}` was entered")]
    InvalidMode(String),
    /// The dictionary path does not name a regular file.
    #[error("`{}` is not a valid dictionary file", .0.display())]
    MissingDictionary(PathBuf),
    /// `-d -` was given but nothing is piped into stdin.
    #[error(
        "stdin was specified as the dictionary, but no data was found there; \
         specify a dictionary file with `-d <file>` or pipe words into this command"
    )]
    StdinIsTerminal,
    /// The proxy URL was rejected by the HTTP client.
    #[error("invalid proxy `{url}`: {source}")]
    InvalidProxy {
        /// Proxy URL as given.
        url: String,
        /// Parse error from the HTTP client.
        #[source]
        source: Box<ureq::Error>,
    },
    /// A service base URL could not be parsed or cannot carry a path.
    #[error("invalid base URL `{url}` for {service}")]
    InvalidBaseUrl {
        /// Service the URL was meant for.
        service: Service,
        /// URL as given.
        url: String,
    },
    /// The dictionary exists but could not be opened.
    #[error("opening dictionary `{}`: {source}", .path.display())]
    Io {
        /// Dictionary path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Where candidate words come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dictionary {
    /// Words piped into standard input (`-d -`).
    Stdin,
    /// A word list on disk, one word per line.
    File(PathBuf),
}

impl Dictionary {
    /// Interpret a `--dictionary` argument; `-` selects stdin.
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    /// Make sure the source can be read from.
    ///
    /// # Errors
    ///
    /// [`ConfigError::StdinIsTerminal`] when stdin is selected but attached
    /// to a terminal, [`ConfigError::MissingDictionary`] when the path is
    /// not a regular file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Stdin if io::stdin().is_terminal() => Err(ConfigError::StdinIsTerminal),
            Self::Stdin => Ok(()),
            Self::File(path) if path.is_file() => Ok(()),
            Self::File(path) => Err(ConfigError::MissingDictionary(path.clone())),
        }
    }

    /// Open the source for line-by-line reading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be opened.
    pub fn open(&self) -> Result<Box<dyn BufRead>, ConfigError> {
        match self {
            Self::Stdin => Ok(Box::new(io::stdin().lock())),
            Self::File(path) => {
                let file = File::open(path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Validated settings for one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Source of candidate words.
    pub dictionary: Dictionary,
    /// Single proxy for both HTTP and HTTPS traffic.
    pub proxy: Option<String>,
    /// Delay after every word.
    pub wait: Duration,
    /// Reporting mode.
    pub mode: Mode,
    /// Service being checked.
    pub service: Service,
    /// Drop the progress line.
    pub suppress_status: bool,
}

/// Convert a `--wait` value in seconds into a [`Duration`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidWait`] for negative, NaN or infinite input.
///
/// ```
/// use handle_avail::config::wait_from_secs;
/// assert_eq!(wait_from_secs(0.25).unwrap().as_millis(), 250);
/// assert!(wait_from_secs(-1.0).is_err());
/// ```
pub fn wait_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(ConfigError::InvalidWait(secs))
    }
}

/// Pull the candidate word out of one dictionary line.
///
/// The line is trimmed and only its first tab-separated field is kept, so
/// earlier output (`word<TAB>m`) can be fed straight back in. Blank lines
/// yield `None`.
///
/// ```
/// use handle_avail::config::extract_word;
/// assert_eq!(extract_word("moth\tm\n"), Some("moth"));
/// assert_eq!(extract_word("   "), None);
/// ```
#[must_use]
pub fn extract_word(line: &str) -> Option<&str> {
    let word = line.trim().split('\t').next().unwrap_or_default();
    (!word.is_empty()).then_some(word)
}

/// Iterate the words of a dictionary, skipping blank lines.
///
/// Lines that are not valid UTF-8 (e.g. Latin-1 entries in older word lists)
/// are logged and skipped rather than ending the scan.
pub fn read_words<R: BufRead>(mut reader: R) -> impl Iterator<Item = io::Result<String>> {
    let mut buf = Vec::new();
    iter::from_fn(move || {
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            let Ok(line) = str::from_utf8(&buf) else {
                let lossy = String::from_utf8_lossy(&buf);
                warn!(
                    line = %lossy.trim_end(),
                    "skipping dictionary line that is not valid UTF-8"
                );
                continue;
            };
            if let Some(word) = extract_word(line) {
                return Some(Ok(word.to_owned()));
            }
        }
    })
}
