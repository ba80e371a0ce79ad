#![warn(missing_docs, missing_debug_implementations)]

//! Find usernames that are still free on Twitter or GitHub.
//!
//! A word list is scanned one word at a time. Each word gets a profile-page
//! lookup (a 404 means no account is visible) and/or the service's signup
//! validation, depending on the reporting [`Mode`](check::Mode). Matches are
//! streamed out as they are found, with a fixed delay between words as the
//! only pacing. A rate-limit response ends the scan.
//!
//! # Example
//!
//! ```no_run
//! use handle_avail::check::{Client, Mode, Service};
//! use handle_avail::config::read_words;
//! use handle_avail::scan::Scanner;
//! use std::time::Duration;
//!
//! let client = Client::builder().build()?;
//! let words = read_words(std::io::Cursor::new("zyzzyva\nquokka\n"));
//! let state = Scanner::new(&client, Service::GitHub, Mode::Strict)
//!     .wait(Duration::from_millis(250))
//!     .run(words, std::io::stdout(), std::io::stderr())?;
//! println!("{} found", state.found());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod check;
pub mod config;
pub mod scan;
