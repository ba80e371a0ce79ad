//! Core availability checking logic for usernames on Twitter and GitHub.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use ureq::{Agent, Proxy};
use url::Url;

use crate::config::ConfigError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest username Twitter accepts at signup.
pub const TWITTER_MAX_NAME_LENGTH: usize = 15;

/// A platform whose usernames can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// twitter.com
    Twitter,
    /// github.com
    GitHub,
}

impl Service {
    /// Longest name the service will register, if it has a limit.
    #[must_use]
    pub const fn max_name_length(self) -> Option<usize> {
        match self {
            Self::Twitter => Some(TWITTER_MAX_NAME_LENGTH),
            Self::GitHub => None,
        }
    }

    /// Whether `word` is short enough to be worth a request.
    ///
    /// ```
    /// use handle_avail::check::Service;
    /// assert!(Service::Twitter.accepts_length("fifteen_chars__"));
    /// assert!(!Service::Twitter.accepts_length("sixteen_chars___"));
    /// assert!(Service::GitHub.accepts_length("sixteen_chars___"));
    /// ```
    #[must_use]
    pub fn accepts_length(self, word: &str) -> bool {
        self.max_name_length()
            .is_none_or(|max| word.chars().count() <= max)
    }

    /// Base URL requests go to unless the client overrides it.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Twitter => "https://twitter.com",
            Self::GitHub => "https://github.com",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Twitter => write!(f, "Twitter"),
            Self::GitHub => write!(f, "GitHub"),
        }
    }
}

/// How a name whose profile page is missing gets reported.
///
/// A missing profile is necessary but not sufficient for availability: the
/// service may still refuse the name (suspended, reserved, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// `yes`: report every name without a profile page (1 request/word).
    AllUnregistered,
    /// `no`: report only names the signup check accepts (1 request/word).
    Strict,
    /// `annotate`: report names without a profile page, marking those the
    /// signup check refuses with `m` (up to 2 requests/word).
    #[default]
    Annotate,
}

impl Mode {
    /// The command-line spelling of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllUnregistered => "yes",
            Self::Strict => "no",
            Self::Annotate => "annotate",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Self::AllUnregistered),
            "no" => Ok(Self::Strict),
            "annotate" => Ok(Self::Annotate),
            other => Err(ConfigError::InvalidMode(other.to_owned())),
        }
    }
}

/// Outcome of checking one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Verdict {
    /// The name should be reported.
    Available,
    /// The name is taken, filtered out, or refused.
    Unavailable,
    /// No profile page exists, yet the signup check refuses the name.
    Maybe,
}

impl Verdict {
    /// Whether the word belongs in the output.
    #[must_use]
    pub const fn is_match(self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Annotation written after the word, if any.
    #[must_use]
    pub const fn marker(self) -> Option<&'static str> {
        match self {
            Self::Maybe => Some("m"),
            Self::Available | Self::Unavailable => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Maybe => write!(f, "maybe"),
        }
    }
}

/// Errors that abort a check. None of them are retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// The service answered 429 Too Many Requests.
    #[error(
        "{service} is spouting 429s; too many requests are being made of the server. \
         Wait a while, or run Tor (https://www.torproject.org/) as a SOCKS5 proxy \
         and pass it with `--proxy`"
    )]
    RateLimited {
        /// Service that refused the request.
        service: Service,
    },
    /// The service answered with a status the checker does not interpret.
    #[error("{service} answered HTTP {status} while checking `{word}`")]
    UnexpectedStatus {
        /// Service that answered.
        service: Service,
        /// HTTP status code.
        status: u16,
        /// Word being checked.
        word: String,
    },
    /// The response body did not carry the expected JSON.
    #[error("{service} sent an unreadable response while checking `{word}`: {source}")]
    Decoding {
        /// Service that answered.
        service: Service,
        /// Word being checked.
        word: String,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The request never produced a response.
    #[error("request to {service} failed: {source}")]
    Transport {
        /// Service being contacted.
        service: Service,
        /// Error from the HTTP client.
        #[source]
        source: Box<ureq::Error>,
    },
}

impl CheckError {
    /// The service the failing request went to.
    #[must_use]
    pub const fn service(&self) -> Service {
        match self {
            Self::RateLimited { service }
            | Self::UnexpectedStatus { service, .. }
            | Self::Decoding { service, .. }
            | Self::Transport { service, .. } => *service,
        }
    }

    fn transport(service: Service) -> impl FnOnce(ureq::Error) -> Self {
        move |e| Self::Transport {
            service,
            source: Box::new(e),
        }
    }
}

#[derive(Deserialize)]
struct UsernameValidity {
    valid: bool,
}

/// An HTTP client configured for username checks.
///
/// Wraps the underlying HTTP agent together with the base URL of each
/// service.
#[derive(Debug, Clone)]
pub struct Client {
    agent: Agent,
    twitter: Url,
    github: Url,
}

/// Builder for [`Client`].
///
/// ```no_run
/// use handle_avail::check::Client;
///
/// let client = Client::builder()
///     .proxy("socks5://127.0.0.1:9050")
///     .build()
///     .expect("valid proxy");
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ClientBuilder {
    proxy: Option<String>,
    twitter: Option<String>,
    github: Option<String>,
}

impl ClientBuilder {
    /// Route both HTTP and HTTPS requests through `url`.
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    /// Send requests for `service` to `url` instead of the public site.
    pub fn base_url(mut self, service: Service, url: impl Into<String>) -> Self {
        match service {
            Service::Twitter => self.twitter = Some(url.into()),
            Service::GitHub => self.github = Some(url.into()),
        }
        self
    }

    /// Build the client.
    ///
    /// Without a proxy, requests go out directly; proxy environment
    /// variables are not consulted.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidProxy`] if the proxy URL is rejected,
    /// [`ConfigError::InvalidBaseUrl`] if a base URL is unusable.
    pub fn build(self) -> Result<Client, ConfigError> {
        let proxy = match self.proxy {
            Some(url) => match Proxy::new(&url) {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    return Err(ConfigError::InvalidProxy {
                        url,
                        source: Box::new(e),
                    });
                }
            },
            None => None,
        };

        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .proxy(proxy)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION"),
                " (",
                env!("CARGO_PKG_REPOSITORY"),
                ")"
            ))
            .build();

        Ok(Client {
            agent: Agent::new_with_config(config),
            twitter: parse_base_url(Service::Twitter, self.twitter)?,
            github: parse_base_url(Service::GitHub, self.github)?,
        })
    }
}

fn parse_base_url(service: Service, url: Option<String>) -> Result<Url, ConfigError> {
    let raw = url.unwrap_or_else(|| service.default_base_url().to_owned());
    match Url::parse(&raw) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        _ => Err(ConfigError::InvalidBaseUrl { service, url: raw }),
    }
}

impl Client {
    /// Start configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    fn endpoint<'a>(&self, service: Service, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = match service {
            Service::Twitter => self.twitter.clone(),
            Service::GitHub => self.github.clone(),
        };
        // Base URLs are checked for cannot-be-a-base at build time.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn profile_url(&self, service: Service, word: &str) -> Url {
        self.endpoint(service, [word])
    }

    /// Request the public profile page for `word`.
    ///
    /// Returns `true` when the page is missing (HTTP 404).
    ///
    /// # Errors
    ///
    /// [`CheckError::RateLimited`] on HTTP 429, [`CheckError::Transport`] if
    /// no response arrives.
    pub fn profile_is_absent(&self, service: Service, word: &str) -> Result<bool, CheckError> {
        let url = self.profile_url(service, word);
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(CheckError::transport(service))?;
        let status = response.status().as_u16();
        debug!(%service, word, status, "profile lookup");

        match status {
            404 => Ok(true),
            429 => Err(CheckError::RateLimited { service }),
            _ => Ok(false),
        }
    }

    /// Authoritative check: ask the service's signup validation whether it
    /// would accept `word`.
    ///
    /// # Errors
    ///
    /// [`CheckError::RateLimited`] on HTTP 429. For Twitter,
    /// [`CheckError::Decoding`] if the body is not the expected JSON. For
    /// GitHub, [`CheckError::UnexpectedStatus`] for anything but 200/403.
    pub fn is_available(&self, service: Service, word: &str) -> Result<bool, CheckError> {
        match service {
            Service::Twitter => self.twitter_username_valid(word),
            Service::GitHub => self.github_signup_check(word),
        }
    }

    fn twitter_username_valid(&self, word: &str) -> Result<bool, CheckError> {
        let service = Service::Twitter;
        let mut url = self.endpoint(service, ["users", "username_available"]);
        url.query_pairs_mut().append_pair("username", word);

        let mut response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(CheckError::transport(service))?;
        let status = response.status().as_u16();
        debug!(%service, word, status, "username validation");

        let body = match response.body_mut().read_to_string() {
            Ok(body) => body,
            Err(_) if status == 429 => return Err(CheckError::RateLimited { service }),
            Err(e) => return Err(CheckError::transport(service)(e)),
        };

        // A 429 only matters when it replaced the JSON answer.
        match serde_json::from_str::<UsernameValidity>(&body) {
            Ok(validity) => Ok(validity.valid),
            Err(_) if status == 429 => Err(CheckError::RateLimited { service }),
            Err(source) => Err(CheckError::Decoding {
                service,
                word: word.to_owned(),
                source,
            }),
        }
    }

    fn github_signup_check(&self, word: &str) -> Result<bool, CheckError> {
        let service = Service::GitHub;
        let url = self.endpoint(service, ["signup_check", "username"]);

        let response = self
            .agent
            .post(url.as_str())
            .send_form([("value", word)])
            .map_err(CheckError::transport(service))?;
        let status = response.status().as_u16();
        debug!(%service, word, status, "signup check");

        match status {
            200 => Ok(true),
            403 => Ok(false),
            429 => Err(CheckError::RateLimited { service }),
            status => Err(CheckError::UnexpectedStatus {
                service,
                status,
                word: word.to_owned(),
            }),
        }
    }
}

/// Decide whether `word` is free on `service`, issuing the requests `mode`
/// calls for.
///
/// Words longer than the service allows are [`Verdict::Unavailable`]
/// without any request.
///
/// - [`Mode::Strict`]: one signup check.
/// - [`Mode::AllUnregistered`]: one profile lookup.
/// - [`Mode::Annotate`]: a profile lookup, then a signup check only if the
///   profile is missing. A refused name with no profile is [`Verdict::Maybe`].
///
/// # Errors
///
/// Any [`CheckError`] from the underlying requests.
///
/// # Example
///
/// ```no_run
/// use handle_avail::check::{check, Client, Mode, Service, Verdict};
///
/// let client = Client::builder().build().expect("default client");
/// match check(&client, "zyzzyva", Service::Twitter, Mode::Annotate) {
///     Ok(Verdict::Available) => println!("go grab it!"),
///     Ok(verdict) => println!("{verdict}"),
///     Err(e) => eprintln!("error: {e}"),
/// }
/// ```
pub fn check(
    client: &Client,
    word: &str,
    service: Service,
    mode: Mode,
) -> Result<Verdict, CheckError> {
    if !service.accepts_length(word) {
        debug!(%service, word, "too long, skipped");
        return Ok(Verdict::Unavailable);
    }

    match mode {
        Mode::Strict => Ok(if client.is_available(service, word)? {
            Verdict::Available
        } else {
            Verdict::Unavailable
        }),
        Mode::AllUnregistered => Ok(if client.profile_is_absent(service, word)? {
            Verdict::Available
        } else {
            Verdict::Unavailable
        }),
        Mode::Annotate => {
            if !client.profile_is_absent(service, word)? {
                return Ok(Verdict::Unavailable);
            }
            Ok(if client.is_available(service, word)? {
                Verdict::Available
            } else {
                Verdict::Maybe
            })
        }
    }
}
