use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use handle_avail::check::{Client, Mode, Service};
use handle_avail::config::{
    self, ConfigError, DEFAULT_DICTIONARY, DEFAULT_WAIT_SECS, Dictionary, ScanConfig,
};
use handle_avail::scan::Scanner;

mod logging;

#[derive(Parser)]
#[command(
    name = "handle-avail",
    version,
    about = "Scan a word list for usernames that are still free on Twitter or GitHub",
    after_help = "A missing profile page (404) is necessary but not sufficient for a name \
                  to be free: the service may still refuse it. With `--maybe annotate` such \
                  names are written as `<word><TAB>m`.\n\n\
                  Matches go to stdout, one per line; progress goes to stderr. A 429 from \
                  the service ends the scan; raise --wait or use --proxy."
)]
struct Cli {
    /// Word list, one word per line; `-` reads stdin. Only the first
    /// tab-separated field of each line is used.
    #[arg(short, long, default_value = DEFAULT_DICTIONARY)]
    dictionary: String,

    /// Proxy for both HTTP and HTTPS, e.g. socks5://127.0.0.1:9050 for Tor
    #[arg(short, long)]
    proxy: Option<String>,

    /// Seconds to wait after each word
    #[arg(short, long, default_value_t = DEFAULT_WAIT_SECS, allow_negative_numbers = true)]
    wait: f64,

    /// Report names without a profile page: `yes` all of them (1 request/word),
    /// `no` only those the signup check accepts (1 request/word), `annotate`
    /// all of them, marking refused ones with `m` (2 requests/word)
    #[arg(short, long, default_value_t = Mode::Annotate)]
    maybe: Mode,

    /// Check GitHub instead of Twitter
    #[arg(short, long)]
    github: bool,

    /// Do not write the progress line to stderr
    #[arg(short, long)]
    suppress_status: bool,

    /// Log more detail to stderr (repeat for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, hide = true)]
    twitter_url: Option<String>,

    #[arg(long, hide = true)]
    github_url: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ScanConfig, ConfigError> {
        let wait = config::wait_from_secs(self.wait)?;
        let dictionary = Dictionary::from_arg(&self.dictionary);
        dictionary.validate()?;

        Ok(ScanConfig {
            dictionary,
            proxy: self.proxy,
            wait,
            mode: self.maybe,
            service: if self.github {
                Service::GitHub
            } else {
                Service::Twitter
            },
            suppress_status: self.suppress_status,
        })
    }
}

fn build_client(
    config: &ScanConfig,
    twitter_url: Option<String>,
    github_url: Option<String>,
) -> Result<Client, ConfigError> {
    let mut builder = Client::builder();
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(proxy.as_str());
    }
    if let Some(url) = twitter_url {
        builder = builder.base_url(Service::Twitter, url);
    }
    if let Some(url) = github_url {
        builder = builder.base_url(Service::GitHub, url);
    }
    builder.build()
}

#[cfg(unix)]
fn reset_sigpipe() {
    // Let `handle-avail | head` end quietly instead of failing on EPIPE.
    // SAFETY: restoring the default disposition before any other thread exists.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

fn main() -> ExitCode {
    reset_sigpipe();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let twitter_url = cli.twitter_url.clone();
    let github_url = cli.github_url.clone();

    let prepared = cli.into_config().and_then(|config| {
        let client = build_client(&config, twitter_url, github_url)?;
        let words = config.dictionary.open()?;
        Ok((config, client, words))
    });
    let (config, client, reader) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let status: Box<dyn Write> = if config.suppress_status {
        Box::new(io::sink())
    } else {
        Box::new(io::stderr())
    };

    let scanner = Scanner::new(&client, config.service, config.mode).wait(config.wait);
    match scanner.run(config::read_words(reader), io::stdout().lock(), status) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            // Move past the progress line before reporting.
            if !config.suppress_status {
                eprintln!();
            }
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
