use std::time::Duration;

use clap::Parser;

use crate::lookup::{WhoisCommand, DEFAULT_WHOIS_BIN};
use crate::report::Presenter;

#[derive(Parser, Debug)]
#[command(
    author = "Pysio",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive WHOIS lookup showing registrant country and registration dates"
)]
pub struct Cli {
    /// WHOIS server to ask (passed to the lookup tool as `-h`)
    #[arg(short, long, env = "WHOIS_SERVER")]
    pub server: Option<String>,

    /// Port of the WHOIS server (passed to the lookup tool as `-p`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Lookup tool to run
    #[arg(long, env = "WHOIS_BIN", default_value = DEFAULT_WHOIS_BIN)]
    pub whois_bin: String,

    /// Extra argument for the lookup tool, placed before the hostname (repeatable)
    #[arg(long = "whois-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub whois_args: Vec<String>,

    /// Give up on a lookup after this many seconds (default: wait indefinitely)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only show the extracted fields, not the raw record
    #[arg(long)]
    pub no_raw: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Display verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color
    }

    /// Check if the raw record should be printed
    pub fn show_raw(&self) -> bool {
        !self.no_raw
    }

    /// Lookup timeout, if any. Zero means no timeout.
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    pub fn gateway(&self) -> WhoisCommand {
        WhoisCommand::new(self.whois_bin.clone())
            .with_extra_args(self.whois_args.iter().cloned())
            .with_server(self.server.clone().filter(|s| !s.trim().is_empty()))
            .with_port(self.port)
            .with_timeout(self.lookup_timeout())
    }

    pub fn presenter(&self) -> Presenter {
        Presenter::new(self.use_color(), self.show_raw())
    }
}
