use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Ordered from least to most output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Errors only, as bare messages. `RUST_LOG` is ignored.
    Quiet,
    /// Warnings such as dropped locators and truncated traversals.
    Normal,
    /// Per-run progress with timestamps.
    Verbose,
    /// Per-file detail with source positions.
    Debug,
    Trace,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    fn to_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    fn to_filter(self) -> String {
        let level = self.to_level();
        format!("test_api_usage={level}")
    }

    /// Whether `RUST_LOG` may replace the level picked from the flags.
    fn honors_env(self) -> bool {
        self != Self::Quiet
    }

    fn filter(self) -> EnvFilter {
        let from_flags = || EnvFilter::new(self.to_filter());
        if self.honors_env() {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| from_flags())
        } else {
            from_flags()
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so the report can be
/// piped from stdout.
pub fn init(verbosity: Verbosity) {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(verbosity.filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(verbosity >= Verbosity::Debug)
        .with_line_number(verbosity >= Verbosity::Debug)
        .compact();

    match verbosity {
        Verbosity::Quiet => {
            subscriber.without_time().with_level(false).init();
        }
        Verbosity::Normal => {
            subscriber.without_time().init();
        }
        _ => {
            subscriber.init();
        }
    }
}
