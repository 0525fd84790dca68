use clap::ValueEnum;
use tracing_subscriber::fmt::time::Uptime;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Timestamp attached to each log line.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogTimestamps {
    /// Wall-clock time.
    Wall,
    /// Time since process start; easier to read against ACK timeouts.
    Uptime,
    Off,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel, timestamps: LogTimestamps) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    let _ = match (format, timestamps) {
        (LogFormat::Text, LogTimestamps::Wall) => builder.try_init(),
        (LogFormat::Text, LogTimestamps::Uptime) => builder.with_timer(Uptime::default()).try_init(),
        (LogFormat::Text, LogTimestamps::Off) => builder.without_time().try_init(),
        (LogFormat::Json, LogTimestamps::Wall) => builder.json().try_init(),
        (LogFormat::Json, LogTimestamps::Uptime) => {
            builder.json().with_timer(Uptime::default()).try_init()
        }
        (LogFormat::Json, LogTimestamps::Off) => builder.json().without_time().try_init(),
    };
}
