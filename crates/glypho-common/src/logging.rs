//! Logging setup
//!
//! Every glypho command logs through `tracing`. [`init_logging`] installs a
//! global subscriber from a [`LogConfig`]: console lines on stderr (stdout is
//! reserved for TSV written by `search-uniprot`), optional daily log files,
//! and text or JSON lines filtered by level plus extra directives.
//!
//! ```no_run
//! use glypho_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::builder().level(LogLevel::Debug).build();
//! let _guard = init_logging(&config).unwrap();
//!
//! let species = "Escherichia_coli";
//! tracing::info!(species = %species, "Resolving taxonomy");
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("warning") {
            return Ok(LogLevel::Warn);
        }
        let level: Level = s.parse().map_err(|_| anyhow!("Invalid log level: {s}"))?;
        Ok(match level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            _ => LogLevel::Error,
        })
    }
}

/// Destination of log lines; the console is always stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "stderr" => Ok(Self::Console),
            "file" => Ok(Self::File),
            "both" | "all" => Ok(Self::Both),
            other => Err(anyhow!("Invalid log output: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("Invalid log format: {other}")),
        }
    }
}

/// How a glypho process logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,

    /// Directory of the daily log files
    pub log_dir: PathBuf,

    /// File name prefix; `glypho` rotates into `glypho.2026-10-19`
    pub log_file_prefix: String,

    /// Comma separated directives such as `reqwest=warn,glypho_pipeline::ncbi=debug`
    pub filter_directives: Option<String>,

    /// Add source file and line to every event
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "glypho".to_string(),
            filter_directives: None,
            include_location: false,
        }
    }
}

/// Read `LOG_<name>` if set
fn log_var(name: &str) -> Option<String> {
    std::env::var(format!("LOG_{name}")).ok()
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder { config: LogConfig::default() }
    }

    /// Apply `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`,
    /// `LOG_FILE_PREFIX`, `LOG_FILTER` and `LOG_INCLUDE_LOCATION`
    pub fn merge_env(self) -> Result<Self> {
        let mut config = self;
        if let Some(level) = log_var("LEVEL") {
            config.level = level.parse()?;
        }
        if let Some(output) = log_var("OUTPUT") {
            config.output = output.parse()?;
        }
        if let Some(format) = log_var("FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(dir) = log_var("DIR") {
            config.log_dir = dir.into();
        }
        if let Some(prefix) = log_var("FILE_PREFIX") {
            config.log_file_prefix = prefix;
        }
        config.filter_directives = log_var("FILTER").or(config.filter_directives);
        if let Some(flag) = log_var("INCLUDE_LOCATION") {
            config.include_location = matches!(flag.trim(), "1" | "true" | "yes");
        }
        Ok(config)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::from_default_env().add_directive(Level::from(self.level).into());
        let extra = self.filter_directives.as_deref().unwrap_or_default();

        extra
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .try_fold(base, |filter, directive| {
                let directive = directive
                    .parse::<Directive>()
                    .with_context(|| format!("Bad log filter directive '{directive}'"))?;
                Ok(filter.add_directive(directive))
            })
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_span_events(FmtSpan::CLOSE);

        match self.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        }
    }
}

pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Flushes buffered file logging when dropped
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber; call once and keep the guard until exit
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_guard = None;

    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        layers.push(config.layer(std::io::stderr, true));
    }

    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Cannot create log directory {}", config.log_dir.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
            &config.log_dir,
            &config.log_file_prefix,
        ));
        file_guard = Some(guard);
        layers.push(config.layer(writer, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert!("chatty".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_output_names() {
        assert_eq!("stderr".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!(" Both ".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!("syslog".parse::<LogOutput>().is_err());
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
    }

    #[test]
    fn test_builder_for_download_runs() {
        let config = LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::File)
            .format(LogFormat::Json)
            .log_dir("/tmp/glypho-logs")
            .log_file_prefix("download-top-taxa")
            .filter_directives("reqwest=warn, glypho_pipeline::ncbi=trace")
            .build();

        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/glypho-logs"));
        assert_eq!(config.log_file_prefix, "download-top-taxa");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_bad_directive_rejected() {
        let config = LogConfig::builder().filter_directives("reqwest=loudest").build();
        assert!(config.env_filter().is_err());
    }
}
