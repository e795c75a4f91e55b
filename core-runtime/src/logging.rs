//! Tracing setup for the drive workspace.
//!
//! [`init_logging`] installs one global `tracing-subscriber` registry:
//! an `EnvFilter` scoped to the workspace crates, a formatter for stdout and,
//! when the host hands over a [`LoggerSink`], a layer mirroring each event
//! into it.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::{ConsoleLogger, LogLevel};
//!
//! init_logging(
//!     LoggingConfig::new(LogLevel::Debug)
//!         .with_format(LogFormat::Compact)
//!         .with_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! ```
//!
//! Upload session URLs authorise writes on their own. Log them through
//! [`redact_url`]; the sink layer additionally masks [`SENSITIVE_FIELDS`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bridge_traits::{LogEntry, LogLevel, LoggerSink};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{Error, Result};

/// Crates admitted at the configured level by the default filter
const WORKSPACE_TARGETS: [&str; 4] = [
    "drive_storage",
    "core_runtime",
    "provider_onedrive",
    "bridge_desktop",
];

/// HTTP stack crates, held at `warn`
const TRANSPORT_TARGETS: [&str; 3] = ["h2", "hyper", "reqwest"];

/// Field names whose values never reach a host sink in clear
pub const SENSITIVE_FIELDS: [&str; 6] = [
    "token",
    "secret",
    "password",
    "authorization",
    "bearer",
    "upload_url",
];

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    /// One JSON object per line
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Raw `EnvFilter` directives; replace the workspace default when set
    pub directives: Option<String>,
    pub sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close (e.g. one per storage operation)
    pub span_events: bool,
    pub thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LoggingConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            format: LogFormat::default(),
            level,
            directives: None,
            sink: None,
            span_events: false,
            thread_info: false,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_thread_info(mut self, enabled: bool) -> Self {
        self.thread_info = enabled;
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        let directives = match &self.directives {
            Some(custom) => custom.clone(),
            None => WORKSPACE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, self.level.as_str()))
                .chain(TRANSPORT_TARGETS.iter().map(|target| format!("{}=warn", target)))
                .collect::<Vec<_>>()
                .join(","),
        };

        EnvFilter::try_new(&directives)
            .map_err(|e| Error::Config(format!("Invalid log directives '{}': {}", directives, e)))
    }

    fn formatter(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = tracing_subscriber::fmt::layer()
            .with_thread_ids(self.thread_info)
            .with_thread_names(self.thread_info)
            .with_span_events(spans);

        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Json => layer
                .json()
                .flatten_event(true)
                .with_current_span(self.span_events)
                .boxed(),
        }
    }
}

/// Install the global subscriber.
///
/// Fails with [`Error::Config`] when the directives do not parse or a
/// global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = config.filter()?;

    tracing_subscriber::registry()
        .with(config.formatter())
        .with(filter)
        .with(HostSinkLayer {
            sink: config.sink.clone(),
        })
        .try_init()
        .map_err(|e| Error::Config(format!("Logging already initialised: {}", e)))
}

/// Mirrors events into the host's [`LoggerSink`], masking sensitive fields.
struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut entry = LogEntry::new(level, metadata.target(), "");
        event.record(&mut EntryVisitor(&mut entry));
        if entry.message.is_empty() {
            entry.message = metadata.name().to_string();
        }
        if let Some(span) = ctx.event_span(event) {
            entry = entry.with_span(span.name());
        }

        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("log sink rejected entry: {}", e);
                    }
                });
            }
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("log sink rejected entry: {}", e);
                }
            }
        }
    }
}

struct EntryVisitor<'a>(&'a mut LogEntry);

impl Visit for EntryVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.message = value.to_string();
        } else {
            self.0
                .fields
                .insert(field.name().to_string(), redact_field(field.name(), value).into_owned());
        }
    }

    // Numbers, bools and errors arrive here through the trait defaults.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Mask `value` when `field` names a credential (case-insensitive substring
/// match against [`SENSITIVE_FIELDS`]).
///
/// ```
/// use core_runtime::logging::redact_field;
///
/// assert_eq!(redact_field("access_token", "eyJ0..."), "[REDACTED]");
/// assert_eq!(redact_field("path", "docs/a.txt"), "docs/a.txt");
/// ```
pub fn redact_field<'a>(field: &str, value: &'a str) -> Cow<'a, str> {
    let field = field.to_ascii_lowercase();
    if SENSITIVE_FIELDS.iter().any(|name| field.contains(name)) {
        Cow::Borrowed(REDACTED)
    } else {
        Cow::Borrowed(value)
    }
}

/// Reduce an absolute URL to its scheme and host.
///
/// Provider-relative locators (no scheme) carry no credentials and pass
/// through unchanged.
///
/// ```
/// use core_runtime::logging::redact_url;
///
/// assert_eq!(
///     redact_url("https://up.example.com/sessions/abc?sig=xyz"),
///     "https://up.example.com/[REDACTED]"
/// );
/// assert_eq!(redact_url("/me/drive/root:/a.txt"), "/me/drive/root:/a.txt");
/// ```
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };

    let authority_start = scheme_end + 3;
    let rest = &url[authority_start..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    // Drop userinfo if present
    let authority = &rest[..host_end];
    let host = authority.rsplit('@').next().unwrap_or(authority);

    if host_end == rest.len() {
        format!("{}{}", &url[..authority_start], host)
    } else {
        format!("{}{}/{}", &url[..authority_start], host, REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn recorded<F: FnOnce()>(emit: F) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let subscriber = tracing_subscriber::registry().with(HostSinkLayer {
            sink: Some(sink.clone()),
        });
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_default_directives_scope_workspace() {
        let filter = LoggingConfig::new(LogLevel::Debug)
            .filter()
            .unwrap()
            .to_string();

        assert!(filter.contains("provider_onedrive=debug"));
        assert!(filter.contains("drive_storage=debug"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn test_custom_directives_replace_default() {
        let filter = LoggingConfig::default()
            .with_directives("provider_onedrive::upload=trace")
            .filter()
            .unwrap()
            .to_string();

        assert!(filter.contains("provider_onedrive::upload=trace"));
        assert!(!filter.contains("hyper"));
    }

    #[test]
    fn test_bad_directives_rejected() {
        let result = LoggingConfig::default()
            .with_directives("provider_onedrive=[")
            .filter();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_sink_receives_fields_and_span() {
        let entries = recorded(|| {
            let span = tracing::info_span!("write");
            let _entered = span.enter();
            tracing::info!(target: "provider_onedrive", offset = 327680u64, final_chunk = false, "chunk accepted");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.target, "provider_onedrive");
        assert_eq!(entry.message, "chunk accepted");
        assert_eq!(entry.fields["offset"], "327680");
        assert_eq!(entry.fields["final_chunk"], "false");
        assert_eq!(entry.span.as_deref(), Some("write"));
    }

    #[test]
    fn test_sink_masks_credentials() {
        let entries = recorded(|| {
            tracing::warn!(upload_url = "https://up.example.com/s/1", path = "a.txt", "retrying");
        });

        assert_eq!(entries[0].fields["upload_url"], REDACTED);
        assert_eq!(entries[0].fields["path"], "a.txt");
    }

    #[test]
    fn test_sink_min_level_respected() {
        let entries = recorded(|| tracing::trace!("page fetched"));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_redact_field() {
        assert_eq!(redact_field("Authorization", "Bearer x"), REDACTED);
        assert_eq!(redact_field("upload_url", "https://x"), REDACTED);
        assert_eq!(redact_field("status", "429"), "429");
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("https://api.onedrive.com/rup/abc123?token=x"),
            "https://api.onedrive.com/[REDACTED]"
        );
        assert_eq!(
            redact_url("https://user:pw@host.example.com/path"),
            "https://host.example.com/[REDACTED]"
        );
        assert_eq!(redact_url("https://host.example.com"), "https://host.example.com");
        assert_eq!(
            redact_url("/me/drive/root:/docs/a.txt:/content"),
            "/me/drive/root:/docs/a.txt:/content"
        );
    }
}
