use std::{
    collections::HashMap,
    fmt::Write as _,
    fs::OpenOptions,
    path::PathBuf,
};
use nu_ansi_term::{Color, Style};
use serde::Deserialize;
use termcolor::ColorChoice;
use tracing::{field::{Field, Visit}, Level};
use tracing_log::NormalizeEvent;
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter},
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
};

use crate::prelude::*;


#[derive(Debug, confique::Config)]
pub(crate) struct LogConfig {
    /// Specifies what log messages to emit, based on the module path and log level.
    ///
    /// This is a map where the key specifies a module path prefix, and the
    /// value specifies a minimum log level. For each log message, the map
    /// entry with the longest prefix matching the log's module path is chosen.
    /// If no such entry exists, the log is not emitted. Otherwise, that
    /// entry's level is used to check whether the log message should be
    /// emitted.
    ///
    /// Example: only allow ≥"info" logs generally, but all messages (including
    /// why a request did not get any group principals) from the `auth` module
    /// and ≥"debug" messages from the HTTP library `hyper`:
    ///
    ///    [log]
    ///    filters.groupgate = "info"
    ///    filters."groupgate::auth" = "trace"
    ///    filters.hyper = "debug"
    #[config(default = { "groupgate": "debug" })]
    pub(crate) filters: Filters,

    /// If this is set, log messages are also written to this file. The string
    /// `${cmd}` in this value is replaced by the subcommand name, e.g. `serve`
    /// or `check`. Example: "/var/log/groupgate-${cmd}.log".
    pub(crate) file: Option<PathBuf>,

    /// If this is set to `false`, log messages are not written to stdout.
    #[config(default = true)]
    pub(crate) stdout: bool,

    /// If set to `true`, HTTP header of each incoming request are logged
    /// (with 'trace' level). The value of `container.key_header` is redacted.
    #[config(default = false)]
    pub(crate) log_http_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub(crate) struct Filters(HashMap<String, LevelFilter>);

impl TryFrom<HashMap<String, String>> for Filters {
    type Error = String;
    fn try_from(value: HashMap<String, String>) -> Result<Self, Self::Error> {
        value.into_iter()
            .map(|(target_prefix, level)| Ok((target_prefix, parse_level_filter(&level)?)))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl Filters {
    /// Returns whether an event with the given target and level passes the
    /// filter. The longest matching prefix decides.
    fn allows(&self, target: &str, level: &Level) -> bool {
        self.0.iter()
            .filter(|(target_prefix, _)| target.starts_with(target_prefix.as_str()))
            .max_by_key(|(target_prefix, _)| target_prefix.len())
            .is_some_and(|(_, level_filter)| level <= level_filter)
    }

    fn max_level(&self) -> LevelFilter {
        self.0.values().max().copied().unwrap_or(LevelFilter::OFF)
    }
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    match s {
        "off" => Ok(LevelFilter::OFF),
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(format!("invalid log level '{other}'")),
    }
}

/// Installs our own logger globally. Must only be called once!
pub(crate) fn init(config: &LogConfig, color: ColorChoice, cmd: &str) -> Result<()> {
    let filter = {
        let filters = config.filters.clone();
        let max_level = filters.max_level();
        FilterFn::new(move |metadata| filters.allows(metadata.target(), metadata.level()))
            .with_max_level_hint(max_level)
    };

    let stdout_output = config.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(EventFormatter(color))
            .with_writer(std::io::stdout)
    });

    let file_output = config.file.as_ref()
        .map(|path| -> Result<std::fs::File> {
            use std::io::Write;

            let new_path = path.to_str()
                .ok_or_else(|| anyhow!("log file path is not valid UTF-8"))?
                .replace("${cmd}", cmd);

            let mut file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(new_path)
                .with_context(|| format!("failed to open/create log file '{}'", path.display()))?;

            // Empty line to make process restarts easier to spot.
            file.write_all(b"\n").context("could not write to log file")?;

            Ok(file)
        })
        .transpose()?
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .event_format(EventFormatter(color))
                .with_writer(file)
                .with_ansi(color == ColorChoice::Always)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_output)
        .with(stdout_output)
        .try_init()
        .context("failed to install logger")?;

    Ok(())
}


/// Prints `<time> <level> <target> >  <message> ~~ <fields>`.
#[derive(Clone, Copy)]
struct EventFormatter(ColorChoice);

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let use_ansi = self.0 == ColorChoice::Always
            || (writer.has_ansi_escapes() && self.0 != ColorChoice::Never);
        let style = |s: Style| if use_ansi { s } else { Style::new() };

        let normalized_metadata = event.normalized_metadata();
        let metadata = normalized_metadata.as_ref().unwrap_or(event.metadata());

        let dim_style = style(Style::new().dimmed());
        let (level_style, body_style) = match *metadata.level() {
            Level::ERROR => (Color::Red.bold(), Color::Red.normal()),
            Level::WARN => (Color::Yellow.bold(), Color::Yellow.normal()),
            Level::INFO => (Color::Green.normal(), Style::new()),
            Level::DEBUG => (Color::Blue.normal(), Style::new().dimmed()),
            Level::TRACE => (Color::Magenta.normal(), Color::DarkGray.normal()),
        };
        let (level_style, body_style) = (style(level_style), style(body_style));

        write!(
            writer,
            "{} {} {}  ",
            dim_style.paint(chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f").to_string()),
            level_style.paint(format!("{:5}", metadata.level())),
            dim_style.paint(format!("{} >", metadata.target())),
        )?;

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        if let Some(message) = &fields.message {
            write!(writer, "{}", body_style.paint(message))?;
        }
        if !fields.rest.is_empty() {
            if fields.message.is_some() {
                write!(writer, "{}", level_style.paint(" ~~ "))?;
            }
            write!(writer, "{}", body_style.italic().paint(fields.rest.trim_start()))?;
        }

        writeln!(writer)
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    rest: String,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            name if name.starts_with("log.") => {}
            name => {
                let _ = write!(self.rest, " {name}={value:?}");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
            .try_into()
            .unwrap()
    }

    #[test]
    fn longest_prefix_wins() {
        let f = filters(&[
            ("groupgate", "info"),
            ("groupgate::auth", "trace"),
            ("groupgate::http", "off"),
        ]);

        assert!(f.allows("groupgate", &Level::INFO));
        assert!(!f.allows("groupgate", &Level::DEBUG));
        assert!(f.allows("groupgate::auth::authorizer", &Level::TRACE));
        assert!(!f.allows("groupgate::http", &Level::ERROR));
        assert!(!f.allows("hyper", &Level::ERROR));
        assert_eq!(f.max_level(), LevelFilter::TRACE);
    }

    #[test]
    fn invalid_level() {
        let raw = HashMap::from([("groupgate".to_string(), "verbose".to_string())]);
        assert!(Filters::try_from(raw).is_err());
    }

    #[test]
    fn empty_filters_allow_nothing() {
        let f = filters(&[]);
        assert!(!f.allows("groupgate", &Level::ERROR));
        assert_eq!(f.max_level(), LevelFilter::OFF);
    }
}
