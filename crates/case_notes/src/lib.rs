#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Case Notes
//!
//! A prefix-aware diagnostic note stream for table-driven tests.
//!
//! A [`NoteStream`] carries a single "current prefix" slot. Every note written
//! while the prefix is set is rendered with it, so output emitted from deep
//! inside a test body still says which case produced it.
//!
//! - Multiple levels (debug, info, warn, error)
//! - Structured key-value pairs
//! - Multiple output formatters (text, JSON, logfmt)
//! - Environment-driven configuration via [`Options::from_env`]
//!
//! ## Example
//!
//! ```rust
//! use case_notes::NoteStream;
//!
//! let notes = NoteStream::new();
//! notes.set_prefix("addition");
//! notes.note("checking carry");
//! notes.clear_prefix();
//! ```

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use termcolor::{Buffer, Color, ColorSpec, WriteColor};
use thiserror::Error;

/// Log level for filtering notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    /// Debug level (most verbose).
    Debug,
    /// Info level (default). Plain notes are written at this level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl Level {
    /// Returns the string representation of the level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Returns the four-letter tag used by the text formatter.
    #[must_use]
    pub fn as_upper_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBU",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERRO",
        }
    }

    fn color(&self) -> Color {
        match self {
            Self::Debug => Color::Blue,
            Self::Info => Color::Cyan,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid level string.
///
/// Accepted strings (case-insensitive): `"debug"`, `"info"`, `"warn"`, `"error"`.
///
/// ```rust
/// use case_notes::Level;
/// use std::str::FromStr;
///
/// assert!(Level::from_str("INFO").is_ok());
/// assert!(Level::from_str("verbose").is_err());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid level: {0:?}")]
pub struct ParseLevelError(String);

/// Output formatter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatter {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// One JSON object per note.
    Json,
    /// Logfmt key=value format.
    Logfmt,
}

impl std::str::FromStr for Formatter {
    type Err = ParseFormatterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "logfmt" => Ok(Self::Logfmt),
            _ => Err(ParseFormatterError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown formatter name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid formatter: {0:?} (expected text, json or logfmt)")]
pub struct ParseFormatterError(String);

/// Standard keys used in structured notes.
pub mod keys {
    /// Key for timestamp.
    pub const TIMESTAMP: &str = "time";
    /// Key for message.
    pub const MESSAGE: &str = "msg";
    /// Key for level.
    pub const LEVEL: &str = "level";
    /// Key for prefix.
    pub const PREFIX: &str = "prefix";

    /// Keys written by the stream itself in structured formats.
    pub const RESERVED: [&str; 4] = [TIMESTAMP, MESSAGE, LEVEL, PREFIX];

    /// Namespace for caller fields that would shadow a reserved key.
    pub const FIELD_NAMESPACE: &str = "field.";
}

/// Environment variable holding the minimum level.
pub const ENV_LEVEL: &str = "CASE_NOTES_LEVEL";
/// Environment variable holding the formatter name.
pub const ENV_FORMAT: &str = "CASE_NOTES_FORMAT";
/// Presence of this variable disables colours.
pub const ENV_NO_COLOR: &str = "NO_COLOR";

/// Default time format.
pub const DEFAULT_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Callback invoked when writing a note fails.
pub type ErrorHandler = Arc<dyn Fn(io::Error) + Send + Sync>;

/// Destination shared between a stream and the streams derived from it.
type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Note stream options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Minimum level written.
    pub level: Level,
    /// Initial prefix.
    pub prefix: String,
    /// Output formatter.
    pub formatter: Formatter,
    /// Whether to report timestamps.
    pub report_timestamp: bool,
    /// Time format string (chrono syntax).
    pub time_format: String,
    /// Whether the text formatter colours level tags.
    pub colors: bool,
    /// Fields appended to every note.
    pub fields: Vec<(String, String)>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            level: Level::Info,
            prefix: String::new(),
            formatter: Formatter::Text,
            report_timestamp: false,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            colors: false,
            fields: Vec::new(),
        }
    }
}

impl Options {
    /// Builds options from `CASE_NOTES_LEVEL`, `CASE_NOTES_FORMAT` and `NO_COLOR`.
    ///
    /// Unparseable values keep the default and emit a `tracing` warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Options::from_env`] but reads variables through `lookup`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(raw) = lookup(ENV_LEVEL) {
            match raw.parse::<Level>() {
                Ok(level) => opts.level = level,
                Err(err) => tracing::warn!(var = ENV_LEVEL, %err, "ignoring invalid value"),
            }
        }

        if let Some(raw) = lookup(ENV_FORMAT) {
            match raw.parse::<Formatter>() {
                Ok(formatter) => opts.formatter = formatter,
                Err(err) => tracing::warn!(var = ENV_FORMAT, %err, "ignoring invalid value"),
            }
        }

        opts.colors = lookup(ENV_NO_COLOR).is_none() && io::stderr().is_terminal();
        opts
    }
}

struct StreamInner {
    writer: SharedWriter,
    level: Level,
    prefix: String,
    formatter: Formatter,
    report_timestamp: bool,
    time_format: String,
    colors: bool,
    fields: Vec<(String, String)>,
    error_handler: Option<ErrorHandler>,
    has_warned_io_failure: bool,
}

/// A prefix-aware note stream.
///
/// Cloning is cheap and clones share the prefix slot, so a runner holding
/// one clone and a test body holding another see the same prefix.
pub struct NoteStream {
    inner: Arc<RwLock<StreamInner>>,
}

impl Default for NoteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for NoteStream {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for NoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("NoteStream")
            .field("level", &inner.level)
            .field("prefix", &inner.prefix)
            .field("formatter", &inner.formatter)
            .field("report_timestamp", &inner.report_timestamp)
            .finish()
    }
}

impl NoteStream {
    /// Creates a stream writing to stderr with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates a stream writing to stderr with the given options.
    #[must_use]
    pub fn with_options(opts: Options) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StreamInner {
                writer: Arc::new(Mutex::new(Box::new(io::stderr()))),
                level: opts.level,
                prefix: opts.prefix,
                formatter: opts.formatter,
                report_timestamp: opts.report_timestamp,
                time_format: opts.time_format,
                colors: opts.colors,
                fields: opts.fields,
                error_handler: None,
                has_warned_io_failure: false,
            })),
        }
    }

    /// Replaces the destination. Colours are turned off.
    #[must_use]
    pub fn with_writer<W: Write + Send + 'static>(self, writer: W) -> Self {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.writer = Arc::new(Mutex::new(Box::new(writer)));
        inner.colors = false;
        drop(inner);
        self
    }

    /// Sets a handler for I/O failures while writing notes.
    ///
    /// Without a handler the first failure is reported once on stderr and
    /// later failures are dropped.
    #[must_use]
    pub fn with_error_handler<F>(self, handler: F) -> Self
    where
        F: Fn(io::Error) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.error_handler = Some(Arc::new(handler));
        drop(inner);
        self
    }

    /// Sets the current prefix.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.prefix = prefix.into();
    }

    /// Returns the current prefix.
    #[must_use]
    pub fn prefix(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.prefix.clone()
    }

    /// Resets the prefix to empty.
    pub fn clear_prefix(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.prefix.clear();
    }

    /// Sets the minimum level.
    pub fn set_level(&self, level: Level) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.level = level;
    }

    /// Returns the minimum level.
    #[must_use]
    pub fn level(&self) -> Level {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.level
    }

    /// Sets the formatter.
    pub fn set_formatter(&self, formatter: Formatter) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.formatter = formatter;
    }

    /// Returns the formatter.
    #[must_use]
    pub fn formatter(&self) -> Formatter {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.formatter
    }

    /// Sets whether timestamps are reported.
    pub fn set_report_timestamp(&self, report: bool) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.report_timestamp = report;
    }

    /// Creates a stream with additional default fields.
    ///
    /// The new stream shares the destination but owns its prefix slot.
    #[must_use]
    pub fn with_fields(&self, fields: &[(&str, &str)]) -> Self {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut new_fields = inner.fields.clone();
        new_fields.extend(fields.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        Self {
            inner: Arc::new(RwLock::new(StreamInner {
                writer: Arc::clone(&inner.writer),
                level: inner.level,
                prefix: inner.prefix.clone(),
                formatter: inner.formatter,
                report_timestamp: inner.report_timestamp,
                time_format: inner.time_format.clone(),
                colors: inner.colors,
                fields: new_fields,
                error_handler: inner.error_handler.clone(),
                has_warned_io_failure: false,
            })),
        }
    }

    /// Creates a stream with a different prefix sharing this destination.
    #[must_use]
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        let derived = self.with_fields(&[]);
        derived.set_prefix(prefix);
        derived
    }

    /// Writes an info-level note.
    pub fn note(&self, msg: &str) {
        self.log(Level::Info, msg, &[]);
    }

    /// Writes a debug note.
    pub fn debug(&self, msg: &str, keyvals: &[(&str, &str)]) {
        self.log(Level::Debug, msg, keyvals);
    }

    /// Writes an info note.
    pub fn info(&self, msg: &str, keyvals: &[(&str, &str)]) {
        self.log(Level::Info, msg, keyvals);
    }

    /// Writes a warning note.
    pub fn warn(&self, msg: &str, keyvals: &[(&str, &str)]) {
        self.log(Level::Warn, msg, keyvals);
    }

    /// Writes an error note.
    pub fn error(&self, msg: &str, keyvals: &[(&str, &str)]) {
        self.log(Level::Error, msg, keyvals);
    }

    /// Writes `count` empty lines (text format only).
    pub fn blank_lines(&self, count: usize) {
        let inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if count == 0 || inner.formatter != Formatter::Text || Level::Info < inner.level {
            return;
        }
        let output = "\n".repeat(count);
        Self::write_out(inner, &output);
    }

    /// Writes a note at the given level.
    ///
    /// Formatting and writing happen under one lock so a concurrent
    /// `set_prefix` cannot split a note.
    pub fn log(&self, level: Level, msg: &str, keyvals: &[(&str, &str)]) {
        let inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if level < inner.level {
            return;
        }

        let output = match inner.formatter {
            Formatter::Text => format_text(&inner, level, msg, keyvals),
            Formatter::Json => format_json(&inner, level, msg, keyvals),
            Formatter::Logfmt => format_logfmt(&inner, level, msg, keyvals),
        };
        Self::write_out(inner, &output);
    }

    /// Writes under the caller's lock; the lock is released before the
    /// error handler runs so the handler may use the stream.
    fn write_out(mut inner: RwLockWriteGuard<'_, StreamInner>, output: &str) {
        let result = {
            let mut writer = inner.writer.lock().unwrap_or_else(|e| e.into_inner());
            writer
                .write_all(output.as_bytes())
                .and_then(|()| writer.flush())
        };

        if let Err(e) = result {
            if let Some(ref handler) = inner.error_handler {
                let handler = Arc::clone(handler);
                drop(inner);
                handler(e);
            } else if !inner.has_warned_io_failure {
                inner.has_warned_io_failure = true;
                drop(inner);
                let _ = io::stderr().write_all(format!("case_notes: write failed: {e}\n").as_bytes());
            }
        }
    }
}

fn timestamp(inner: &StreamInner) -> Option<String> {
    inner
        .report_timestamp
        .then(|| chrono::Utc::now().format(&inner.time_format).to_string())
}

fn render_level(level: Level, colors: bool) -> String {
    let tag = level.as_upper_str();
    if !colors {
        return tag.to_string();
    }
    let mut buffer = Buffer::ansi();
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(level.color())).set_bold(true);
    let written = buffer
        .set_color(&spec)
        .and_then(|()| write!(buffer, "{tag}"))
        .and_then(|()| buffer.reset());
    match written {
        Ok(()) => String::from_utf8_lossy(buffer.as_slice()).into_owned(),
        Err(_) => tag.to_string(),
    }
}

/// One output line per message line, each carrying the full header.
fn format_text(inner: &StreamInner, level: Level, msg: &str, keyvals: &[(&str, &str)]) -> String {
    let mut header = String::new();
    if let Some(ts) = timestamp(inner) {
        header.push_str(&ts);
        header.push(' ');
    }
    header.push_str(&render_level(level, inner.colors));
    if !inner.prefix.is_empty() {
        header.push(' ');
        header.push_str(&inner.prefix);
        header.push(':');
    }

    let mut trailer = String::new();
    for (key, value) in inner
        .fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(keyvals.iter().copied())
    {
        trailer.push(' ');
        write_logfmt_pair(&mut trailer, key, value);
    }

    let lines: Vec<&str> = if msg.is_empty() {
        vec![""]
    } else {
        msg.split('\n').collect()
    };
    let last = lines.len() - 1;

    let mut output = String::new();
    for (i, line) in lines.into_iter().enumerate() {
        output.push_str(&header);
        if !line.is_empty() {
            output.push(' ');
            output.push_str(line);
        }
        if i == last {
            output.push_str(&trailer);
        }
        output.push('\n');
    }
    output
}

#[derive(Serialize)]
struct JsonNote<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    level: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    prefix: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    msg: &'a str,
    #[serde(flatten)]
    fields: BTreeMap<Cow<'a, str>, &'a str>,
}

fn format_json(inner: &StreamInner, level: Level, msg: &str, keyvals: &[(&str, &str)]) -> String {
    let fields = inner
        .fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(keyvals.iter().copied())
        .map(|(k, v)| (field_key(k), v))
        .collect();
    let note = JsonNote {
        time: timestamp(inner),
        level: level.as_str(),
        prefix: &inner.prefix,
        msg,
        fields,
    };
    match serde_json::to_string(&note) {
        Ok(mut json) => {
            json.push('\n');
            json
        }
        Err(_) => String::new(),
    }
}

fn format_logfmt(inner: &StreamInner, level: Level, msg: &str, keyvals: &[(&str, &str)]) -> String {
    let mut output = String::new();
    let mut first = true;
    let mut field = |output: &mut String, key: &str, value: &str| {
        if !first {
            output.push(' ');
        }
        write_logfmt_pair(output, key, value);
        first = false;
    };

    if let Some(ts) = timestamp(inner) {
        field(&mut output, keys::TIMESTAMP, &ts);
    }
    field(&mut output, keys::LEVEL, level.as_str());
    if !inner.prefix.is_empty() {
        field(&mut output, keys::PREFIX, &inner.prefix);
    }
    if !msg.is_empty() {
        field(&mut output, keys::MESSAGE, msg);
    }
    for (key, value) in &inner.fields {
        field(&mut output, &*field_key(key), value);
    }
    for (key, value) in keyvals {
        field(&mut output, &*field_key(key), value);
    }

    output.push('\n');
    output
}

/// Caller keys that clash with a reserved key move under `field.`.
fn field_key(key: &str) -> Cow<'_, str> {
    if keys::RESERVED.contains(&key) {
        Cow::Owned(format!("{}{key}", keys::FIELD_NAMESPACE))
    } else {
        Cow::Borrowed(key)
    }
}

fn write_logfmt_pair(output: &mut String, key: &str, value: &str) {
    output.push_str(key);
    output.push('=');
    if needs_quoting(value) {
        output.push('"');
        output.push_str(&escape_logfmt(value));
        output.push('"');
    } else {
        output.push_str(value);
    }
}

/// Checks if a value needs quoting in logfmt.
fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '=' || c.is_control())
}

fn escape_logfmt(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c => result.push(c),
        }
    }
    result
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        DEFAULT_TIME_FORMAT, ENV_FORMAT, ENV_LEVEL, ENV_NO_COLOR, ErrorHandler, Formatter, Level,
        NoteStream, Options, ParseFormatterError, ParseLevelError, keys,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured() -> (NoteStream, Capture) {
        let capture = Capture::default();
        let stream = NoteStream::new().with_writer(capture.clone());
        (stream, capture)
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert!("warning".parse::<Level>().is_err());
    }

    #[test]
    fn test_formatter_parse() {
        assert_eq!("JSON".parse::<Formatter>().unwrap(), Formatter::Json);
        assert_eq!("logfmt".parse::<Formatter>().unwrap(), Formatter::Logfmt);
        assert!("yaml".parse::<Formatter>().is_err());
    }

    #[test]
    fn test_stream_new() {
        let stream = NoteStream::new();
        assert_eq!(stream.level(), Level::Info);
        assert!(stream.prefix().is_empty());
    }

    #[test]
    fn test_prefix_shared_between_clones() {
        let stream = NoteStream::new();
        let clone = stream.clone();
        stream.set_prefix("case-1");
        assert_eq!(clone.prefix(), "case-1");
        clone.clear_prefix();
        assert!(stream.prefix().is_empty());
    }

    #[test]
    fn test_with_prefix_is_independent() {
        let stream = NoteStream::new();
        let derived = stream.with_prefix("other");
        assert_eq!(derived.prefix(), "other");
        assert!(stream.prefix().is_empty());
    }

    #[test]
    fn test_text_note_with_prefix() {
        let (stream, capture) = captured();
        stream.set_prefix("pref1");
        stream.note("sum ok");
        assert_eq!(capture.contents(), "INFO pref1: sum ok\n");
    }

    #[test]
    fn test_text_note_without_prefix() {
        let (stream, capture) = captured();
        stream.note("plain");
        assert_eq!(capture.contents(), "INFO plain\n");
    }

    #[test]
    fn test_text_multiline_prefixes_every_line() {
        let (stream, capture) = captured();
        stream.set_prefix("p");
        stream.info("one\ntwo", &[("k", "v")]);
        assert_eq!(capture.contents(), "INFO p: one\nINFO p: two k=v\n");
    }

    #[test]
    fn test_level_filtering() {
        let (stream, capture) = captured();
        stream.debug("hidden", &[]);
        stream.set_level(Level::Debug);
        stream.debug("shown", &[]);
        assert_eq!(capture.contents(), "DEBU shown\n");
    }

    #[test]
    fn test_blank_lines_text_only() {
        let (stream, capture) = captured();
        stream.blank_lines(2);
        assert_eq!(capture.contents(), "\n\n");

        let (stream, capture) = captured();
        stream.set_formatter(Formatter::Json);
        stream.blank_lines(2);
        assert!(capture.contents().is_empty());
    }

    #[test]
    fn test_json_note() {
        let (stream, capture) = captured();
        stream.set_formatter(Formatter::Json);
        stream.set_prefix("pref");
        stream.info("hello \"world\"", &[("case", "3")]);

        let value: serde_json::Value = serde_json::from_str(capture.contents().trim()).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["prefix"], "pref");
        assert_eq!(value["msg"], "hello \"world\"");
        assert_eq!(value["case"], "3");
        assert!(value.get("time").is_none());
    }

    #[test]
    fn test_json_omits_empty_prefix() {
        let (stream, capture) = captured();
        stream.set_formatter(Formatter::Json);
        stream.note("x");
        let value: serde_json::Value = serde_json::from_str(capture.contents().trim()).unwrap();
        assert!(value.get("prefix").is_none());
    }

    #[test]
    fn test_logfmt_note() {
        let (stream, capture) = captured();
        stream.set_formatter(Formatter::Logfmt);
        stream.set_prefix("p1");
        stream.warn("two words", &[("n", "1")]);
        assert_eq!(
            capture.contents(),
            "level=warn prefix=p1 msg=\"two words\" n=1\n"
        );
    }

    #[test]
    fn test_json_clashing_keys_are_namespaced() {
        let (stream, capture) = captured();
        stream.set_formatter(Formatter::Json);
        stream.set_prefix("p");
        stream.info("m", &[("level", "custom"), ("msg", "other")]);

        let raw = capture.contents();
        assert_eq!(raw.matches("\"level\"").count(), 1);
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["msg"], "m");
        assert_eq!(value["field.level"], "custom");
        assert_eq!(value["field.msg"], "other");
    }

    #[test]
    fn test_logfmt_clashing_keys_are_namespaced() {
        let (stream, capture) = captured();
        stream.set_formatter(Formatter::Logfmt);
        let tagged = stream.with_fields(&[("prefix", "f")]);
        tagged.info("m", &[("time", "now")]);
        assert_eq!(
            capture.contents(),
            "level=info msg=m field.prefix=f field.time=now\n"
        );
    }

    #[test]
    fn test_text_keeps_caller_keys() {
        let (stream, capture) = captured();
        stream.info("m", &[("level", "x")]);
        assert_eq!(capture.contents(), "INFO m level=x\n");
    }

    #[test]
    fn test_with_fields_shares_destination() {
        let (stream, capture) = captured();
        let tagged = stream.with_fields(&[("suite", "math")]);
        tagged.note("a");
        stream.note("b");
        assert_eq!(capture.contents(), "INFO a suite=math\nINFO b\n");
    }

    #[test]
    fn test_needs_quoting() {
        assert!(needs_quoting(""));
        assert!(needs_quoting("hello world"));
        assert!(needs_quoting("key=value"));
        assert!(!needs_quoting("simple"));
    }

    #[test]
    fn test_escape_logfmt() {
        assert_eq!(escape_logfmt("line1\nline2"), "line1\\nline2");
        assert_eq!(escape_logfmt("a\"b"), "a\\\"b");
    }

    #[test]
    fn test_options_from_lookup() {
        let env: HashMap<&str, &str> = [(ENV_LEVEL, "debug"), (ENV_FORMAT, "logfmt"), (ENV_NO_COLOR, "1")]
            .into_iter()
            .collect();
        let opts = Options::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(opts.level, Level::Debug);
        assert_eq!(opts.formatter, Formatter::Logfmt);
        assert!(!opts.colors);
    }

    #[test]
    fn test_options_from_lookup_ignores_invalid() {
        let opts = Options::from_lookup(|k| match k {
            ENV_LEVEL => Some("loud".to_string()),
            ENV_FORMAT => Some("xml".to_string()),
            _ => None,
        });
        assert_eq!(opts.level, Level::Info);
        assert_eq!(opts.formatter, Formatter::Text);
    }

    #[test]
    fn test_colored_level_tag() {
        let rendered = render_level(Level::Error, true);
        assert!(rendered.contains("ERRO"));
        assert!(rendered.contains('\x1b'));
        assert_eq!(render_level(Level::Error, false), "ERRO");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("simulated failure"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_error_handler_called() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let stream = NoteStream::new()
            .with_writer(FailingWriter)
            .with_error_handler(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            });

        stream.note("a");
        stream.note("b");
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
