//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, `severity` second, remaining fields sorted by key
//! - Synchronous, unbuffered
//! - ERROR and FATAL go to stderr, everything else to stdout
//!
//! The minimum severity defaults to INFO and can be changed through the
//! `LOGVIEW_LOG` environment variable (`trace`, `info`, `warn`, `error`,
//! `fatal`, `off`) or [`Logger::set_min_severity`].

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn parse(s: &str) -> Option<u8> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace as u8),
            "info" => Some(Severity::Info as u8),
            "warn" => Some(Severity::Warn as u8),
            "error" => Some(Severity::Error as u8),
            "fatal" => Some(Severity::Fatal as u8),
            "off" => Some(OFF),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const OFF: u8 = u8::MAX;
const UNSET: u8 = u8::MAX - 1;

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(UNSET);
static ENV_SEVERITY: OnceLock<u8> = OnceLock::new();

fn min_severity() -> u8 {
    match MIN_SEVERITY.load(Ordering::Relaxed) {
        UNSET => *ENV_SEVERITY.get_or_init(|| {
            std::env::var("LOGVIEW_LOG")
                .ok()
                .and_then(|v| Severity::parse(&v))
                .unwrap_or(Severity::Info as u8)
        }),
        level => level,
    }
}

pub struct Logger;

impl Logger {
    /// Override the minimum severity. `None` silences all output.
    pub fn set_min_severity(severity: Option<Severity>) {
        let level = severity.map(|s| s as u8).unwrap_or(OFF);
        MIN_SEVERITY.store(level, Ordering::Relaxed);
    }

    pub fn enabled(severity: Severity) -> bool {
        let min = min_severity();
        min != OFF && severity as u8 >= min
    }

    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        if severity >= Severity::Error {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::format_line(severity, event, fields);
        // Logging never fails the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        push_json_string(&mut output, event);
        output.push_str(",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push('"');

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (key, value) in sorted {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }

        output.push_str("}\n");
        output
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

fn push_json_string(output: &mut String, s: &str) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => output.push_str(&format!("\\u{:04x}", c as u32)),
            c => output.push(c),
        }
    }
    output.push('"');
}

#[cfg(test)]
pub(crate) fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}
