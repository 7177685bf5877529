//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use obsidian_client::{Notice, NoticeKind};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write one record of a stream: a single JSON line, or its table form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_record<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Short headline, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            success: false,
        }
    }
}

impl From<&Notice> for Message {
    fn from(notice: &Notice) -> Self {
        Self {
            title: Some(notice.title.clone()),
            message: notice.description.clone(),
            success: notice.kind == NoticeKind::Success,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let mark = if self.success { "✓ " } else { "" };
        match &self.title {
            Some(title) => writeln!(writer, "{mark}{title}: {}", self.message)?,
            None => writeln!(writer, "{mark}{}", self.message)?,
        }
        Ok(())
    }
}

/// Truncate a string to a maximum number of characters.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Render a timestamp for tables.
pub(crate) fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render a timestamp the backend may have left out.
pub(crate) fn format_optional_time(at: Option<&DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), format_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn output_format_default_is_table() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt.format(), Format::Table);
        assert!(!fmt.is_json());
    }

    #[test]
    fn message_success() {
        let msg = Message::success("Logged in");
        let output = OutputFormat::new(Format::Table).to_string(&msg).unwrap();
        assert_eq!(output, "✓ Logged in\n");
    }

    #[test]
    fn message_info() {
        let msg = Message::info("Logged out");
        let output = OutputFormat::new(Format::Table).to_string(&msg).unwrap();
        assert_eq!(output, "Logged out\n");
    }

    #[test]
    fn message_from_notice() {
        let notice = Notice {
            id: 0,
            kind: NoticeKind::Success,
            title: "Service created".into(),
            description: "Service has been registered successfully.".into(),
        };
        let output = OutputFormat::new(Format::Table)
            .to_string(&Message::from(&notice))
            .unwrap();
        assert_eq!(
            output,
            "✓ Service created: Service has been registered successfully.\n"
        );
    }

    #[test]
    fn message_json_skips_false_success() {
        let output = OutputFormat::new(Format::Json)
            .to_string(&Message::info("hi"))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "hi");
        assert!(parsed.get("success").is_none());
        assert!(parsed.get("title").is_none());
    }

    #[test]
    fn write_record_is_single_line_json() {
        let mut buf = Vec::new();
        OutputFormat::new(Format::Json)
            .write_record(&mut buf, &Message::success("one"))
            .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_multibyte() {
        assert_eq!(truncate("ääääää", 5), "ää...");
    }

    #[test]
    fn format_time_is_second_precision() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        assert_eq!(format_time(&at), "2024-03-01 12:00:05");
    }

    #[test]
    fn format_optional_time_placeholder() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        assert_eq!(format_optional_time(Some(&at)), "2024-03-01 12:00:05");
        assert_eq!(format_optional_time(None), "-");
    }
}
