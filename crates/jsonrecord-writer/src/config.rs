//! # Writer Configuration
//!
//! [`WriterConfig`] is plain data that can be built in code or deserialized
//! from JSON. It is validated eagerly: [`TemporalFormats::compile`] runs when a
//! writer is built, so an invalid pattern never reaches a write session.
//!
//! Temporal patterns use the `time` crate's format description syntax:
//!
//! | Kind | Default pattern | Example output |
//! |------|-----------------|----------------|
//! | DATE | `[year]-[month]-[day]` | `2017-01-01` |
//! | TIME | `[hour]:[minute]:[second]` | `17:00:00` |
//! | TIMESTAMP | `[year]-[month]-[day] [hour]:[minute]:[second]` | `2017-01-01 17:00:00` |
//!
//! A kind with no pattern is written as its raw epoch-millisecond integer.

use serde::{Deserialize, Serialize};
use time::format_description::{self, OwnedFormatItem};
use time::{OffsetDateTime, UtcOffset};

use crate::error::ConfigurationError;

pub const DEFAULT_DATE_FORMAT: &str = "[year]-[month]-[day]";
pub const DEFAULT_TIME_FORMAT: &str = "[hour]:[minute]:[second]";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";
pub const JSON_MIME_TYPE: &str = "application/json";

/// How records are grouped in the output document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputGrouping {
    /// `[` record `,` record `]`
    #[default]
    Array,
    /// One compact object per line, no enclosing brackets.
    OneLinePerObject,
    /// A single unwrapped object; writing a second record is rejected.
    SingleRecord,
}

/// Which record fields are left out of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullSuppression {
    #[default]
    Never,
    /// Omit fields that are null or absent.
    Always,
    /// Omit only fields absent from the record's value map.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub pretty_print: bool,
    pub date_format: Option<String>,
    pub time_format: Option<String>,
    pub timestamp_format: Option<String>,
    pub mime_type: String,
    pub output_grouping: OutputGrouping,
    pub null_suppression: NullSuppression,
    pub include_unknown_fields: bool,
    /// Offset applied before formatting temporal values; 0 is UTC.
    pub utc_offset_seconds: i32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            pretty_print: false,
            date_format: None,
            time_format: None,
            timestamp_format: None,
            mime_type: String::from(JSON_MIME_TYPE),
            output_grouping: OutputGrouping::Array,
            null_suppression: NullSuppression::Never,
            include_unknown_fields: false,
            utc_offset_seconds: 0,
        }
    }
}

impl WriterConfig {
    /// Configuration with the default pattern for every temporal kind.
    pub fn with_default_formats() -> Self {
        Self {
            date_format: Some(String::from(DEFAULT_DATE_FORMAT)),
            time_format: Some(String::from(DEFAULT_TIME_FORMAT)),
            timestamp_format: Some(String::from(DEFAULT_TIMESTAMP_FORMAT)),
            ..Self::default()
        }
    }

    pub fn pretty(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    pub fn grouping(mut self, output_grouping: OutputGrouping) -> Self {
        self.output_grouping = output_grouping;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.mime_type.trim().is_empty() {
            return Err(ConfigurationError::EmptyMimeType);
        }
        TemporalFormats::compile(self).map(|_| ())
    }
}

/// Temporal patterns compiled once per writer.
#[derive(Debug, Clone)]
pub struct TemporalFormats {
    date: Option<OwnedFormatItem>,
    time: Option<OwnedFormatItem>,
    timestamp: Option<OwnedFormatItem>,
    offset: UtcOffset,
}

/// Temporal kind a pattern applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
}

impl TemporalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
        }
    }
}

impl TemporalFormats {
    pub fn compile(config: &WriterConfig) -> Result<Self, ConfigurationError> {
        let offset = UtcOffset::from_whole_seconds(config.utc_offset_seconds).map_err(|_| {
            ConfigurationError::InvalidOffset {
                seconds: config.utc_offset_seconds,
            }
        })?;

        Ok(Self {
            date: compile_pattern(TemporalKind::Date, config.date_format.as_deref())?,
            time: compile_pattern(TemporalKind::Time, config.time_format.as_deref())?,
            timestamp: compile_pattern(
                TemporalKind::Timestamp,
                config.timestamp_format.as_deref(),
            )?,
            offset,
        })
    }

    pub fn pattern(&self, kind: TemporalKind) -> Option<&OwnedFormatItem> {
        match kind {
            TemporalKind::Date => self.date.as_ref(),
            TemporalKind::Time => self.time.as_ref(),
            TemporalKind::Timestamp => self.timestamp.as_ref(),
        }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Formats `millis` with the pattern for `kind`.
    ///
    /// Returns `Ok(None)` when no pattern is configured for that kind.
    pub fn format(&self, kind: TemporalKind, millis: i64) -> Result<Option<String>, String> {
        let Some(pattern) = self.pattern(kind) else {
            return Ok(None);
        };

        let nanos = i128::from(millis) * 1_000_000
            + i128::from(self.offset.whole_seconds()) * 1_000_000_000;
        let local = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|error| error.to_string())?
            .replace_offset(self.offset);
        local
            .format(pattern)
            .map(Some)
            .map_err(|error| error.to_string())
    }
}

fn compile_pattern(
    kind: TemporalKind,
    pattern: Option<&str>,
) -> Result<Option<OwnedFormatItem>, ConfigurationError> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };

    let item = format_description::parse_owned::<1>(pattern).map_err(|error| {
        ConfigurationError::InvalidPattern {
            kind: kind.as_str(),
            pattern: pattern.to_owned(),
            message: error.to_string(),
        }
    })?;

    OffsetDateTime::UNIX_EPOCH.format(&item).map_err(|error| {
        ConfigurationError::UnformattablePattern {
            kind: kind.as_str(),
            pattern: pattern.to_owned(),
            message: error.to_string(),
        }
    })?;

    Ok(Some(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YEAR_17H: i64 = 1_483_290_000_000;

    #[test]
    fn default_config_writes_epoch_millis() {
        let formats = TemporalFormats::compile(&WriterConfig::default()).expect("compile");
        for kind in [TemporalKind::Date, TemporalKind::Time, TemporalKind::Timestamp] {
            assert_eq!(formats.format(kind, 37_293_723), Ok(None));
        }
    }

    #[test]
    fn default_patterns_format_in_utc() {
        let formats =
            TemporalFormats::compile(&WriterConfig::with_default_formats()).expect("compile");
        assert_eq!(
            formats.format(TemporalKind::Date, NEW_YEAR_17H),
            Ok(Some(String::from("2017-01-01")))
        );
        assert_eq!(
            formats.format(TemporalKind::Time, NEW_YEAR_17H),
            Ok(Some(String::from("17:00:00")))
        );
        assert_eq!(
            formats.format(TemporalKind::Timestamp, NEW_YEAR_17H),
            Ok(Some(String::from("2017-01-01 17:00:00")))
        );
    }

    #[test]
    fn offset_shifts_wall_clock() {
        let config = WriterConfig {
            time_format: Some(String::from("[hour]:[minute] [offset_hour sign:mandatory]")),
            utc_offset_seconds: -5 * 3600,
            ..WriterConfig::default()
        };
        let formats = TemporalFormats::compile(&config).expect("compile");
        assert_eq!(
            formats.format(TemporalKind::Time, NEW_YEAR_17H),
            Ok(Some(String::from("12:00 -05")))
        );
    }

    #[test]
    fn invalid_pattern_fails_at_compile_time() {
        let config = WriterConfig {
            date_format: Some(String::from("[year]-[mnth]")),
            ..WriterConfig::default()
        };
        let err = TemporalFormats::compile(&config).expect_err("must fail");
        assert!(matches!(
            err,
            ConfigurationError::InvalidPattern { kind: "date", .. }
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_offset_is_rejected() {
        let config = WriterConfig {
            utc_offset_seconds: 30 * 3600,
            ..WriterConfig::default()
        };
        assert_eq!(
            TemporalFormats::compile(&config).expect_err("out of range"),
            ConfigurationError::InvalidOffset { seconds: 30 * 3600 }
        );
    }

    #[test]
    fn empty_mime_type_is_rejected() {
        let config = WriterConfig {
            mime_type: String::from("  "),
            ..WriterConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigurationError::EmptyMimeType));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: WriterConfig = serde_json::from_str(
            r#"{"pretty_print":true,"output_grouping":"one_line_per_object","date_format":"[year]"}"#,
        )
        .expect("deserialize");
        assert!(config.pretty_print);
        assert_eq!(config.output_grouping, OutputGrouping::OneLinePerObject);
        assert_eq!(config.mime_type, JSON_MIME_TYPE);
        assert_eq!(config.null_suppression, NullSuppression::Never);
    }
}
