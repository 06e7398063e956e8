//! Firmware configuration
//!
//! `ctrlaer.toml` is compiled into the image and parsed here at boot with
//! a minimal line-based parser. build.rs has already checked it with a
//! full TOML parser, so this only needs the subset the file uses:
//!
//! - `[engine]`, `[run]` and `[link]` section headers
//! - `key = value` pairs (integer, boolean, quoted string)
//! - comments (`# ...`)

use ctrlaer_core::config::{DurationUnit, EngineConfig, RunConfig};
use ctrlaer_core::Encoding;

/// Default UART0 baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown section header
    InvalidSection,
    /// Line is not `key = value`
    InvalidLine,
    /// Unknown key in a known section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
}

/// Complete firmware configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareConfig {
    pub engine: EngineConfig,
    pub run: RunConfig,
    pub baud_rate: u32,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                base_pin: 2,
                ..EngineConfig::default()
            },
            run: RunConfig::default(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Engine,
    Run,
    Link,
}

/// Parse the configuration file
///
/// Keys that are not set keep their [`FirmwareConfig::default`] value.
pub fn parse_config(input: &str) -> Result<FirmwareConfig, ParseError> {
    let mut config = FirmwareConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(&mut config, section, key, value)?;
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "engine" => Ok(Section::Engine),
        "run" => Ok(Section::Run),
        "link" => Ok(Section::Link),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Remove a trailing comment, unless the `#` is inside a string
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) if line[..pos].matches('"').count() % 2 == 0 => &line[..pos],
        _ => line,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_encoding(value: &str) -> Result<Encoding, ParseError> {
    match parse_string(value) {
        "one_bit" => Ok(Encoding::OneBit),
        "two_bit" => Ok(Encoding::TwoBit),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_duration_unit(value: &str) -> Result<DurationUnit, ParseError> {
    match parse_string(value) {
        "ms" => Ok(DurationUnit::Milliseconds),
        "ticks" => Ok(DurationUnit::Ticks),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    config: &mut FirmwareConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ParseError> {
    match (section, key) {
        (Section::Engine, "state_machine") => config.engine.state_machine = parse_int(value)?,
        (Section::Engine, "base_pin") => config.engine.base_pin = parse_int(value)?,
        (Section::Engine, "pin_count") => config.engine.pin_count = parse_int(value)?,
        (Section::Engine, "frequency_hz") => config.engine.frequency_hz = parse_int(value)?,
        (Section::Run, "encoding") => config.run.encoding = parse_encoding(value)?,
        (Section::Run, "duration_unit") => config.run.duration_unit = parse_duration_unit(value)?,
        (Section::Run, "blocking") => config.run.blocking = parse_bool(value)?,
        (Section::Link, "baud_rate") => config.baud_rate = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config() {
        let config = parse_config(include_str!("../ctrlaer.toml")).unwrap();
        assert_eq!(config.engine.state_machine, 0);
        assert_eq!(config.engine.base_pin, 2);
        assert_eq!(config.engine.pin_count, 3);
        assert_eq!(config.engine.frequency_hz, 108_050);
        assert_eq!(config.run, RunConfig::default());
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = parse_config("[run]\nencoding = \"one_bit\" # comment\n").unwrap();
        assert_eq!(config.run.encoding, Encoding::OneBit);
        assert_eq!(config.engine, FirmwareConfig::default().engine);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_config("[motor]"), Err(ParseError::InvalidSection));
        assert_eq!(parse_config("[engine]\npins"), Err(ParseError::InvalidLine));
        assert_eq!(parse_config("[engine]\nspeed = 3"), Err(ParseError::UnknownKey));
        assert_eq!(parse_config("[engine]\nbase_pin = 300"), Err(ParseError::InvalidValue));
        assert_eq!(parse_config("[run]\nduration_unit = \"s\""), Err(ParseError::InvalidValue));
        // Keys outside any section are unknown
        assert_eq!(parse_config("blocking = true"), Err(ParseError::UnknownKey));
    }
}
