// src/protocol/report.rs
//
// BATT_INFO text decoding and the structured battery report it carries.

use serde::Serialize;
use std::fmt;

use super::frame::{TEXT_OFFSET, TRAILER};
use super::validate::Validated;

/// The tester sends 0x7F where it means the ohm sign.
pub const OHM_PLACEHOLDER: u8 = 0x7F;
pub const OHM_SIGN: char = '\u{03A9}';

const LINE_SEPARATOR: &str = "\r\n";
const REPORT_LINES: usize = 7;

/// Decode the text payload of a BATT_INFO frame.
///
/// Text starts after the header and code page; the final CR/LF is dropped.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_battery_text(frame: &Validated<'_>) -> String {
    let bytes = frame.bytes();
    let payload = bytes.get(TEXT_OFFSET..).unwrap_or_default();
    let payload = payload.strip_suffix(&TRAILER[..]).unwrap_or(payload);
    decode_text_payload(payload)
}

/// Lossy UTF-8 decode with the ohm placeholder substituted.
pub fn decode_text_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).replace(OHM_PLACEHOLDER as char, &OHM_SIGN.to_string())
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Fewer lines than a complete report.
    MissingLines { found: usize },
    /// A line lacks the `label=value` form.
    MalformedLine { line: usize },
    /// SOH or SOC is not `<n>%`.
    BadPercentage { line: usize, value: String },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportError::MissingLines { found } => {
                write!(f, "expected {} report lines, found {}", REPORT_LINES, found)
            }
            ReportError::MalformedLine { line } => write!(f, "line {} is not label=value", line),
            ReportError::BadPercentage { line, value } => {
                write!(f, "line {}: '{}' is not a percentage", line, value)
            }
        }
    }
}

impl std::error::Error for ReportError {}

/// Battery state as reported after a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryReport {
    pub state_of_health: u8,
    pub state_of_charge: u8,
    /// Norm name and its value, e.g. `EN-600A`.
    pub test_norm: String,
    pub test_result: String,
    /// Internal resistance with the ohm sign, e.g. `4.52mΩ`.
    pub internal_resistance: String,
    pub voltage: String,
    pub condition: String,
}

impl BatteryReport {
    /// Parse decoded BATT_INFO text.
    ///
    /// Lines: `SOH=n%`, `SOC=n%`, `<norm>=<result>`, `<label>=<norm value>`,
    /// `<label>=<resistance>Ω`, `<label>=<voltage>`, `<condition>`.
    pub fn parse(text: &str) -> Result<Self, ReportError> {
        let lines: Vec<&str> = text
            .split(LINE_SEPARATOR)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() < REPORT_LINES {
            return Err(ReportError::MissingLines { found: lines.len() });
        }

        let state_of_health = parse_percentage(lines[0], 0)?;
        let state_of_charge = parse_percentage(lines[1], 1)?;
        let (norm, test_result) = split_pair(lines[2], 2)?;
        let (_, norm_value) = split_pair(lines[3], 3)?;
        let (_, resistance) = split_pair(lines[4], 4)?;
        let (_, voltage) = split_pair(lines[5], 5)?;

        // Text decoded without substitution still has the placeholder
        let resistance = resistance.trim_end_matches([OHM_SIGN, OHM_PLACEHOLDER as char]);

        Ok(BatteryReport {
            state_of_health,
            state_of_charge,
            test_norm: format!("{}-{}", norm, norm_value),
            test_result: test_result.to_string(),
            internal_resistance: format!("{}{}", resistance, OHM_SIGN),
            voltage: voltage.to_string(),
            condition: lines[6].to_string(),
        })
    }
}

fn split_pair(line: &str, index: usize) -> Result<(&str, &str), ReportError> {
    line.split_once('=')
        .map(|(label, value)| (label.trim(), value.trim()))
        .ok_or(ReportError::MalformedLine { line: index })
}

fn parse_percentage(line: &str, index: usize) -> Result<u8, ReportError> {
    let (_, value) = split_pair(line, index)?;
    value
        .strip_suffix('%')
        .and_then(|n| n.trim().parse::<u8>().ok())
        .ok_or_else(|| ReportError::BadPercentage {
            line: index,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::validate::validate;

    const REPORT_TEXT: &str =
        "SOH=87%\r\nSOC=64%\r\nEN=GOOD\r\nCCA=600A\r\nR=4.52m\u{7F}\r\nU=12.61V\r\nGOOD BATTERY";

    fn battery_frame(text: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x00, 0x24, 0x24, 0xFF, 0xFE, 0xE9, 0xFD];
        frame.extend_from_slice(text);
        frame.extend_from_slice(&TRAILER);
        frame
    }

    // ========================================================================
    // Text Decoding Tests
    // ========================================================================

    #[test]
    fn test_decode_battery_text_substitutes_ohm() {
        let frame = battery_frame(b"R=4.52m\x7F");
        let text = decode_battery_text(&validate(&frame).unwrap());
        assert_eq!(text, "R=4.52m\u{03A9}");
    }

    #[test]
    fn test_decode_battery_text_keeps_inner_line_breaks() {
        let frame = battery_frame(b"SOH=87%\r\nSOC=64%");
        let text = decode_battery_text(&validate(&frame).unwrap());
        assert_eq!(text, "SOH=87%\r\nSOC=64%");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        assert_eq!(decode_text_payload(&[b'O', b'K', 0xFF]), "OK\u{FFFD}");
    }

    #[test]
    fn test_decode_empty_payload() {
        let frame = battery_frame(b"");
        assert_eq!(decode_battery_text(&validate(&frame).unwrap()), "");
    }

    // ========================================================================
    // Report Tests
    // ========================================================================

    #[test]
    fn test_parse_report() {
        let text = decode_text_payload(REPORT_TEXT.as_bytes());
        let report = BatteryReport::parse(&text).expect("parse report");
        assert_eq!(report.state_of_health, 87);
        assert_eq!(report.state_of_charge, 64);
        assert_eq!(report.test_norm, "EN-600A");
        assert_eq!(report.test_result, "GOOD");
        assert_eq!(report.internal_resistance, "4.52m\u{03A9}");
        assert_eq!(report.voltage, "12.61V");
        assert_eq!(report.condition, "GOOD BATTERY");
    }

    #[test]
    fn test_parse_report_with_placeholder() {
        let report = BatteryReport::parse(REPORT_TEXT).unwrap();
        assert_eq!(report.internal_resistance, "4.52m\u{03A9}");
    }

    #[test]
    fn test_parse_report_missing_lines() {
        assert_eq!(
            BatteryReport::parse("SOH=87%\r\nSOC=64%"),
            Err(ReportError::MissingLines { found: 2 })
        );
    }

    #[test]
    fn test_parse_report_bad_percentage() {
        let text = REPORT_TEXT.replace("SOC=64%", "SOC=high");
        assert_eq!(
            BatteryReport::parse(&text),
            Err(ReportError::BadPercentage {
                line: 1,
                value: "high".to_string()
            })
        );
    }

    #[test]
    fn test_parse_report_malformed_line() {
        let text = REPORT_TEXT.replace("EN=GOOD", "EN GOOD");
        assert_eq!(
            BatteryReport::parse(&text),
            Err(ReportError::MalformedLine { line: 2 })
        );
    }
}
