// src/protocol/frame.rs
//
// Frame types, header templates and the header classifier.
//
// The link has no delimiter the decoder can trust (the trailer also appears
// inside BATT_INFO text), so the buffer prefix is matched against three fixed
// header templates. CHART frames carry their total length at offsets 2..4.

use serde::{Deserialize, Serialize};

// =============================================================================
// Wire Constants
// =============================================================================

/// CR/LF ending every frame.
pub const TRAILER: [u8; 2] = [0x0D, 0x0A];

/// Bytes occupied by the trailer.
pub const TRAILER_LEN: usize = 2;

/// Bytes occupied by the FCS in CHART / CHART_DISPLAY frames.
pub const FCS_LEN: usize = 2;

/// First voltage sample in a CHART frame.
pub const SAMPLE_OFFSET: usize = 6;

/// First text byte in a BATT_INFO frame (after header and code page).
pub const TEXT_OFFSET: usize = 7;

/// Smallest value of the header length field that still fits a header,
/// the FCS and the trailer.
pub const MIN_LENGTH_FIELD: u16 = (SAMPLE_OFFSET + FCS_LEN + TRAILER_LEN) as u16;

// =============================================================================
// Types
// =============================================================================

/// Classification of a buffer snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    #[default]
    Unknown,
    BatteryInfo,
    Chart,
    ChartDisplay,
}

impl FrameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Unknown => "unknown",
            FrameType::BatteryInfo => "battery_info",
            FrameType::Chart => "chart",
            FrameType::ChartDisplay => "chart_display",
        }
    }
}

/// A header template: the bytes that must match at fixed offsets.
/// `None` entries are wildcards (the CHART length field).
struct HeaderTemplate {
    frame_type: FrameType,
    min_len: usize,
    header: &'static [Option<u8>],
}

impl HeaderTemplate {
    fn matches(&self, buffer: &[u8]) -> bool {
        buffer.len() >= self.min_len && self.matches_prefix(buffer)
    }

    /// True when every byte present in `buffer` agrees with the template,
    /// i.e. more bytes could still complete this header.
    fn matches_prefix(&self, buffer: &[u8]) -> bool {
        self.header
            .iter()
            .zip(buffer)
            .all(|(expected, &actual)| expected.map_or(true, |e| e == actual))
    }
}

// Checked in this order; the first match wins.
const TEMPLATES: [HeaderTemplate; 3] = [
    HeaderTemplate {
        frame_type: FrameType::BatteryInfo,
        min_len: 9,
        header: &[Some(0x00), Some(0x24), Some(0x24), Some(0xFF), Some(0xFE)],
    },
    HeaderTemplate {
        frame_type: FrameType::Chart,
        min_len: 10,
        header: &[Some(0x24), Some(0x24), None, None, Some(0xFF), Some(0x01)],
    },
    HeaderTemplate {
        frame_type: FrameType::ChartDisplay,
        min_len: 10,
        header: &[Some(0x24), Some(0x24), Some(0x0A), Some(0x00), Some(0xFF), Some(0x02)],
    },
];

/// Length of the shortest buffer any template can match.
pub const SHORTEST_TEMPLATE_LEN: usize = 9;

// =============================================================================
// Classification
// =============================================================================

/// Classify a buffer by its header.
///
/// Pure and total: a buffer shorter than a template's minimum length cannot
/// match that template, so short buffers are `Unknown` until more bytes
/// arrive.
pub fn classify(buffer: &[u8]) -> FrameType {
    TEMPLATES
        .iter()
        .find(|t| t.matches(buffer))
        .map(|t| t.frame_type)
        .unwrap_or(FrameType::Unknown)
}

/// Whether `buffer` could still grow into a frame of some known type.
/// An empty buffer is trivially a prefix.
pub fn is_viable_prefix(buffer: &[u8]) -> bool {
    TEMPLATES.iter().any(|t| t.matches_prefix(buffer))
}

// =============================================================================
// Length Field
// =============================================================================

/// Raw little-endian length field at offsets 2..4 (total frame length,
/// trailer included).
pub fn length_field(buffer: &[u8]) -> Option<u16> {
    match buffer.get(2..4) {
        Some(&[lo, hi]) => Some(u16::from_le_bytes([lo, hi])),
        _ => None,
    }
}

/// Declared frame length: the length field minus the trailer. Indexes the
/// end of the FCS; the trailer physically follows it.
pub fn declared_length(buffer: &[u8]) -> Option<usize> {
    length_field(buffer).map(|len| (len as usize).saturating_sub(TRAILER_LEN))
}

/// Bytes the BATT_INFO frame at the front of `buffer` occupies.
///
/// The text has CR/LF line breaks of its own, so a CR/LF only ends the frame
/// when nothing follows it or what follows could be another header. Without
/// such a trailer the whole buffer is returned.
pub fn battery_info_span(buffer: &[u8]) -> usize {
    let mut pos = TEXT_OFFSET;
    while let Some(offset) = buffer
        .get(pos..)
        .and_then(|rest| rest.windows(TRAILER_LEN).position(|w| w == TRAILER))
    {
        let end = pos + offset + TRAILER_LEN;
        if end == buffer.len() || is_viable_prefix(&buffer[end..]) {
            return end;
        }
        pos = end;
    }
    buffer.len()
}

/// Code page field at offsets 5..7 of a BATT_INFO frame.
pub fn text_encoding(buffer: &[u8]) -> Option<u16> {
    match buffer.get(5..7) {
        Some(&[lo, hi]) => Some(u16::from_le_bytes([lo, hi])),
        _ => None,
    }
}
