// src/protocol/validate.rs
//
// Frame validation: trailer and FCS checks gated by frame type.
//
// Decoding only accepts a `Validated` frame. The only way to obtain one
// without passing the checks is `Validated::permissive`, which the assembler
// calls when permissive mode is configured.

use serde::Serialize;
use std::fmt;

use super::frame::{
    battery_info_span, classify, length_field, FrameType, MIN_LENGTH_FIELD, TRAILER, TRAILER_LEN,
};
use crate::checksums::fcs16_is_valid;

// ============================================================================
// Faults
// ============================================================================

/// Why a buffer did not yield a usable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFault {
    /// Not enough bytes yet; wait for more.
    InsufficientData,
    /// No header template matches.
    UnknownFrame,
    /// Frame span does not end in CR/LF.
    TrailerMismatch,
    /// FCS residual or embedded checksum wrong.
    ChecksumMismatch,
    /// Length field too small to hold header, FCS and trailer.
    BadLength,
    /// Completed series too short to build a time axis.
    DegenerateSeries,
}

impl fmt::Display for FrameFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameFault::InsufficientData => write!(f, "insufficient data"),
            FrameFault::UnknownFrame => write!(f, "unknown frame header"),
            FrameFault::TrailerMismatch => write!(f, "trailer mismatch"),
            FrameFault::ChecksumMismatch => write!(f, "checksum mismatch"),
            FrameFault::BadLength => write!(f, "bad length field"),
            FrameFault::DegenerateSeries => write!(f, "degenerate sample series"),
        }
    }
}

impl std::error::Error for FrameFault {}

// ============================================================================
// Frame Views
// ============================================================================

/// Read-only view over the frame at the front of the receive buffer.
///
/// For BATT_INFO the frame runs to the trailer that ends its text (the
/// format has no length field). For CHART / CHART_DISPLAY it is the span
/// given by the length field. Bytes of a following frame are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    frame_type: FrameType,
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Bytes the frame occupies in the buffer, trailer included.
    pub fn span(&self) -> usize {
        self.bytes.len()
    }

    /// Span minus the trailer: the end of the FCS for checksummed frames.
    pub fn declared_length(&self) -> usize {
        self.bytes.len().saturating_sub(TRAILER_LEN)
    }

    pub fn has_trailer(&self) -> bool {
        self.bytes.ends_with(&TRAILER)
    }
}

/// A frame that passed validation (or was explicitly let through).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated<'a>(Frame<'a>);

impl<'a> Validated<'a> {
    /// Accept a frame without checking trailer or FCS.
    pub fn permissive(frame: Frame<'a>) -> Self {
        Validated(frame)
    }

    pub fn frame(&self) -> &Frame<'a> {
        &self.0
    }

    pub fn frame_type(&self) -> FrameType {
        self.0.frame_type
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.0.bytes
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Locate the frame at the front of `buffer` without checking its integrity.
///
/// Fails with `UnknownFrame` when no header matches, `InsufficientData` when
/// the frame is not fully buffered yet, and `BadLength` when a length field
/// cannot describe a real frame.
pub fn frame_view(buffer: &[u8]) -> Result<Frame<'_>, FrameFault> {
    let frame_type = classify(buffer);
    match frame_type {
        FrameType::Unknown => Err(FrameFault::UnknownFrame),
        FrameType::BatteryInfo => Ok(Frame {
            frame_type,
            bytes: &buffer[..battery_info_span(buffer)],
        }),
        FrameType::Chart | FrameType::ChartDisplay => {
            let field = length_field(buffer).ok_or(FrameFault::InsufficientData)?;
            if field < MIN_LENGTH_FIELD {
                return Err(FrameFault::BadLength);
            }
            let span = field as usize;
            if buffer.len() < span {
                return Err(FrameFault::InsufficientData);
            }
            Ok(Frame {
                frame_type,
                bytes: &buffer[..span],
            })
        }
    }
}

/// Check trailer and, for checksummed frames, the FCS over the declared
/// length.
pub fn check_integrity(frame: &Frame<'_>) -> Result<(), FrameFault> {
    match frame.frame_type {
        FrameType::Unknown => Err(FrameFault::UnknownFrame),
        FrameType::BatteryInfo => {
            if frame.has_trailer() {
                Ok(())
            } else {
                // BATT_INFO has no length: a missing trailer means more text is coming
                Err(FrameFault::InsufficientData)
            }
        }
        FrameType::Chart | FrameType::ChartDisplay => {
            if !frame.has_trailer() {
                return Err(FrameFault::TrailerMismatch);
            }
            if !fcs16_is_valid(&frame.bytes[..frame.declared_length()]) {
                return Err(FrameFault::ChecksumMismatch);
            }
            Ok(())
        }
    }
}

/// Locate and validate the frame at the front of `buffer`.
pub fn validate(buffer: &[u8]) -> Result<Validated<'_>, FrameFault> {
    let frame = frame_view(buffer)?;
    check_integrity(&frame)?;
    Ok(Validated(frame))
}

/// Whether the buffer holds a correct frame of the given type at its front.
pub fn is_correct(buffer: &[u8], frame_type: FrameType) -> bool {
    matches!(validate(buffer), Ok(v) if v.frame_type() == frame_type)
}
