// src/protocol/samples.rs
//
// Voltage samples from CHART frames and the time axis of a finished series.
// Samples are unsigned 16-bit little-endian decivolts.

use serde::{Deserialize, Serialize};

use super::frame::{FrameType, SAMPLE_OFFSET};
use super::validate::{FrameFault, Validated};

pub const CHART_TITLE: &str = "Battery voltage during cranking";
pub const CHART_X_LABEL: &str = "Time [s]";
pub const CHART_Y_LABEL: &str = "Voltage [V]";

/// Total capture window assumed by the window time axis.
pub const CAPTURE_WINDOW_S: f64 = 10.0;

/// Sample period used by the fixed-step time axis.
pub const FIXED_STEP_S: f64 = 0.0125;

/// How the time axis of a completed series is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxisMode {
    /// Spread the samples evenly over the 10 s capture window.
    #[default]
    Window,
    /// One sample every 12.5 ms.
    FixedStep,
}

// ============================================================================
// Sample Decoding
// ============================================================================

/// Decode the raw decivolt samples of a CHART frame.
///
/// Samples start at offset 6 and stop before the FCS (declared length - 2).
/// Other frame types carry no samples.
pub fn decode_chart_samples(frame: &Validated<'_>) -> Vec<u16> {
    if frame.frame_type() != FrameType::Chart {
        return Vec::new();
    }
    let bytes = frame.bytes();
    let end = frame.frame().declared_length().saturating_sub(2);
    (SAMPLE_OFFSET..end)
        .step_by(2)
        .map(|i| u16::from_le_bytes([bytes[i], bytes[i + 1]]))
        .collect()
}

/// Convert decivolts to volts.
pub fn to_volts(decivolts: u16) -> f64 {
    decivolts as f64 / 10.0
}

// ============================================================================
// Sample Series
// ============================================================================

/// Samples accumulated across CHART frames until CHART_DISPLAY.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSeries {
    decivolts: Vec<u16>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the samples of one CHART frame, returning how many were added.
    pub fn extend_from_frame(&mut self, frame: &Validated<'_>) -> usize {
        let samples = decode_chart_samples(frame);
        let added = samples.len();
        self.decivolts.extend(samples);
        added
    }

    pub fn len(&self) -> usize {
        self.decivolts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decivolts.is_empty()
    }

    pub fn clear(&mut self) {
        self.decivolts.clear();
    }

    pub fn decivolts(&self) -> &[u16] {
        &self.decivolts
    }

    pub fn volts(&self) -> Vec<f64> {
        self.decivolts.iter().map(|&d| to_volts(d)).collect()
    }

    /// Build the chart for the finished series.
    pub fn to_chart(&self, mode: TimeAxisMode) -> Result<ChartSeries, FrameFault> {
        let time_s = match mode {
            TimeAxisMode::Window => build_time_axis(self.len())?,
            TimeAxisMode::FixedStep => build_fixed_step_axis(self.len())?,
        };
        Ok(ChartSeries {
            title: CHART_TITLE.to_string(),
            x_label: CHART_X_LABEL.to_string(),
            y_label: CHART_Y_LABEL.to_string(),
            time_s,
            voltage_v: self.volts(),
        })
    }
}

// ============================================================================
// Time Axis
// ============================================================================

/// Times for `sample_count` samples spread over the capture window:
/// `x * 10 / (sample_count - 1)`.
///
/// Fewer than two samples cannot span the window.
pub fn build_time_axis(sample_count: usize) -> Result<Vec<f64>, FrameFault> {
    if sample_count < 2 {
        return Err(FrameFault::DegenerateSeries);
    }
    let last = (sample_count - 1) as f64;
    Ok((0..sample_count)
        .map(|x| x as f64 * CAPTURE_WINDOW_S / last)
        .collect())
}

/// Times at a fixed 12.5 ms sample period.
pub fn build_fixed_step_axis(sample_count: usize) -> Result<Vec<f64>, FrameFault> {
    if sample_count == 0 {
        return Err(FrameFault::DegenerateSeries);
    }
    Ok((0..sample_count).map(|x| x as f64 * FIXED_STEP_S).collect())
}

// ============================================================================
// Chart Series
// ============================================================================

/// Completed voltage chart handed to the visualisation sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub time_s: Vec<f64>,
    pub voltage_v: Vec<f64>,
}

/// Display ranges for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRanges {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.voltage_v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage_v.is_empty()
    }

    /// X spans the time values; Y is widened to whole volts.
    pub fn axis_ranges(&self) -> Option<AxisRanges> {
        let (x_min, x_max) = min_max(&self.time_s)?;
        let (y_min, y_max) = min_max(&self.voltage_v)?;
        Some(AxisRanges {
            x_min,
            x_max,
            y_min: y_min.floor(),
            y_max: y_max.ceil(),
        })
    }

    /// Lowest voltage and the time it occurred, the figure of merit of a
    /// cranking test.
    pub fn minimum(&self) -> Option<(f64, f64)> {
        self.time_s
            .iter()
            .zip(&self.voltage_v)
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&t, &v)| (t, v))
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::validate::{frame_view, validate};

    // 12.5 V, 12.0 V, 11.0 V
    const CHART_FRAME: [u8; 16] = [
        0x24, 0x24, 0x10, 0x00, 0xFF, 0x01, 0x7D, 0x00, 0x78, 0x00, 0x6E, 0x00, 0x6F, 0xFD, 0x0D,
        0x0A,
    ];

    // 10.0 V, 13.0 V
    const CHART_FRAME_2: [u8; 14] = [
        0x24, 0x24, 0x0E, 0x00, 0xFF, 0x01, 0x64, 0x00, 0x82, 0x00, 0x9A, 0x25, 0x0D, 0x0A,
    ];

    const CHART_DISPLAY_FRAME: [u8; 10] = [0x24, 0x24, 0x0A, 0x00, 0xFF, 0x02, 0xBE, 0x2F, 0x0D, 0x0A];

    // ========================================================================
    // Decoding Tests
    // ========================================================================

    #[test]
    fn test_decode_chart_samples() {
        let frame = validate(&CHART_FRAME).unwrap();
        assert_eq!(decode_chart_samples(&frame), vec![125, 120, 110]);
    }

    #[test]
    fn test_decode_chart_display_has_no_samples() {
        let frame = validate(&CHART_DISPLAY_FRAME).unwrap();
        assert!(decode_chart_samples(&frame).is_empty());
    }

    #[test]
    fn test_decode_permissive_frame() {
        let mut corrupted = CHART_FRAME;
        corrupted[12] = 0x00;
        let frame = Validated::permissive(frame_view(&corrupted).unwrap());
        assert_eq!(decode_chart_samples(&frame), vec![125, 120, 110]);
    }

    #[test]
    fn test_series_accumulates_in_order() {
        let mut series = SampleSeries::new();
        assert_eq!(series.extend_from_frame(&validate(&CHART_FRAME).unwrap()), 3);
        assert_eq!(series.extend_from_frame(&validate(&CHART_FRAME_2).unwrap()), 2);
        assert_eq!(series.decivolts(), &[125, 120, 110, 100, 130]);
        assert_eq!(series.volts(), vec![12.5, 12.0, 11.0, 10.0, 13.0]);

        series.clear();
        assert!(series.is_empty());
    }

    // ========================================================================
    // Time Axis Tests
    // ========================================================================

    #[test]
    fn test_time_axis_five_samples() {
        assert_eq!(build_time_axis(5).unwrap(), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn test_time_axis_two_samples() {
        assert_eq!(build_time_axis(2).unwrap(), vec![0.0, 10.0]);
    }

    #[test]
    fn test_time_axis_degenerate() {
        assert_eq!(build_time_axis(0), Err(FrameFault::DegenerateSeries));
        assert_eq!(build_time_axis(1), Err(FrameFault::DegenerateSeries));
    }

    #[test]
    fn test_fixed_step_axis() {
        assert_eq!(build_fixed_step_axis(3).unwrap(), vec![0.0, 0.0125, 0.025]);
        assert_eq!(build_fixed_step_axis(1).unwrap(), vec![0.0]);
        assert_eq!(build_fixed_step_axis(0), Err(FrameFault::DegenerateSeries));
    }

    // ========================================================================
    // Chart Tests
    // ========================================================================

    #[test]
    fn test_to_chart() {
        let mut series = SampleSeries::new();
        series.extend_from_frame(&validate(&CHART_FRAME).unwrap());
        series.extend_from_frame(&validate(&CHART_FRAME_2).unwrap());

        let chart = series.to_chart(TimeAxisMode::Window).unwrap();
        assert_eq!(chart.title, "Battery voltage during cranking");
        assert_eq!(chart.x_label, "Time [s]");
        assert_eq!(chart.y_label, "Voltage [V]");
        assert_eq!(chart.time_s.len(), chart.voltage_v.len());
        assert_eq!(chart.time_s, vec![0.0, 2.5, 5.0, 7.5, 10.0]);

        let ranges = chart.axis_ranges().unwrap();
        assert_eq!(ranges.x_min, 0.0);
        assert_eq!(ranges.x_max, 10.0);
        assert_eq!(ranges.y_min, 10.0);
        assert_eq!(ranges.y_max, 13.0);

        assert_eq!(chart.minimum(), Some((7.5, 10.0)));
    }

    #[test]
    fn test_to_chart_single_sample() {
        let mut series = SampleSeries::new();
        let frame = [
            0x24, 0x24, 0x0C, 0x00, 0xFF, 0x01, 0x7D, 0x00, 0x00, 0x00, 0x0D, 0x0A,
        ];
        series.extend_from_frame(&Validated::permissive(frame_view(&frame).unwrap()));
        assert_eq!(series.len(), 1);
        assert_eq!(series.to_chart(TimeAxisMode::Window), Err(FrameFault::DegenerateSeries));
        assert_eq!(series.to_chart(TimeAxisMode::FixedStep).unwrap().len(), 1);
    }
}
