// src/sink.rs
//
// Consumers of decoded output. The assembler produces `DecodeEvent`s;
// `dispatch` logs them and hands status text and finished charts to a sink.

use serde_json::json;
use std::io::Write;

use crate::protocol::{BatteryReport, ChartSeries, DecodeEvent};

/// Receiver of decoded tester output.
pub trait DecodeSink {
    /// Status text of a BATT_INFO frame.
    fn battery_info(&mut self, text: &str, report: Option<&BatteryReport>) -> Result<(), String>;

    /// A completed voltage chart.
    fn chart(&mut self, chart: &ChartSeries) -> Result<(), String>;

    /// A rejected frame or discarded bytes. Ignored unless the sink records them.
    fn dropped(&mut self, _event: &DecodeEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Log one event and forward it to the sink when it carries output.
pub fn dispatch<S: DecodeSink + ?Sized>(sink: &mut S, event: &DecodeEvent) -> Result<(), String> {
    match event {
        DecodeEvent::BatteryInfo { text, report } => {
            tlog!(
                "[decoder] Battery info received ({} chars{})",
                text.chars().count(),
                if report.is_some() { ", report parsed" } else { "" }
            );
            sink.battery_info(text, report.as_ref())
        }
        DecodeEvent::ChartFrame { samples, total } => {
            vlog!("[decoder] Chart frame: {} samples ({} total)", samples, total);
            Ok(())
        }
        DecodeEvent::Chart(chart) => {
            tlog!("[decoder] Chart complete: {} samples", chart.len());
            sink.chart(chart)
        }
        DecodeEvent::Rejected {
            frame_type,
            fault,
            frame_hex,
        } => {
            tlog!("[decoder] Rejected {} frame: {}", frame_type.as_str(), fault);
            vlog!("[decoder] Rejected bytes: {}", frame_hex);
            sink.dropped(event)
        }
        DecodeEvent::Discarded { bytes } => {
            tlog!("[decoder] Discarded {} unrecognised bytes", bytes);
            sink.dropped(event)
        }
    }
}

// ============================================================================
// Console Output
// ============================================================================

/// Human-readable output: status text as sent, charts as a time/voltage table.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DecodeSink for ConsoleSink<W> {
    fn battery_info(&mut self, text: &str, _report: Option<&BatteryReport>) -> Result<(), String> {
        writeln!(self.out, "{}", text.replace("\r\n", "\n"))
            .map_err(|e| format!("Failed to write output: {}", e))
    }

    fn chart(&mut self, chart: &ChartSeries) -> Result<(), String> {
        let write = |out: &mut W| -> std::io::Result<()> {
            writeln!(out, "{}", chart.title)?;
            writeln!(out, "{:>10}  {:>11}", chart.x_label, chart.y_label)?;
            for (t, v) in chart.time_s.iter().zip(&chart.voltage_v) {
                writeln!(out, "{:>10.4}  {:>11.1}", t, v)?;
            }
            if let Some((t, v)) = chart.minimum() {
                writeln!(out, "Minimum: {:.1} V at {:.3} s", v, t)?;
            }
            Ok(())
        };
        write(&mut self.out).map_err(|e| format!("Failed to write output: {}", e))
    }
}

// ============================================================================
// JSON Lines Output
// ============================================================================

/// One JSON object per line, for piping into other tools.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, value: &serde_json::Value) -> Result<(), String> {
        serde_json::to_writer(&mut self.out, value)
            .map_err(|e| format!("Failed to serialize output: {}", e))?;
        writeln!(self.out).map_err(|e| format!("Failed to write output: {}", e))
    }
}

impl<W: Write> DecodeSink for JsonSink<W> {
    fn battery_info(&mut self, text: &str, report: Option<&BatteryReport>) -> Result<(), String> {
        self.write_line(&json!({
            "event": "battery_info",
            "text": text,
            "report": report,
        }))
    }

    fn chart(&mut self, chart: &ChartSeries) -> Result<(), String> {
        self.write_line(&json!({
            "event": "chart",
            "title": chart.title,
            "x_label": chart.x_label,
            "y_label": chart.y_label,
            "time_s": chart.time_s,
            "voltage_v": chart.voltage_v,
            "ranges": chart.axis_ranges(),
        }))
    }

    fn dropped(&mut self, event: &DecodeEvent) -> Result<(), String> {
        let value = serde_json::to_value(event)
            .map_err(|e| format!("Failed to serialize output: {}", e))?;
        self.write_line(&value)
    }
}
