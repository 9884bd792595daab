// src/protocol/assembler.rs
//
// Receive assembler: turns transport deliveries into decode events.
//
// The assembler owns the receive buffer, the sample series of the chart in
// progress and the retry counter. `poll` is one cycle of the receive loop
// and has no I/O of its own; the transport loop and the sinks sit around it.

use serde::{Deserialize, Serialize};

use super::frame::{classify, is_viable_prefix, text_encoding, FrameType, SHORTEST_TEMPLATE_LEN};
use super::report::{decode_battery_text, BatteryReport};
use super::samples::{ChartSeries, SampleSeries, TimeAxisMode};
use super::validate::{check_integrity, frame_view, validate, FrameFault, Validated};

/// Consecutive counted `Unknown` polls before the buffer is dropped.
pub const DEFAULT_RETRY_LIMIT: u8 = 3;

// ============================================================================
// Configuration
// ============================================================================

/// Whether CHART / CHART_DISPLAY frames must pass trailer and FCS checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    Strict,
    /// Decode on header classification alone. BATT_INFO still waits for its
    /// trailer since that is the only end marker it has.
    Permissive,
}

/// Which `Unknown` polls count towards the retry limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Count only buffers that cannot become a header or are already long
    /// enough for the shortest template. A short header prefix waits.
    #[default]
    PrefixAware,
    /// Count every `Unknown` poll, however short the buffer.
    EveryPoll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    pub validation: ValidationMode,
    pub retry_policy: RetryPolicy,
    pub retry_limit: u8,
    pub time_axis: TimeAxisMode,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            validation: ValidationMode::default(),
            retry_policy: RetryPolicy::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            time_axis: TimeAxisMode::default(),
        }
    }
}

// ============================================================================
// State and Events
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssemblerState {
    /// Buffer empty.
    #[default]
    Idle,
    /// Waiting for more bytes.
    Accumulating,
    /// Bytes left after a consumed frame; poll again without new input.
    Recheck,
}

/// Output of one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecodeEvent {
    /// Status text from a BATT_INFO frame, with the parsed report when the
    /// text has the usual layout.
    BatteryInfo {
        text: String,
        report: Option<BatteryReport>,
    },
    /// A CHART frame was appended to the series in progress.
    ChartFrame { samples: usize, total: usize },
    /// CHART_DISPLAY completed the series.
    Chart(ChartSeries),
    /// A classified frame failed validation; buffer and series were reset.
    Rejected {
        frame_type: FrameType,
        fault: FrameFault,
        frame_hex: String,
    },
    /// Unclassifiable bytes dropped after the retry limit.
    Discarded { bytes: usize },
}

// ============================================================================
// Assembler
// ============================================================================

#[derive(Debug, Default)]
pub struct ReceiveAssembler {
    config: AssemblerConfig,
    buffer: Vec<u8>,
    series: SampleSeries,
    retries: u8,
    state: AssemblerState,
    frame_type: FrameType,
}

impl ReceiveAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    pub fn retry_count(&self) -> u8 {
        self.retries
    }

    /// Classification of the buffer at the last poll.
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// A frame was consumed and bytes remain; the next poll must run even
    /// if the transport has nothing new.
    pub fn needs_recheck(&self) -> bool {
        self.state == AssemblerState::Recheck
    }

    /// Drop all buffered bytes and per-frame state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.series.clear();
        self.retries = 0;
        self.state = AssemblerState::Idle;
        self.frame_type = FrameType::Unknown;
    }

    /// Trim a consumed frame off the front of the buffer. Leftover bytes
    /// may already hold the next frame.
    fn consume(&mut self, span: usize) {
        self.buffer.drain(..span);
        self.retries = 0;
        self.state = if self.buffer.is_empty() {
            AssemblerState::Idle
        } else {
            AssemblerState::Recheck
        };
    }

    /// Poll, then keep polling while leftover bytes need a recheck.
    pub fn feed(&mut self, incoming: &[u8]) -> Vec<DecodeEvent> {
        let mut events = self.poll(incoming);
        while self.needs_recheck() {
            events.extend(self.poll(&[]));
        }
        events
    }

    /// One receive cycle.
    ///
    /// A cycle runs when `incoming` is non-empty or a recheck is pending;
    /// otherwise nothing happens.
    pub fn poll(&mut self, incoming: &[u8]) -> Vec<DecodeEvent> {
        let mut events = Vec::new();
        if incoming.is_empty() && !self.needs_recheck() {
            return events;
        }
        self.buffer.extend_from_slice(incoming);

        self.frame_type = classify(&self.buffer);
        match self.frame_type {
            FrameType::Unknown => self.on_unknown(&mut events),
            frame_type => {
                self.retries = 0;
                self.on_frame(frame_type, &mut events);
            }
        }
        events
    }

    fn on_unknown(&mut self, events: &mut Vec<DecodeEvent>) {
        if self.buffer.is_empty() {
            self.state = AssemblerState::Idle;
            return;
        }
        self.state = AssemblerState::Accumulating;

        let counts = match self.config.retry_policy {
            RetryPolicy::EveryPoll => true,
            RetryPolicy::PrefixAware => {
                self.buffer.len() >= SHORTEST_TEMPLATE_LEN || !is_viable_prefix(&self.buffer)
            }
        };
        if !counts {
            return;
        }

        self.retries += 1;
        vlog!(
            "[assembler] Unknown data ({} bytes), retry {}/{}",
            self.buffer.len(),
            self.retries,
            self.config.retry_limit
        );
        if self.retries >= self.config.retry_limit.max(1) {
            let bytes = self.buffer.len();
            vlog!("[assembler] Discarding {}", hex::encode(&self.buffer));
            self.reset();
            events.push(DecodeEvent::Discarded { bytes });
        }
    }

    fn on_frame(&mut self, frame_type: FrameType, events: &mut Vec<DecodeEvent>) {
        let verdict = accept(self.config.validation, &self.buffer);
        let frame = match verdict {
            Ok(frame) => frame,
            Err(FrameFault::InsufficientData) => {
                self.state = AssemblerState::Accumulating;
                return;
            }
            Err(fault) => {
                let bytes = frame_view(&self.buffer)
                    .map(|f| f.bytes())
                    .unwrap_or(self.buffer.as_slice());
                let frame_hex = hex::encode(bytes);
                self.reset();
                events.push(DecodeEvent::Rejected {
                    frame_type,
                    fault,
                    frame_hex,
                });
                return;
            }
        };
        vlog!(
            "[assembler] {} frame: {}",
            frame_type.as_str(),
            hex::encode(frame.bytes())
        );

        match frame_type {
            FrameType::BatteryInfo => {
                if let Some(code_page) = text_encoding(frame.bytes()) {
                    vlog!("[assembler] Battery info code page {}", code_page);
                }
                let text = decode_battery_text(&frame);
                let report = match BatteryReport::parse(&text) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        vlog!("[assembler] Battery report not parsed: {}", e);
                        None
                    }
                };
                let span = frame.frame().span();
                self.series.clear();
                self.consume(span);
                events.push(DecodeEvent::BatteryInfo { text, report });
            }
            FrameType::Chart => {
                let samples = self.series.extend_from_frame(&frame);
                let span = frame.frame().span();
                self.consume(span);
                events.push(DecodeEvent::ChartFrame {
                    samples,
                    total: self.series.len(),
                });
            }
            FrameType::ChartDisplay => {
                let event = match self.series.to_chart(self.config.time_axis) {
                    Ok(chart) => DecodeEvent::Chart(chart),
                    Err(fault) => DecodeEvent::Rejected {
                        frame_type,
                        fault,
                        frame_hex: hex::encode(frame.bytes()),
                    },
                };
                let span = frame.frame().span();
                self.series.clear();
                self.consume(span);
                events.push(event);
            }
            FrameType::Unknown => {}
        }
    }
}

/// Produce the frame at the front of `buffer` under the given mode.
fn accept(mode: ValidationMode, buffer: &[u8]) -> Result<Validated<'_>, FrameFault> {
    match mode {
        ValidationMode::Strict => validate(buffer),
        ValidationMode::Permissive => {
            let frame = frame_view(buffer)?;
            if frame.frame_type() == FrameType::BatteryInfo {
                check_integrity(&frame)?;
            }
            Ok(Validated::permissive(frame))
        }
    }
}
