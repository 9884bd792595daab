// src/protocol/mod.rs
//
// Battery tester wire protocol: classification, validation, decoding and
// the receive assembler that ties them together.

pub mod assembler;
pub mod encode;
pub mod frame;
pub mod report;
pub mod samples;
pub mod validate;

pub use assembler::{
    AssemblerConfig, AssemblerState, DecodeEvent, ReceiveAssembler, RetryPolicy, ValidationMode,
};
pub use frame::{classify, FrameType};
pub use report::{BatteryReport, ReportError};
pub use samples::{ChartSeries, SampleSeries, TimeAxisMode};
pub use validate::{is_correct, validate, FrameFault, Validated};
