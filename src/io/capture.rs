// src/io/capture.rs
//
// Capture replay: a recorded byte stream handed to the decoder whole, or in
// fixed-size chunks to reproduce the split deliveries of a live link.

use std::path::Path;

use super::error::IoError;
use super::ByteSource;

/// How a capture file is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Bytes exactly as received.
    Raw,
    /// Hex text, e.g. a pasted terminal dump (`24 24 10 00`, `0x24,0x24`).
    Hex,
}

pub struct CaptureSource {
    name: String,
    data: Vec<u8>,
    position: usize,
    chunk_size: usize,
}

impl CaptureSource {
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            name: name.into(),
            data,
            position: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Load a capture file. Without a chunk size the whole capture is one
    /// delivery.
    pub fn open(
        path: &Path,
        format: CaptureFormat,
        chunk_size: Option<usize>,
    ) -> Result<Self, IoError> {
        let name = path.display().to_string();
        let raw = std::fs::read(path).map_err(|e| IoError::capture(&name, e.to_string()))?;
        let data = match format {
            CaptureFormat::Raw => raw,
            CaptureFormat::Hex => {
                let text = String::from_utf8(raw)
                    .map_err(|e| IoError::capture(&name, format!("not text: {}", e)))?;
                parse_hex_capture(&text).map_err(|e| IoError::capture(&name, e))?
            }
        };
        let chunk_size = chunk_size.unwrap_or(data.len()).max(1);
        tlog!(
            "[capture] Loaded {} ({} bytes, {} per delivery)",
            name,
            data.len(),
            chunk_size
        );
        Ok(Self::from_bytes(name, data, chunk_size))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl ByteSource for CaptureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_bytes(&mut self) -> Result<Option<Vec<u8>>, IoError> {
        if self.position >= self.data.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(Some(chunk))
    }
}

/// Parse hex text into bytes.
///
/// Tokens are separated by whitespace or commas and may carry a `0x`
/// prefix. Tokens longer than two digits are runs of bytes. Lines starting
/// with `#` are comments.
pub fn parse_hex_capture(text: &str) -> Result<Vec<u8>, String> {
    let mut digits = String::with_capacity(text.len());
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        for token in line.split(|c: char| c.is_whitespace() || c == ',') {
            let token = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if token.len() % 2 != 0 {
                return Err(format!("odd number of hex digits in '{}'", token));
            }
            digits.push_str(token);
        }
    }
    hex::decode(&digits).map_err(|e| format!("invalid hex: {}", e))
}
