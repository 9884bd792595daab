// src/protocol/encode.rs
//
// Builders for well-formed tester frames. Used to seal test fixtures and to
// produce capture files for replay.

use super::frame::{FCS_LEN, SAMPLE_OFFSET, TRAILER, TRAILER_LEN};
use super::report::{OHM_PLACEHOLDER, OHM_SIGN};
use super::validate::FrameFault;
use crate::checksums::fcs16_checksum;

/// Code page the tester announces for BATT_INFO text (65001, UTF-8).
pub const UTF8_CODE_PAGE: u16 = 65001;

const CHART_HEADER: [u8; 2] = [0x24, 0x24];
const CHART_TYPE: [u8; 2] = [0xFF, 0x01];
const CHART_DISPLAY_TYPE: [u8; 2] = [0xFF, 0x02];
const BATTERY_INFO_HEADER: [u8; 5] = [0x00, 0x24, 0x24, 0xFF, 0xFE];

/// Largest sample count whose frame length still fits the 16-bit field.
pub const MAX_CHART_SAMPLES: usize =
    (u16::MAX as usize - SAMPLE_OFFSET - FCS_LEN - TRAILER_LEN) / 2;

/// Append FCS (low byte first) and trailer to a frame body.
fn seal(mut body: Vec<u8>) -> Vec<u8> {
    let fcs = fcs16_checksum(&body);
    body.extend_from_slice(&fcs.to_le_bytes());
    body.extend_from_slice(&TRAILER);
    body
}

/// CHART frame carrying the given decivolt samples.
pub fn encode_chart_frame(decivolts: &[u16]) -> Result<Vec<u8>, FrameFault> {
    if decivolts.len() > MAX_CHART_SAMPLES {
        return Err(FrameFault::BadLength);
    }
    let total = SAMPLE_OFFSET + decivolts.len() * 2 + FCS_LEN + TRAILER_LEN;
    let mut body = Vec::with_capacity(total);
    body.extend_from_slice(&CHART_HEADER);
    body.extend_from_slice(&(total as u16).to_le_bytes());
    body.extend_from_slice(&CHART_TYPE);
    for sample in decivolts {
        body.extend_from_slice(&sample.to_le_bytes());
    }
    Ok(seal(body))
}

/// CHART_DISPLAY frame closing a series.
pub fn encode_chart_display_frame() -> Vec<u8> {
    let total = (SAMPLE_OFFSET + FCS_LEN + TRAILER_LEN) as u16;
    let mut body = Vec::with_capacity(total as usize);
    body.extend_from_slice(&CHART_HEADER);
    body.extend_from_slice(&total.to_le_bytes());
    body.extend_from_slice(&CHART_DISPLAY_TYPE);
    seal(body)
}

/// BATT_INFO frame. The ohm sign goes out as the tester's 0x7F placeholder.
pub fn encode_battery_info_frame(text: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(BATTERY_INFO_HEADER.len() + 2 + text.len() + TRAILER_LEN);
    frame.extend_from_slice(&BATTERY_INFO_HEADER);
    frame.extend_from_slice(&UTF8_CODE_PAGE.to_le_bytes());
    let mut utf8 = [0u8; 4];
    for c in text.chars() {
        if c == OHM_SIGN {
            frame.push(OHM_PLACEHOLDER);
        } else {
            frame.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
        }
    }
    frame.extend_from_slice(&TRAILER);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{classify, text_encoding, FrameType};
    use crate::protocol::report::decode_battery_text;
    use crate::protocol::samples::decode_chart_samples;
    use crate::protocol::validate::validate;

    #[test]
    fn test_encode_chart_matches_fixture() {
        let frame = encode_chart_frame(&[125, 120, 110]).unwrap();
        assert_eq!(
            frame,
            vec![
                0x24, 0x24, 0x10, 0x00, 0xFF, 0x01, 0x7D, 0x00, 0x78, 0x00, 0x6E, 0x00, 0x6F,
                0xFD, 0x0D, 0x0A
            ]
        );
    }

    #[test]
    fn test_encode_chart_display_matches_fixture() {
        assert_eq!(
            encode_chart_display_frame(),
            vec![0x24, 0x24, 0x0A, 0x00, 0xFF, 0x02, 0xBE, 0x2F, 0x0D, 0x0A]
        );
    }

    #[test]
    fn test_encoded_chart_decodes() {
        let samples = [131, 95, 88, 102, 119, 126];
        let frame = encode_chart_frame(&samples).unwrap();
        let validated = validate(&frame).expect("encoded frame validates");
        assert_eq!(decode_chart_samples(&validated), samples.to_vec());
    }

    #[test]
    fn test_encode_empty_chart_is_valid() {
        let frame = encode_chart_frame(&[]).unwrap();
        assert_eq!(frame.len(), 10);
        assert_eq!(classify(&frame), FrameType::Chart);
        assert!(validate(&frame).is_ok());
    }

    #[test]
    fn test_encode_chart_too_many_samples() {
        let samples = vec![0u16; MAX_CHART_SAMPLES + 1];
        assert_eq!(encode_chart_frame(&samples), Err(FrameFault::BadLength));
        assert!(encode_chart_frame(&samples[..MAX_CHART_SAMPLES]).is_ok());
    }

    #[test]
    fn test_encode_battery_info() {
        let frame = encode_battery_info_frame("R=4.52m\u{03A9}");
        assert_eq!(&frame[..5], &[0x00, 0x24, 0x24, 0xFF, 0xFE]);
        assert_eq!(text_encoding(&frame), Some(UTF8_CODE_PAGE));
        assert_eq!(frame[frame.len() - 3], OHM_PLACEHOLDER);

        let validated = validate(&frame).unwrap();
        assert_eq!(decode_battery_text(&validated), "R=4.52m\u{03A9}");
    }
}
