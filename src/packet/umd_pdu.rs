// Copyright 2025 The LTE-RLC Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::packet::HeaderParseError;
use crate::types::Sn;
use anyhow::Error;
use anyhow::ensure;
use std::fmt;

/// Size of the fixed part of the UMD PDU header.
pub(crate) const FIXED_HEADER_SIZE: usize = 2;

/// Length indicators are 11 bits wide.
pub(crate) const MAX_LENGTH_INDICATOR: usize = 0x7ff;

const FI_BITS: usize = 2;
const EXTENSION_BITS: usize = 1;
const SN_BITS: usize = 10;
const LI_BITS: usize = 11;

// A (LI, E) pair; two of them share three bytes.
const LI_PAIR_BITS: usize = LI_BITS + EXTENSION_BITS;

/// Framing info: whether this PDU starts and/or ends on SDU boundaries.
///
/// `is_beginning` is set iff the first data field begins at byte zero of an
/// SDU; `is_end` is set iff the last data field ends at an SDU boundary.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FramingInfo {
    pub is_beginning: bool,
    pub is_end: bool,
}

/// Unacknowledged Mode Data (UMD) PDU header, 10-bit SN flavor.
///
/// See 3GPP TS 36.322 section 6.2.1.3.
///
/// ```txt
///  0                   1
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +---+-+-------------------+-----+
/// |FI |E|  Sequence Number  | ... |
/// +---+-+-------------------+-----+
/// | (LI, E) pairs, 12 bits each,  |
/// | two pairs per three bytes,    |
/// | zero-padded to a byte boundary|
/// +-------------------------------+
/// |          Data fields          |
/// +-------------------------------+
/// ```
///
/// The first E bit announces whether any (LI, E) pairs follow; within the
/// pair list, an E of zero marks the last pair. Each length indicator gives
/// the size of one non-terminal data field; the terminal field takes
/// whatever payload remains and has no LI. This module is the only place
/// that knows the bit layout.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UmdPduHeader {
    pub sequence_number: Sn,
    pub framing_info: FramingInfo,
    pub length_indicators: Vec<u16>,
}

fn write_bits(output: &mut [u8], bit_pos: usize, value: u32, width: usize) {
    for i in 0..width {
        let bit = (value >> (width - 1 - i)) & 1;
        let pos = bit_pos + i;
        output[pos / 8] |= (bit as u8) << (7 - pos % 8);
    }
}

fn read_bits(input: &[u8], bit_pos: usize, width: usize) -> u32 {
    let mut value = 0;
    for i in 0..width {
        let pos = bit_pos + i;
        let bit = (input[pos / 8] >> (7 - pos % 8)) & 1;
        value = (value << 1) | (bit as u32);
    }
    value
}

impl UmdPduHeader {
    /// Returns the number of bytes this header serializes to: the fixed two
    /// bytes, plus 12 bits per length indicator, zero-padded to a byte
    /// boundary. Adding a LI therefore costs two bytes when it opens a pair
    /// and one byte when it completes one.
    pub fn serialized_size(&self) -> usize {
        let bits =
            FI_BITS + EXTENSION_BITS + SN_BITS + LI_PAIR_BITS * self.length_indicators.len();
        bits.div_ceil(8)
    }

    /// Serializes this header into `output`, which must be zeroed and at
    /// least [`Self::serialized_size`] bytes long.
    pub fn serialize_to(&self, output: &mut [u8]) {
        debug_assert!(output.len() >= self.serialized_size());
        debug_assert!(
            self.length_indicators
                .iter()
                .all(|li| (1..=MAX_LENGTH_INDICATOR).contains(&(*li as usize)))
        );

        let fi = ((self.framing_info.is_beginning as u32) << 1)
            | (self.framing_info.is_end as u32);
        write_bits(output, 0, fi, FI_BITS);
        write_bits(output, 2, !self.length_indicators.is_empty() as u32, EXTENSION_BITS);
        write_bits(output, 3, self.sequence_number.0 as u32, SN_BITS);

        let mut pos = FI_BITS + EXTENSION_BITS + SN_BITS;
        for (i, li) in self.length_indicators.iter().enumerate() {
            write_bits(output, pos, *li as u32, LI_BITS);
            let more = i + 1 < self.length_indicators.len();
            write_bits(output, pos + LI_BITS, more as u32, EXTENSION_BITS);
            pos += LI_PAIR_BITS;
        }
    }
}

impl fmt::Display for UmdPduHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UMD, sn={}, fi={}{}, li={:?}",
            self.sequence_number,
            self.framing_info.is_beginning as u8,
            self.framing_info.is_end as u8,
            self.length_indicators,
        )
    }
}

/// A parsed UMD PDU: the header, and the payload already sliced into data
/// fields. Field `i < n-1` has the length given by LI `i`; the terminal
/// field is the remainder and is never empty.
#[derive(Debug, PartialEq, Eq)]
pub struct UmdPdu {
    pub header: UmdPduHeader,
    pub data_fields: Vec<Vec<u8>>,
}

/// Reads the sequence number without consuming the PDU. Used by the
/// reception buffer, which stores PDUs unparsed until they are reassembled.
pub fn peek_sequence_number(bytes: &[u8]) -> Result<Sn, Error> {
    ensure!(bytes.len() >= FIXED_HEADER_SIZE, HeaderParseError::InvalidLength);
    Ok(Sn(read_bits(bytes, 3, SN_BITS) as u16))
}

impl UmdPdu {
    pub fn from_bytes(bytes: &[u8]) -> Result<UmdPdu, Error> {
        ensure!(bytes.len() >= FIXED_HEADER_SIZE, HeaderParseError::InvalidLength);

        let framing_info = FramingInfo {
            is_beginning: read_bits(bytes, 0, 1) != 0,
            is_end: read_bits(bytes, 1, 1) != 0,
        };
        let mut extension = read_bits(bytes, 2, 1);
        let sequence_number = Sn(read_bits(bytes, 3, SN_BITS) as u16);

        let mut length_indicators = Vec::new();
        let mut pos = FI_BITS + EXTENSION_BITS + SN_BITS;
        while extension != 0 {
            ensure!(
                (pos + LI_PAIR_BITS).div_ceil(8) <= bytes.len(),
                HeaderParseError::InvalidLength
            );
            let li = read_bits(bytes, pos, LI_BITS) as u16;
            ensure!(li != 0, HeaderParseError::InvalidValue);
            length_indicators.push(li);
            extension = read_bits(bytes, pos + LI_BITS, EXTENSION_BITS);
            pos += LI_PAIR_BITS;
        }

        let header_size = pos.div_ceil(8);
        let mut payload = &bytes[header_size..];
        ensure!(!payload.is_empty(), HeaderParseError::InvalidLength);

        let mut data_fields = Vec::with_capacity(length_indicators.len() + 1);
        for li in &length_indicators {
            // Each LI must leave at least one byte for the terminal field.
            ensure!((*li as usize) < payload.len(), HeaderParseError::InvalidLengthIndicator);
            let (field, rest) = payload.split_at(*li as usize);
            data_fields.push(field.to_vec());
            payload = rest;
        }
        data_fields.push(payload.to_vec());

        Ok(UmdPdu {
            header: UmdPduHeader { sequence_number, framing_info, length_indicators },
            data_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(header: &UmdPduHeader) -> Vec<u8> {
        let mut bytes = vec![0; header.serialized_size()];
        header.serialize_to(&mut bytes);
        bytes
    }

    #[test]
    fn fixed_header_without_length_indicators() {
        // FI = (1, 1), E = 0, SN = 0.
        let header = UmdPduHeader {
            sequence_number: Sn(0),
            framing_info: FramingInfo { is_beginning: true, is_end: true },
            length_indicators: vec![],
        };
        assert_eq!(header.serialized_size(), 2);
        assert_eq!(serialize(&header), vec![0xc0, 0x00]);
    }

    #[test]
    fn framing_info_bit_positions() {
        let first_only = UmdPduHeader {
            framing_info: FramingInfo { is_beginning: true, is_end: false },
            ..Default::default()
        };
        assert_eq!(serialize(&first_only), vec![0x80, 0x00]);

        let last_only = UmdPduHeader {
            sequence_number: Sn(1),
            framing_info: FramingInfo { is_beginning: false, is_end: true },
            ..Default::default()
        };
        assert_eq!(serialize(&last_only), vec![0x40, 0x08]);
    }

    #[test]
    fn sequence_number_spans_both_octets() {
        let header = UmdPduHeader { sequence_number: Sn(0x3ff), ..Default::default() };
        // E = 0, SN = 1111111111, three bits of padding.
        assert_eq!(serialize(&header), vec![0x1f, 0xf8]);
    }

    #[test]
    fn length_indicator_sizes_follow_pair_packing() {
        let mut header = UmdPduHeader::default();
        assert_eq!(header.serialized_size(), 2);
        for (count, expected) in [(1, 4), (2, 5), (3, 7), (4, 8)] {
            header.length_indicators = vec![10; count];
            assert_eq!(header.serialized_size(), expected);
        }
    }

    #[test]
    fn one_length_indicator_from_capture() {
        // FI = (1, 1), SN = 3, one LI of 5, then a 5-byte and a 2-byte
        // data field.
        const BYTES: &[u8] = &[0xe0, 0x18, 0x05, 0x00, 1, 2, 3, 4, 5, 9, 9];
        let pdu = UmdPdu::from_bytes(BYTES).unwrap();
        assert_eq!(pdu.header.sequence_number, Sn(3));
        assert_eq!(pdu.header.framing_info, FramingInfo { is_beginning: true, is_end: true });
        assert_eq!(pdu.header.length_indicators, vec![5]);
        assert_eq!(pdu.data_fields, vec![vec![1, 2, 3, 4, 5], vec![9, 9]]);
    }

    #[test]
    fn two_length_indicators_share_three_bytes() {
        // FI = (1, 1), SN = 0, two LIs of 10: header is 2 + 3 bytes.
        let header = UmdPduHeader {
            sequence_number: Sn(0),
            framing_info: FramingInfo { is_beginning: true, is_end: true },
            length_indicators: vec![10, 10],
        };
        assert_eq!(serialize(&header), vec![0xe0, 0x00, 0x0a, 0x80, 0xa0]);
    }

    #[test]
    fn serialize_and_deserialize() {
        let header = UmdPduHeader {
            sequence_number: Sn(789),
            framing_info: FramingInfo { is_beginning: false, is_end: true },
            length_indicators: vec![1, 2047, 42],
        };
        let mut bytes = serialize(&header);
        bytes.extend_from_slice(&vec![7; 1 + 2047 + 42 + 9]);

        let pdu = UmdPdu::from_bytes(&bytes).unwrap();
        assert_eq!(pdu.header, header);
        assert_eq!(pdu.data_fields.len(), 4);
        assert_eq!(pdu.data_fields[0].len(), 1);
        assert_eq!(pdu.data_fields[1].len(), 2047);
        assert_eq!(pdu.data_fields[2].len(), 42);
        assert_eq!(pdu.data_fields[3].len(), 9);

        assert_eq!(pdu.header.to_string(), "UMD, sn=789, fi=01, li=[1, 2047, 42]");
    }

    #[test]
    fn peek_does_not_need_the_full_pdu() {
        assert_eq!(peek_sequence_number(&[0x40, 0x08]).unwrap(), Sn(1));
        assert_eq!(peek_sequence_number(&[0x1f, 0xf8]).unwrap(), Sn(0x3ff));
        assert!(peek_sequence_number(&[0x40]).is_err());
    }

    #[test]
    fn rejects_truncated_pdus() {
        assert!(UmdPdu::from_bytes(&[]).is_err());
        assert!(UmdPdu::from_bytes(&[0xc0]).is_err());
        // Well-formed header, but no data at all.
        assert!(UmdPdu::from_bytes(&[0xc0, 0x00]).is_err());
        // E = 1 but the (LI, E) pair is cut short.
        assert!(UmdPdu::from_bytes(&[0xe0, 0x00, 0x0a]).is_err());
    }

    #[test]
    fn rejects_length_indicator_beyond_payload() {
        // One LI of 5, but only 5 bytes of payload: nothing would remain
        // for the terminal data field.
        const BYTES: &[u8] = &[0xe0, 0x18, 0x05, 0x00, 1, 2, 3, 4, 5];
        assert!(UmdPdu::from_bytes(BYTES).is_err());
    }

    #[test]
    fn rejects_zero_length_indicator() {
        // As the capture above, but with LI = 0.
        const BYTES: &[u8] = &[0xe0, 0x18, 0x00, 0x00, 1, 2, 3, 4, 5, 9, 9];
        assert!(UmdPdu::from_bytes(BYTES).is_err());
    }
}
