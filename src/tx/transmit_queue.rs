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

use crate::api::EntityTime;
use crate::packet::umd_pdu::FIXED_HEADER_SIZE;
use crate::packet::umd_pdu::FramingInfo;
use crate::packet::umd_pdu::MAX_LENGTH_INDICATOR;
use crate::packet::umd_pdu::UmdPduHeader;
use crate::types::Sn;
#[cfg(not(test))]
use log::debug;
use std::collections::VecDeque;
#[cfg(test)]
use std::println as debug;
use std::time::Duration;

/// Where a queued payload sits relative to the SDU it was carved from.
///
/// Freshly enqueued SDUs are `Full`. Splitting is the only operation that
/// changes a status: the part taken into a PDU and the remainder put back at
/// the queue head are retagged so that framing info can later be derived
/// from the first and last data field of each PDU.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SduStatus {
    Full,
    FirstSegment,
    MiddleSegment,
    LastSegment,
}

impl SduStatus {
    /// True iff a data field with this status starts at byte zero of its
    /// SDU.
    pub fn starts_sdu(&self) -> bool {
        matches!(self, SduStatus::Full | SduStatus::FirstSegment)
    }

    /// True iff a data field with this status ends at an SDU boundary.
    pub fn ends_sdu(&self) -> bool {
        matches!(self, SduStatus::Full | SduStatus::LastSegment)
    }

    /// Statuses of the two halves when a queued payload is split: the front
    /// goes into the PDU under construction, the back returns to the queue.
    fn split(&self) -> (SduStatus, SduStatus) {
        match self {
            SduStatus::Full => (SduStatus::FirstSegment, SduStatus::LastSegment),
            SduStatus::LastSegment => (SduStatus::MiddleSegment, SduStatus::LastSegment),
            SduStatus::FirstSegment => (SduStatus::FirstSegment, SduStatus::MiddleSegment),
            SduStatus::MiddleSegment => (SduStatus::MiddleSegment, SduStatus::MiddleSegment),
        }
    }
}

struct TxSdu {
    payload: Vec<u8>,
    status: SduStatus,

    /// Enqueue time of the original SDU, kept across splits so head-of-line
    /// delay measures the oldest byte still queued.
    arrival: EntityTime,
}

/// The transmission buffer: SDUs queued by the upper layer, consumed one
/// opportunistic PDU at a time.
///
/// The queue is strictly FIFO. When only part of the head fits a PDU, the
/// remainder is reinserted at the head, so SDU bytes always leave in enqueue
/// order.
pub struct TransmitQueue {
    queue: VecDeque<TxSdu>,
    buffered_bytes: usize,
    next_sequence_number: Sn,
    sn_modulus: u16,
}

impl TransmitQueue {
    pub fn new(sn_modulus: u16) -> Self {
        Self {
            queue: VecDeque::new(),
            buffered_bytes: 0,
            next_sequence_number: Sn(0),
            sn_modulus,
        }
    }

    /// Queues one SDU for transmission, tagged as a full SDU with its
    /// arrival time.
    pub fn add(&mut self, now: EntityTime, sdu: Vec<u8>) {
        self.buffered_bytes += sdu.len();
        self.queue.push_back(TxSdu { payload: sdu, status: SduStatus::Full, arrival: now });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn sdu_count(&self) -> usize {
        self.queue.len()
    }

    /// Sum of the sizes of all queued SDUs and fragments.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    /// How long the head of the queue has been waiting.
    pub fn hol_delay(&self, now: EntityTime) -> Duration {
        self.queue.front().map_or(Duration::ZERO, |sdu| now - sdu.arrival)
    }

    /// Builds one UMD PDU of at most `budget` bytes, header included.
    ///
    /// Queued SDUs are concatenated into the PDU until one no longer fits
    /// whole, in which case it is split and its remainder returned to the
    /// queue head. Every data field except the terminal one is described by
    /// a length indicator, whose header cost is charged against the budget
    /// with the two-LIs-per-three-bytes packing (first of a pair: two bytes,
    /// second: one byte).
    ///
    /// Returns `None` when there is nothing to send or the budget cannot fit
    /// any data behind the fixed header.
    pub fn produce(&mut self, budget: usize) -> Option<Vec<u8>> {
        if budget <= FIXED_HEADER_SIZE {
            debug!("TX opportunity too small: {} bytes", budget);
            return None;
        }
        let mut head = self.queue.pop_front()?;
        self.buffered_bytes -= head.payload.len();

        let mut remaining = budget - FIXED_HEADER_SIZE;
        let mut data_fields: Vec<TxSdu> = Vec::new();
        let mut length_indicators: Vec<u16> = Vec::new();

        loop {
            if head.payload.len() > remaining {
                // Only a segment of the head fits. Take its front as the
                // terminal data field and give the remainder back.
                let rest = head.payload.split_off(remaining);
                let (taken_status, rest_status) = head.status.split();
                head.status = taken_status;
                self.buffered_bytes += rest.len();
                self.queue.push_front(TxSdu {
                    payload: rest,
                    status: rest_status,
                    arrival: head.arrival,
                });
                data_fields.push(head);
                break;
            }

            // Header cost of the length indicator the head would need as a
            // non-terminal field.
            let li_cost = if length_indicators.len() % 2 == 0 { 2 } else { 1 };
            let len = head.payload.len();
            if self.queue.is_empty()
                || len == remaining
                // A LI must leave room for at least one byte of the field
                // following it, and cannot describe more than 11 bits worth
                // of payload. Either way the head closes this PDU.
                || len + li_cost >= remaining
                || len > MAX_LENGTH_INDICATOR
            {
                data_fields.push(head);
                break;
            }

            length_indicators.push(len as u16);
            remaining -= len + li_cost;
            data_fields.push(head);

            head = self.queue.pop_front().unwrap();
            self.buffered_bytes -= head.payload.len();
        }

        let framing_info = FramingInfo {
            is_beginning: data_fields.first().unwrap().status.starts_sdu(),
            is_end: data_fields.last().unwrap().status.ends_sdu(),
        };
        let header = UmdPduHeader {
            sequence_number: self.next_sequence_number,
            framing_info,
            length_indicators,
        };
        self.next_sequence_number =
            Sn(self.next_sequence_number.0.wrapping_add(1) % self.sn_modulus);

        let header_size = header.serialized_size();
        let data_size: usize = data_fields.iter().map(|f| f.payload.len()).sum();
        let mut pdu = vec![0; header_size + data_size];
        header.serialize_to(&mut pdu);
        let mut at = header_size;
        for field in &data_fields {
            pdu[at..at + field.payload.len()].copy_from_slice(&field.payload);
            at += field.payload.len();
        }

        debug!("TX {}, {} data fields, {} bytes", header, data_fields.len(), pdu.len());
        Some(pdu)
    }
}
