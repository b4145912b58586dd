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

use crate::EventSink;
use crate::api::EntityEvent;
use crate::packet::umd_pdu::UmdPdu;
use crate::types::SeqWindow;
use crate::types::Sn;
#[cfg(not(test))]
use log::warn;
use std::cell::RefCell;
use std::collections::VecDeque;
#[cfg(test)]
use std::println as warn;
use std::rc::Rc;

/// States of the reassembly automaton.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReassemblyState {
    /// The next data field must start an SDU: either a full SDU or a first
    /// segment. Nothing is carried over.
    WaitingS0Full,

    /// A partial SDU is held; the next data field must continue it.
    WaitingSiSf,
}

/// Rebuilds SDUs from PDUs arriving in ascending SN order.
///
/// Each PDU contributes its data fields; a field cut at the PDU boundary is
/// carried in `keep_s0` until its continuation arrives. A discontinuity in
/// the SN sequence means the continuation is gone, so the held fragment and
/// any orphan continuation field must be dropped.
///
/// Completed SDUs are pushed to the event sink, in order.
pub struct Reassembler {
    window: SeqWindow,
    events: Rc<RefCell<dyn EventSink>>,
    state: ReassemblyState,
    keep_s0: Option<Vec<u8>>,
    expected_sn: Sn,
    delivered_sdus: usize,
    discarded_fragments: usize,
    protocol_violations: usize,
}

impl Reassembler {
    pub fn new(window: SeqWindow, events: Rc<RefCell<dyn EventSink>>) -> Self {
        Self {
            window,
            events,
            state: ReassemblyState::WaitingS0Full,
            keep_s0: None,
            expected_sn: Sn(0),
            delivered_sdus: 0,
            discarded_fragments: 0,
            protocol_violations: 0,
        }
    }

    /// Number of SDUs delivered upward.
    pub fn delivered_sdus(&self) -> usize {
        self.delivered_sdus
    }

    /// Orphan segments and held partial SDUs dropped because of losses.
    pub fn discarded_fragments(&self) -> usize {
        self.discarded_fragments
    }

    /// Malformed PDUs and impossible framing combinations.
    pub fn protocol_violations(&self) -> usize {
        self.protocol_violations
    }

    /// Drops the held partial SDU, if any. Used when the entity closes.
    pub fn stop(&mut self) {
        self.keep_s0 = None;
        self.state = ReassemblyState::WaitingS0Full;
    }

    /// Consumes one PDU and delivers every SDU it completes.
    ///
    /// The transition is a function of the reassembly state, the PDU's
    /// framing info and whether its SN continues the previous one. A PDU
    /// that cannot be parsed is dropped without touching any state.
    pub fn reassemble(&mut self, pdu: &[u8]) {
        let pdu = match UmdPdu::from_bytes(pdu) {
            Ok(pdu) => pdu,
            Err(e) => {
                warn!("Dropping malformed UMD PDU: {}", e);
                self.protocol_violations += 1;
                return;
            }
        };
        let sn = pdu.header.sequence_number;
        let lost = sn != self.expected_sn;
        self.expected_sn = self.window.next(sn);

        let begins = pdu.header.framing_info.is_beginning;
        let ends = pdu.header.framing_info.is_end;
        let mut fields: VecDeque<Vec<u8>> = pdu.data_fields.into();

        use ReassemblyState::*;
        match (self.state, begins, ends, lost) {
            // In sequence, nothing held.
            (WaitingS0Full, true, true, false) => {
                self.deliver_all(&mut fields);
            }
            (WaitingS0Full, true, false, false) => {
                self.keep_last(&mut fields);
                self.deliver_all(&mut fields);
                self.state = WaitingSiSf;
            }
            (WaitingS0Full, false, _, false) => {
                // A continuation without anything to continue.
                warn!(
                    "Framing info {}{} impossible without a held segment",
                    begins as u8, ends as u8
                );
                self.protocol_violations += 1;
            }

            // In sequence, a partial SDU held.
            (WaitingSiSf, false, true, false) => {
                self.join_held(&mut fields);
                self.deliver_all(&mut fields);
                self.state = WaitingS0Full;
            }
            (WaitingSiSf, false, false, false) => {
                self.join_held(&mut fields);
                self.keep_last(&mut fields);
                self.deliver_all(&mut fields);
            }
            (WaitingSiSf, true, _, false) => {
                // An SDU boundary while the previous SDU is still open.
                warn!(
                    "Framing info {}{} impossible with a held segment",
                    begins as u8, ends as u8
                );
                self.protocol_violations += 1;
            }

            // After a gap, nothing held.
            (WaitingS0Full, true, true, true) => {
                self.deliver_all(&mut fields);
            }
            (WaitingS0Full, true, false, true) => {
                self.keep_last(&mut fields);
                self.deliver_all(&mut fields);
                self.state = WaitingSiSf;
            }
            (WaitingS0Full, false, true, true) => {
                self.discard_first(&mut fields);
                self.deliver_all(&mut fields);
            }
            (WaitingS0Full, false, false, true) => {
                self.discard_first(&mut fields);
                if !fields.is_empty() {
                    self.keep_last(&mut fields);
                    self.deliver_all(&mut fields);
                    self.state = WaitingSiSf;
                }
            }

            // After a gap, a partial SDU held: its continuation is lost.
            (WaitingSiSf, true, true, true) => {
                self.discard_held();
                self.deliver_all(&mut fields);
                self.state = WaitingS0Full;
            }
            (WaitingSiSf, true, false, true) => {
                self.discard_held();
                self.keep_last(&mut fields);
                self.deliver_all(&mut fields);
            }
            (WaitingSiSf, false, true, true) => {
                self.discard_held();
                self.discard_first(&mut fields);
                self.deliver_all(&mut fields);
                self.state = WaitingS0Full;
            }
            (WaitingSiSf, false, false, true) => {
                self.discard_held();
                self.discard_first(&mut fields);
                if fields.is_empty() {
                    self.state = WaitingS0Full;
                } else {
                    self.keep_last(&mut fields);
                    self.deliver_all(&mut fields);
                }
            }
        }

        // The held fragment and the state encode the same fact.
        debug_assert_eq!(
            self.keep_s0.is_some(),
            self.state == ReassemblyState::WaitingSiSf
        );
    }

    fn deliver_all(&mut self, fields: &mut VecDeque<Vec<u8>>) {
        while let Some(sdu) = fields.pop_front() {
            self.delivered_sdus += 1;
            self.events.borrow_mut().add(EntityEvent::DeliverSdu(sdu));
        }
    }

    /// Moves the terminal field - an SDU cut at the PDU boundary - into
    /// `keep_s0`.
    fn keep_last(&mut self, fields: &mut VecDeque<Vec<u8>>) {
        debug_assert!(self.keep_s0.is_none());
        self.keep_s0 = Some(fields.pop_back().unwrap());
    }

    /// Prepends the held fragment to the first field, completing an SDU that
    /// spans the PDU boundary.
    fn join_held(&mut self, fields: &mut VecDeque<Vec<u8>>) {
        let mut held = self.keep_s0.take().unwrap();
        held.extend(fields.pop_front().unwrap());
        fields.push_front(held);
    }

    fn discard_held(&mut self) {
        self.keep_s0 = None;
        self.discarded_fragments += 1;
    }

    fn discard_first(&mut self, fields: &mut VecDeque<Vec<u8>>) {
        fields.pop_front();
        self.discarded_fragments += 1;
    }
}
