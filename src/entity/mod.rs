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
use crate::api::BufferStatusReport;
use crate::api::Config;
use crate::api::EntityEvent;
use crate::api::EntityTime;
use crate::api::Metrics;
use crate::api::OutboundPdu;
use crate::api::UmRlcEntity;
use crate::events::Events;
use crate::logging::log_pdu;
use crate::packet::umd_pdu::peek_sequence_number;
use crate::rx::reassembler::Reassembler;
use crate::rx::reorder_window::ReorderWindow;
use crate::tx::transmit_queue::TransmitQueue;
use crate::types::SeqWindow;
#[cfg(not(test))]
use log::debug;
#[cfg(not(test))]
use log::info;
#[cfg(not(test))]
use log::warn;
use std::cell::RefCell;
#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;
use std::rc::Rc;
use std::time::Duration;


struct LoggingEvents {
    parent: Rc<RefCell<dyn EventSink>>,
    name: String,
    now: Rc<RefCell<EntityTime>>,
}

impl LoggingEvents {
    pub fn new(
        parent: Rc<RefCell<dyn EventSink>>,
        name: String,
        now: Rc<RefCell<EntityTime>>,
    ) -> LoggingEvents {
        Self { parent, name, now }
    }
}

impl EventSink for LoggingEvents {
    fn add(&mut self, event: EntityEvent) {
        match event {
            EntityEvent::TransmitPdu(ref p) => {
                let now = *self.now.borrow();
                log_pdu(&self.name, now.into(), true, &p.pdu);
            }
            EntityEvent::DeliverSdu(ref sdu) => info!("DeliverSdu: {} bytes", sdu.len()),
            EntityEvent::BufferStatus(ref r) => {
                info!(
                    "BufferStatus: queue = {} bytes, HOL delay = {:?}",
                    r.tx_queue_bytes, r.tx_queue_hol_delay
                );
            }
        }
        self.parent.borrow_mut().add(event);
    }

    fn next_event(&mut self) -> Option<EntityEvent> {
        self.parent.borrow_mut().next_event()
    }
}

/// An UM RLC entity.
///
/// The entity is the main entry point of the `lte-rlc-um` library. One
/// instance serves one logical channel of one UE, in both directions.
///
/// To create an entity, use [`Entity::new`] or [`crate::new_entity`].
pub struct Entity {
    name: String,
    now: Rc<RefCell<EntityTime>>,
    config: Config,
    events: Rc<RefCell<dyn EventSink>>,
    transmit_queue: TransmitQueue,
    reorder_window: ReorderWindow,
    reassembler: Reassembler,
    closed: bool,

    tx_pdus_count: usize,
    tx_pdu_bytes: u64,
    tx_sdus_count: usize,
    rx_pdus_count: usize,
    rx_pdu_bytes: u64,
    rx_pdus_discarded: usize,
    rx_malformed_pdus: usize,
    last_rx_delay: Duration,
}

impl Entity {
    /// Creates a new `Entity`.
    ///
    /// The provided `name` is only used for logging, to tell entities apart.
    pub fn new(name: &str, config: &Config) -> Self {
        let now = Rc::new(RefCell::new(EntityTime::zero()));
        let events: Rc<RefCell<Events>> = Rc::new(RefCell::new(Events::new()));
        let events: Rc<RefCell<dyn EventSink>> =
            Rc::new(RefCell::new(LoggingEvents::new(events, name.into(), Rc::clone(&now))));
        let window = SeqWindow::new(config.sn_modulus, config.um_window_size);
        let mut entity = Entity {
            name: name.into(),
            now,
            config: config.clone(),
            events: Rc::clone(&events),
            transmit_queue: TransmitQueue::new(config.sn_modulus),
            reorder_window: ReorderWindow::new(window, config.t_reordering),
            reassembler: Reassembler::new(window, events),
            closed: false,
            tx_pdus_count: 0,
            tx_pdu_bytes: 0,
            tx_sdus_count: 0,
            rx_pdus_count: 0,
            rx_pdu_bytes: 0,
            rx_pdus_discarded: 0,
            rx_malformed_pdus: 0,
            last_rx_delay: Duration::ZERO,
        };
        // Let the MAC scheduler know the queue starts out empty.
        entity.report_buffer_status();
        entity
    }

    fn report_buffer_status(&mut self) {
        let now = *self.now.borrow();
        let report = BufferStatusReport {
            rnti: self.config.rnti,
            lcid: self.config.lcid,
            // Queued bytes plus the expected two header bytes per SDU.
            tx_queue_bytes: (self.transmit_queue.buffered_bytes()
                + 2 * self.transmit_queue.sdu_count()) as u32,
            tx_queue_hol_delay: self.transmit_queue.hol_delay(now),
            retx_queue_bytes: 0,
            retx_queue_hol_delay: Duration::ZERO,
            status_pdu_bytes: 0,
        };
        self.events.borrow_mut().add(EntityEvent::BufferStatus(report));
    }
}

impl UmRlcEntity for Entity {
    fn poll_event(&mut self) -> Option<EntityEvent> {
        self.events.borrow_mut().next_event()
    }

    fn transmit_sdu(&mut self, sdu: Vec<u8>) {
        if self.closed {
            return;
        }
        if sdu.is_empty() {
            warn!("Rejecting empty SDU");
            return;
        }
        let now = *self.now.borrow();
        debug!("Queueing SDU, {} bytes", sdu.len());
        self.tx_sdus_count += 1;
        self.transmit_queue.add(now, sdu);
        self.report_buffer_status();
    }

    fn notify_tx_opportunity(&mut self, bytes: u32) {
        if self.closed {
            return;
        }
        let Some(pdu) = self.transmit_queue.produce(bytes as usize) else {
            return;
        };
        let now = *self.now.borrow();
        self.tx_pdus_count += 1;
        self.tx_pdu_bytes += pdu.len() as u64;
        self.events.borrow_mut().add(EntityEvent::TransmitPdu(OutboundPdu {
            rnti: self.config.rnti,
            lcid: self.config.lcid,
            pdu,
            sent_at: now,
        }));
    }

    fn notify_harq_failure(&mut self) {
        // UM never retransmits.
    }

    fn receive_pdu(&mut self, pdu: &[u8], sent_at: Option<EntityTime>) {
        if self.closed {
            return;
        }
        let now = *self.now.borrow();
        log_pdu(&self.name, now.into(), false, pdu);

        self.rx_pdus_count += 1;
        self.rx_pdu_bytes += pdu.len() as u64;
        self.last_rx_delay =
            sent_at.filter(|t| *t <= now).map_or(Duration::ZERO, |t| now - t);

        let sn = match peek_sequence_number(pdu) {
            Ok(sn) => sn,
            Err(e) => {
                warn!("Dropping unparseable PDU: {}", e);
                self.rx_malformed_pdus += 1;
                return;
            }
        };
        match self.reorder_window.handle_pdu(now, sn, pdu.to_vec()) {
            None => self.rx_pdus_discarded += 1,
            Some(released) => {
                for pdu in released {
                    self.reassembler.reassemble(&pdu);
                }
            }
        }
    }

    fn advance_time(&mut self, now: EntityTime) {
        if now < *self.now.borrow() {
            // Time is not allowed to go backwards.
            return;
        }
        self.now.replace(now);
        if self.closed {
            return;
        }
        for pdu in self.reorder_window.handle_timeout(now) {
            self.reassembler.reassemble(&pdu);
        }
    }

    fn poll_timeout(&self) -> EntityTime {
        // Ensure that an already expired timer doesn't return an instant in
        // the past.
        let now = *self.now.borrow();
        self.reorder_window
            .next_timeout()
            .map(|t| t.max(now))
            .unwrap_or(EntityTime::infinite_future())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        info!("Closing entity");
        self.closed = true;
        self.reorder_window.stop();
        self.reassembler.stop();
    }

    fn config(&self) -> Config {
        self.config.clone()
    }

    fn metrics(&self) -> Metrics {
        Metrics {
            tx_pdus_count: self.tx_pdus_count,
            tx_pdu_bytes: self.tx_pdu_bytes,
            tx_sdus_count: self.tx_sdus_count,
            rx_pdus_count: self.rx_pdus_count,
            rx_pdu_bytes: self.rx_pdu_bytes,
            last_rx_delay: self.last_rx_delay,
            rx_sdus_count: self.reassembler.delivered_sdus(),
            rx_pdus_discarded: self.rx_pdus_discarded,
            rx_fragments_discarded: self.reassembler.discarded_fragments(),
            rx_protocol_violations: self.reassembler.protocol_violations()
                + self.rx_malformed_pdus,
        }
    }
}
