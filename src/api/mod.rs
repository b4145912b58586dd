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

use std::fmt;
use std::ops::Add;
use std::ops::Sub;
use std::time::Duration;

pub use crate::entity::Entity;

/// Represents a point in time relative to the creation of the entity.
///
/// This is an absolute timestamp within the "entity epoch". The entity has no
/// clock of its own; the driving code advances time explicitly, which is what
/// makes the reordering timer deterministic and testable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityTime(Duration);

impl EntityTime {
    /// The moment the entity was created (t=0).
    pub const fn zero() -> EntityTime {
        EntityTime(Duration::ZERO)
    }
    pub const fn infinite_future() -> EntityTime {
        EntityTime(Duration::MAX)
    }
}

impl Add<Duration> for EntityTime {
    type Output = EntityTime;
    fn add(self, rhs: Duration) -> EntityTime {
        EntityTime(self.0 + rhs)
    }
}

impl Sub<Duration> for EntityTime {
    type Output = EntityTime;
    fn sub(self, rhs: Duration) -> EntityTime {
        EntityTime(self.0 - rhs)
    }
}

impl Sub<EntityTime> for EntityTime {
    type Output = Duration;
    fn sub(self, rhs: EntityTime) -> Duration {
        self.0 - rhs.0
    }
}

impl From<Duration> for EntityTime {
    fn from(value: Duration) -> Self {
        EntityTime(value)
    }
}

impl From<EntityTime> for Duration {
    fn from(value: EntityTime) -> Self {
        value.0
    }
}

/// Radio Network Temporary Identifier of the UE this entity belongs to.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Rnti(pub u16);

impl fmt::Debug for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical Channel Identifier of the radio bearer served by this entity.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Lcid(pub u8);

impl fmt::Debug for Lcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Lcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User configurable options.
#[derive(Clone)]
pub struct Config {
    /// RNTI of the UE, attached to every MAC-bound event.
    pub rnti: Rnti,

    /// Logical channel this entity serves.
    pub lcid: Lcid,

    /// The t-Reordering timer duration, bounding how long the receiver waits
    /// for a missing PDU before giving up on it.
    pub t_reordering: Duration,

    /// UM_Window_Size. Half of the SN space per TS 36.322; exposed so tests
    /// can shrink the window and exercise the wrap cheaply.
    pub um_window_size: u16,

    /// Size of the sequence number space. 1024 for the 10-bit SN field.
    pub sn_modulus: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rnti: Rnti(0),
            lcid: Lcid(0),
            // Default per TS 36.322 and the values commonly used in
            // simulation.
            t_reordering: Duration::from_secs(1),
            um_window_size: 512,
            sn_modulus: 1024,
        }
    }
}

/// Buffer status reported to the MAC scheduler after every SDU arrival.
///
/// The retransmission and status-PDU fields exist in the MAC service
/// primitive but are always zero for an UM entity, which has neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferStatusReport {
    pub rnti: Rnti,
    pub lcid: Lcid,

    /// Bytes queued for transmission, plus two bytes of estimated header
    /// overhead per queued SDU.
    pub tx_queue_bytes: u32,

    /// Head-of-line delay: how long the oldest queued SDU has been waiting.
    pub tx_queue_hol_delay: Duration,

    pub retx_queue_bytes: u32,
    pub retx_queue_hol_delay: Duration,
    pub status_pdu_bytes: u32,
}

/// A PDU handed to the MAC layer for transmission.
#[derive(Debug, PartialEq, Eq)]
pub struct OutboundPdu {
    pub rnti: Rnti,
    pub lcid: Lcid,

    /// The serialized UMD PDU.
    pub pdu: Vec<u8>,

    /// Egress timestamp. The original stack carries this beside the PDU as a
    /// byte tag (it is not part of the PDU bytes); the peer feeds it back to
    /// [`UmRlcEntity::receive_pdu`] to measure transport delay.
    pub sent_at: EntityTime,
}

/// Events generated by the entity, to be drained with
/// [`UmRlcEntity::poll_event`].
#[derive(Debug)]
pub enum EntityEvent {
    /// Generated when the entity wants a PDU to be sent, in response to a
    /// transmission opportunity. At most one per opportunity.
    TransmitPdu(OutboundPdu),

    /// Generated when a reassembled SDU is ready for the upper layer. SDUs
    /// are delivered in order; losses surface as omissions, never as
    /// reordering.
    DeliverSdu(Vec<u8>),

    /// Generated when the transmission queue changes, so the MAC scheduler
    /// can size the next grant.
    BufferStatus(BufferStatusReport),
}

/// Tracked metrics. Counters only; none of these affect entity behavior.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Number of PDUs handed to MAC.
    pub tx_pdus_count: usize,

    /// Total bytes of PDUs handed to MAC, headers included.
    pub tx_pdu_bytes: u64,

    /// Number of SDUs accepted from the upper layer.
    pub tx_sdus_count: usize,

    /// Number of PDUs received from MAC, including discarded ones.
    pub rx_pdus_count: usize,

    /// Total bytes of PDUs received from MAC.
    pub rx_pdu_bytes: u64,

    /// Transport delay of the most recently received PDU, measured from its
    /// egress timestamp. Zero when the timestamp was absent.
    pub last_rx_delay: Duration,

    /// Number of SDUs delivered to the upper layer.
    pub rx_sdus_count: usize,

    /// PDUs rejected by the reception admission rule (duplicates and
    /// window-stale arrivals).
    pub rx_pdus_discarded: usize,

    /// SDU fragments dropped during reassembly: orphan tails after a gap and
    /// partial SDUs invalidated by one.
    pub rx_fragments_discarded: usize,

    /// Malformed PDUs and impossible framing combinations. Logged and
    /// dropped without touching reassembly state.
    pub rx_protocol_violations: usize,
}

/// The service access points of an UM RLC entity.
///
/// The transmitting side accepts PDCP PDUs (RLC SDUs) from the upper layer
/// and packs them into byte-budgeted UMD PDUs when the MAC scheduler offers
/// a transmission opportunity. The receiving side reorders incoming PDUs
/// within a sliding window, reassembles SDUs across PDU boundaries and
/// delivers them upward in order.
///
/// The entity is single-threaded and entirely caller-driven: it performs no
/// I/O, spawns no tasks and reads no clock. Outputs are buffered as
/// [`EntityEvent`]s; the caller must drain them with
/// [`UmRlcEntity::poll_event`] and drive time with
/// [`UmRlcEntity::advance_time`] whenever the instant returned by
/// [`UmRlcEntity::poll_timeout`] is reached.
pub trait UmRlcEntity {
    /// Returns the next generated event, if any.
    fn poll_event(&mut self) -> Option<EntityEvent>;

    /// Accepts one RLC SDU (a PDCP PDU) for transmission.
    ///
    /// The SDU is queued; a [`EntityEvent::BufferStatus`] event is generated
    /// so the MAC scheduler learns about the pending data. Empty SDUs are
    /// rejected with a warning.
    fn transmit_sdu(&mut self, sdu: Vec<u8>);

    /// Notification from MAC that `bytes` bytes may be transmitted now.
    ///
    /// Builds at most one UMD PDU - concatenating and/or segmenting queued
    /// SDUs to fill the budget - and emits it as
    /// [`EntityEvent::TransmitPdu`]. An opportunity of two bytes or less
    /// cannot fit any data behind the fixed header and is ignored; this is a
    /// legal null response, not an error.
    fn notify_tx_opportunity(&mut self, bytes: u32);

    /// Notification from MAC that a HARQ delivery failed. UM performs no
    /// retransmission, so this is a no-op.
    fn notify_harq_failure(&mut self);

    /// Delivers one UMD PDU received from MAC.
    ///
    /// `sent_at` is the egress timestamp travelling beside the PDU (see
    /// [`OutboundPdu::sent_at`]), used only for delay accounting.
    fn receive_pdu(&mut self, pdu: &[u8], sent_at: Option<EntityTime>);

    /// Advances the internal clock, firing the reordering timer if its
    /// expiry has been reached. Time moving backwards is ignored.
    fn advance_time(&mut self, now: EntityTime);

    /// Returns the next instant at which [`UmRlcEntity::advance_time`] must
    /// be called, clamped to the current time, or
    /// [`EntityTime::infinite_future`] when no timer is running.
    fn poll_timeout(&self) -> EntityTime;

    /// Closes the entity: the reordering timer is cancelled and buffered
    /// data - including a partially reassembled SDU - is dropped silently.
    /// All further operations are ignored.
    fn close(&mut self);

    fn config(&self) -> Config;

    fn metrics(&self) -> Metrics;
}
