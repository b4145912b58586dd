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
use crate::timer::Timer;
use crate::types::SeqWindow;
use crate::types::Sn;
#[cfg(not(test))]
use log::debug;
use std::collections::HashMap;
#[cfg(test)]
use std::println as debug;
use std::time::Duration;

/// The reception side of the entity up to - but not including - reassembly:
/// a buffer of out-of-order PDUs, the three receive state variables and the
/// t-Reordering timer.
///
/// From TS 36.322, section 7.1:
/// - VR(UR): SN of the earliest PDU still considered for reordering.
/// - VR(UX): SN following the PDU that triggered t-Reordering.
/// - VR(UH): SN following the highest SN received.
///
/// PDUs are stored unparsed; the methods return the PDUs that have left the
/// reordering process, in the order the reassembler must consume them.
pub struct ReorderWindow {
    window: SeqWindow,
    buffer: HashMap<Sn, Vec<u8>>,
    vr_ur: Sn,
    vr_ux: Sn,
    vr_uh: Sn,
    reordering_timer: Timer,
}

impl ReorderWindow {
    pub fn new(window: SeqWindow, t_reordering: Duration) -> Self {
        Self {
            window,
            buffer: HashMap::new(),
            vr_ur: Sn(0),
            vr_ux: Sn(0),
            vr_uh: Sn(0),
            reordering_timer: Timer::new(t_reordering),
        }
    }

    #[cfg(test)]
    pub fn vr_ur(&self) -> Sn {
        self.vr_ur
    }

    #[cfg(test)]
    pub fn vr_ux(&self) -> Sn {
        self.vr_ux
    }

    #[cfg(test)]
    pub fn vr_uh(&self) -> Sn {
        self.vr_uh
    }

    #[cfg(test)]
    pub fn buffered_pdus(&self) -> usize {
        self.buffer.len()
    }

    #[cfg(test)]
    pub fn is_timer_running(&self) -> bool {
        self.reordering_timer.is_running()
    }

    pub fn next_timeout(&self) -> Option<EntityTime> {
        self.reordering_timer.next_expiry()
    }

    /// Cancels the reordering timer and drops all buffered PDUs.
    pub fn stop(&mut self) {
        self.reordering_timer.stop();
        self.buffer.clear();
    }

    /// Handles one PDU with SN = `sn` arriving from the lower layer.
    ///
    /// Returns `None` when the admission rule discards the PDU, otherwise
    /// the (possibly empty) list of PDUs released for reassembly by this
    /// arrival.
    pub fn handle_pdu(&mut self, now: EntityTime, sn: Sn, pdu: Vec<u8>) -> Option<Vec<Vec<u8>>> {
        let w = self.window;
        let base = w.lower_edge(self.vr_uh);
        debug!(
            "RX SN = {}, VR(UR) = {}, VR(UX) = {}, VR(UH) = {}",
            sn, self.vr_ur, self.vr_ux, self.vr_uh
        );

        // TS 36.322, 5.1.2.2.2: discard a duplicate of a PDU still being
        // reordered (VR(UR) < x < VR(UH)), or a PDU the window has already
        // slid past ((VR(UH) - W) <= x < VR(UR)).
        let duplicate = w.offset(base, self.vr_ur) < w.offset(base, sn)
            && w.offset(base, sn) < w.offset(base, self.vr_uh)
            && self.buffer.contains_key(&sn);
        let slid_past = w.offset(base, sn) < w.offset(base, self.vr_ur);
        if duplicate || slid_past {
            debug!("UMD PDU discarded");
            return None;
        }
        self.buffer.insert(sn, pdu);

        // TS 36.322, 5.1.2.2.3.
        let mut released: Vec<Vec<u8>> = Vec::new();
        if !w.contains(self.vr_uh, sn) {
            self.vr_uh = w.next(sn);
            // All buffered SNs predate the new VR(UH), so the pre-slide
            // lower edge anchors their relative order.
            self.drain_outside_window(base, &mut released);
            if !w.contains(self.vr_uh, self.vr_ur) {
                self.vr_ur = w.lower_edge(self.vr_uh);
            }
        }

        if self.buffer.contains_key(&self.vr_ur) {
            let mut new_vr_ur = w.next(self.vr_ur);
            while self.buffer.contains_key(&new_vr_ur) {
                new_vr_ur = w.next(new_vr_ur);
            }
            self.vr_ur = new_vr_ur;
            self.drain_below(self.vr_ur, &mut released);
        }

        if self.reordering_timer.is_running() {
            let base = w.lower_edge(self.vr_uh);
            if w.offset(base, self.vr_ux) <= w.offset(base, self.vr_ur)
                || (!w.contains(self.vr_uh, self.vr_ux) && self.vr_ux != self.vr_uh)
            {
                debug!("Stop reordering timer");
                self.reordering_timer.stop();
            }
        }
        if !self.reordering_timer.is_running() && self.vr_uh != self.vr_ur {
            debug!("Start reordering timer, VR(UX) = {}", self.vr_uh);
            self.reordering_timer.start(now);
            self.vr_ux = self.vr_uh;
        }

        debug_assert!(self.buffer.keys().all(|k| w.contains(self.vr_uh, *k)));
        Some(released)
    }

    /// Fires the t-Reordering expiry actions if the timer is due.
    ///
    /// Returns the PDUs released for reassembly. TS 36.322, 5.1.2.2.4:
    /// advance VR(UR) to the first SN >= VR(UX) not yet received, release
    /// everything below it, and re-arm while a gap remains.
    pub fn handle_timeout(&mut self, now: EntityTime) -> Vec<Vec<u8>> {
        if !self.reordering_timer.expire(now) {
            return Vec::new();
        }
        debug!("Reordering timer expired, VR(UX) = {}", self.vr_ux);

        let w = self.window;
        let mut new_vr_ur = self.vr_ux;
        while self.buffer.contains_key(&new_vr_ur) {
            new_vr_ur = w.next(new_vr_ur);
        }
        self.vr_ur = new_vr_ur;

        let mut released = Vec::new();
        self.drain_below(self.vr_ur, &mut released);

        if self.vr_uh != self.vr_ur {
            debug!("Restart reordering timer, VR(UX) = {}", self.vr_uh);
            self.reordering_timer.start(now);
            self.vr_ux = self.vr_uh;
        }
        released
    }

    /// Removes all buffered PDUs now outside the reordering window, in
    /// ascending SN order as seen from `base` (the window edge before the
    /// slide), and appends them to `released`.
    fn drain_outside_window(&mut self, base: Sn, released: &mut Vec<Vec<u8>>) {
        let w = self.window;
        let mut stale: Vec<Sn> =
            self.buffer.keys().copied().filter(|sn| !w.contains(self.vr_uh, *sn)).collect();
        stale.sort_unstable_by_key(|sn| w.offset(base, *sn));
        for sn in stale {
            debug!("Released outside window: SN = {}", sn);
            released.push(self.buffer.remove(&sn).unwrap());
        }
    }

    /// Removes all buffered PDUs with SN < `limit` (anchored at the window
    /// edge) in ascending SN order and appends them to `released`.
    fn drain_below(&mut self, limit: Sn, released: &mut Vec<Vec<u8>>) {
        let w = self.window;
        let base = w.lower_edge(self.vr_uh);
        let mut ready: Vec<Sn> = self
            .buffer
            .keys()
            .copied()
            .filter(|sn| w.offset(base, *sn) < w.offset(base, limit))
            .collect();
        ready.sort_unstable_by_key(|sn| w.offset(base, *sn));
        for sn in ready {
            debug!("Released in sequence: SN = {}", sn);
            released.push(self.buffer.remove(&sn).unwrap());
        }
    }
}
