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

/// UMD PDU Sequence Number (SN).
///
/// A 10-bit identifier living in a wrapping number space. There is
/// deliberately no `Ord` implementation: two SNs can only be compared
/// relative to an anchor, which is what [`SeqWindow::offset`] provides.
/// Raw `<` on wrapping SNs is only meaningful within a contiguous range
/// that is already known to lie inside one window.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Sn(pub u16);

impl fmt::Debug for Sn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Sn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Modular sequence-number arithmetic and the reordering window membership
/// test.
///
/// From 3GPP TS 36.322, section 5.1.2.2.1:
///
///   The receiving UM RLC entity shall maintain a reordering window
///   according to state variable VR(UH) as follows:
///   - a SN falls within the reordering window if
///     (VR(UH) - UM_Window_Size) <= SN < VR(UH);
///   - a SN falls outside of the reordering window otherwise.
///
/// All arithmetic is modulo `modulus` (1024 for the 10-bit SN space), with
/// the window anchored at its lower edge `VR(UH) - window_size`.
#[derive(Clone, Copy, Debug)]
pub struct SeqWindow {
    modulus: u16,
    window_size: u16,
}

impl SeqWindow {
    pub fn new(modulus: u16, window_size: u16) -> Self {
        debug_assert!(modulus.is_power_of_two());
        debug_assert!(window_size < modulus);
        Self { modulus, window_size }
    }

    pub fn add(&self, sn: Sn, n: u16) -> Sn {
        Sn(sn.0.wrapping_add(n) % self.modulus)
    }

    pub fn sub(&self, sn: Sn, n: u16) -> Sn {
        Sn(sn.0.wrapping_sub(n) % self.modulus)
    }

    pub fn next(&self, sn: Sn) -> Sn {
        self.add(sn, 1)
    }

    /// Distance from `base` to `x`, walking forward along the modular
    /// circle. This is the only sanctioned way to order two SNs: anchor
    /// both at a common base and compare the offsets.
    pub fn offset(&self, base: Sn, x: Sn) -> u16 {
        x.0.wrapping_sub(base.0) % self.modulus
    }

    /// Lower edge of the reordering window for the given VR(UH).
    pub fn lower_edge(&self, high: Sn) -> Sn {
        self.sub(high, self.window_size)
    }

    /// Whether `x` falls within the reordering window `[high - W, high)`.
    pub fn contains(&self, high: Sn, x: Sn) -> bool {
        self.offset(self.lower_edge(high), x) < self.window_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: SeqWindow = SeqWindow { modulus: 1024, window_size: 512 };

    #[test]
    fn add_and_sub_wrap() {
        assert_eq!(WINDOW.add(Sn(0), 1), Sn(1));
        assert_eq!(WINDOW.add(Sn(1023), 1), Sn(0));
        assert_eq!(WINDOW.add(Sn(1000), 100), Sn(76));
        assert_eq!(WINDOW.sub(Sn(0), 1), Sn(1023));
        assert_eq!(WINDOW.sub(Sn(76), 100), Sn(1000));
        assert_eq!(WINDOW.next(Sn(1023)), Sn(0));
    }

    #[test]
    fn offset_is_forward_distance() {
        assert_eq!(WINDOW.offset(Sn(0), Sn(0)), 0);
        assert_eq!(WINDOW.offset(Sn(0), Sn(100)), 100);
        assert_eq!(WINDOW.offset(Sn(1000), Sn(10)), 34);
        assert_eq!(WINDOW.offset(Sn(10), Sn(1000)), 990);
        assert_eq!(WINDOW.offset(Sn(5), Sn(4)), 1023);
    }

    #[test]
    fn window_membership() {
        // VR(UH) = 512: window is [0, 512).
        assert!(WINDOW.contains(Sn(512), Sn(0)));
        assert!(WINDOW.contains(Sn(512), Sn(511)));
        assert!(!WINDOW.contains(Sn(512), Sn(512)));
        assert!(!WINDOW.contains(Sn(512), Sn(1023)));
    }

    #[test]
    fn window_membership_wraps() {
        // VR(UH) = 5: window is [517, 1024) and [0, 5).
        assert!(WINDOW.contains(Sn(5), Sn(517)));
        assert!(WINDOW.contains(Sn(5), Sn(1023)));
        assert!(WINDOW.contains(Sn(5), Sn(0)));
        assert!(WINDOW.contains(Sn(5), Sn(4)));
        assert!(!WINDOW.contains(Sn(5), Sn(5)));
        assert!(!WINDOW.contains(Sn(5), Sn(516)));
        assert!(!WINDOW.contains(Sn(5), Sn(100)));
    }

    #[test]
    fn lower_edge_wraps() {
        assert_eq!(WINDOW.lower_edge(Sn(512)), Sn(0));
        assert_eq!(WINDOW.lower_edge(Sn(5)), Sn(517));
        assert_eq!(WINDOW.lower_edge(Sn(0)), Sn(512));
    }

    #[test]
    fn small_window_for_tests() {
        // The sizing constants are configurable so tests can exercise the
        // wrap with a tiny number space.
        let w = SeqWindow::new(16, 8);
        assert_eq!(w.add(Sn(15), 1), Sn(0));
        assert!(w.contains(Sn(4), Sn(12)));
        assert!(!w.contains(Sn(4), Sn(4)));
        assert!(!w.contains(Sn(4), Sn(11)));
    }
}
