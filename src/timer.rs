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
use std::time::Duration;

/// A single-shot, cancellable timer over virtual entity time.
///
/// The timer holds no callback: the owner queries [`Timer::expire`] when the
/// clock advances and performs the expiry actions itself. Starting an
/// already-running timer restarts it; stopping is idempotent. A scheduled
/// instant that is already in the past when `expire` runs is legal and fires
/// immediately.
pub struct Timer {
    duration: Duration,
    next_expiry: Option<EntityTime>,
}

impl Timer {
    /// Creates a new timer with the provided duration. The timer is created
    /// stopped.
    pub fn new(duration: Duration) -> Self {
        Self { duration, next_expiry: None }
    }

    /// Starts (or restarts) the timer, to expire `duration` from `now`.
    pub fn start(&mut self, now: EntityTime) {
        self.next_expiry = Some(now + self.duration);
    }

    /// Stops the timer. Does nothing if it is not running.
    pub fn stop(&mut self) {
        self.next_expiry = None;
    }

    /// Returns true if the timer was running and its expiry time has been
    /// reached. This method is not idempotent - a timer that fires is
    /// stopped, and returns true at most once per `start`.
    pub fn expire(&mut self, now: EntityTime) -> bool {
        let Some(expiry) = self.next_expiry else {
            return false;
        };

        if expiry > now {
            return false;
        }

        self.next_expiry = None;
        true
    }

    pub fn next_expiry(&self) -> Option<EntityTime> {
        self.next_expiry
    }

    pub fn is_running(&self) -> bool {
        self.next_expiry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_TIME: EntityTime = EntityTime::zero();

    #[test]
    fn new_timer_is_not_running() {
        let t = Timer::new(Duration::from_millis(1000));
        assert!(!t.is_running());
        assert!(t.next_expiry().is_none());
    }

    #[test]
    fn stopped_timer_does_not_expire() {
        let mut t = Timer::new(Duration::from_millis(1000));
        let now = START_TIME;
        t.start(now);
        t.stop();
        assert!(!t.expire(now + Duration::from_millis(1000)));
    }

    #[test]
    fn timer_expires_after_duration() {
        let mut t = Timer::new(Duration::from_millis(1000));

        let now = START_TIME;
        t.start(now);
        assert!(t.is_running());
        assert!(!t.expire(now + Duration::from_millis(999)));
        assert!(t.expire(now + Duration::from_millis(1000)));
    }

    #[test]
    fn timer_fires_at_most_once_per_start() {
        let mut t = Timer::new(Duration::from_millis(1000));

        let now = START_TIME;
        t.start(now);
        assert!(t.expire(now + Duration::from_millis(1000)));
        assert!(!t.is_running());
        assert!(!t.expire(now + Duration::from_millis(2000)));
    }

    #[test]
    fn timer_fires_when_expiry_is_in_the_past() {
        let mut t = Timer::new(Duration::from_millis(1000));

        let now = START_TIME;
        t.start(now);
        assert!(t.expire(now + Duration::from_millis(5000)));
    }

    #[test]
    fn starting_a_running_timer_restarts_it() {
        let mut t = Timer::new(Duration::from_millis(1000));

        let now = START_TIME;
        t.start(now);
        t.start(now + Duration::from_millis(500));
        assert!(!t.expire(now + Duration::from_millis(1000)));
        assert_eq!(t.next_expiry(), Some(now + Duration::from_millis(1500)));
        assert!(t.expire(now + Duration::from_millis(1500)));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut t = Timer::new(Duration::from_millis(1000));
        t.stop();
        t.stop();
        assert!(!t.is_running());
    }
}
