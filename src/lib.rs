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

use crate::api::Config;
use crate::api::UmRlcEntity;

pub mod api;

pub(crate) mod entity;
pub(crate) mod events;
pub(crate) mod packet;
pub(crate) mod rx;
pub(crate) mod timer;
pub(crate) mod tx;
pub(crate) mod types;

trait EventSink {
    fn add(&mut self, event: api::EntityEvent);
    fn next_event(&mut self) -> Option<api::EntityEvent>;
}

#[cfg(test)]
pub(crate) mod testing;

/// Returns the version of this crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Creates a new UM RLC entity.
///
/// The provided `name` is only used for logging to identify this entity.
pub fn new_entity(name: &str, config: &Config) -> Box<dyn UmRlcEntity> {
    Box::new(entity::Entity::new(name, config))
}

pub(crate) mod logging {
    #[cfg(not(test))]
    use log::info;
    use std::fmt::Write;
    #[cfg(test)]
    use std::println as info;
    use std::time::Duration;

    pub fn log_pdu(name: &str, ts: Duration, sent: bool, data: &[u8]) {
        let s = data.iter().fold(String::new(), |mut output, c| {
            let _ = write!(output, " {c:02x}");
            output
        });
        let prefix = if sent { "O" } else { "I" };
        let mut remaining = (ts.as_millis() % (24 * 60 * 60 * 1000)) as u64;
        let hours = remaining / (60 * 60 * 1000);
        remaining %= 60 * 60 * 1000;
        let minutes = remaining / (60 * 1000);
        remaining %= 60 * 1000;
        let seconds = remaining / 1000;
        let ms = remaining % 1000;
        info!(
            "{} {:02}:{:02}:{:02}.{:03}{} # RLC_PDU {}",
            prefix, hours, minutes, seconds, ms, s, name
        );
    }
}
