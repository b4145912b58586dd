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

#[macro_export]
macro_rules! expect_event_1 {
    ($event:expr, $event_type:ident) => {
        match $event {
            None => panic!("No event emitted"),
            Some(e) => match (e) {
                $crate::api::EntityEvent::$event_type(d) => d,
                _ => panic!("Expected {}, got {:?}", stringify!($event_type), e),
            },
        }
    };
}

macro_rules! expect_transmit_pdu {
    ($event:expr) => {
        crate::expect_event_1!($event, TransmitPdu)
    };
}

macro_rules! expect_deliver_sdu {
    ($event:expr) => {
        crate::expect_event_1!($event, DeliverSdu)
    };
}

macro_rules! expect_buffer_status {
    ($event:expr) => {
        crate::expect_event_1!($event, BufferStatus)
    };
}

macro_rules! expect_no_event {
    ($event:expr) => {
        match $event {
            None => {}
            Some(e) => panic!("Expected no event, got {:?}", e),
        }
    };
}

pub(crate) use expect_buffer_status;
pub(crate) use expect_deliver_sdu;
pub(crate) use expect_no_event;
pub(crate) use expect_transmit_pdu;
