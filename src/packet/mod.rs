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

use thiserror::Error;

pub(crate) mod umd_pdu;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum HeaderParseError {
    #[error("The PDU is shorter than its header claims")]
    InvalidLength,

    #[error("A length indicator does not fit the remaining payload")]
    InvalidLengthIndicator,

    #[error("Invalid value")]
    InvalidValue,
}
