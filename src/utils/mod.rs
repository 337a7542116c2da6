// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub(crate) mod error;

use crate::*;

/// Rounds `value` up to the next multiple of `alignment`, which must be a power of two.
pub fn align(value: u32, alignment: u32) -> BufferResult<u32> {
    Ok(checked_add!(value, alignment - 1)? & !(alignment - 1))
}

pub const fn div_up(value: u32, divisor: u32) -> u32 {
    value.div_ceil(divisor)
}
