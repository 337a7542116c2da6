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

use crate::*;

macro_rules! checked_add {
    ($a:expr, $b:expr) => {
        $a.checked_add($b).ok_or(BufferError::BadValue)
    };
}

macro_rules! checked_mul {
    ($a:expr, $b:expr) => {
        $a.checked_mul($b).ok_or(BufferError::BadValue)
    };
}

pub(crate) fn usize_from_u32(value: u32) -> BufferResult<usize> {
    usize::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn usize_from_isize(value: isize) -> BufferResult<usize> {
    usize::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn isize_from_usize(value: usize) -> BufferResult<isize> {
    isize::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn isize_from_i32(value: i32) -> BufferResult<isize> {
    isize::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn isize_from_u32(value: u32) -> BufferResult<isize> {
    isize::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn u32_from_usize(value: usize) -> BufferResult<u32> {
    u32::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn u32_from_isize(value: isize) -> BufferResult<u32> {
    u32::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn u64_from_usize(value: usize) -> BufferResult<u64> {
    u64::try_from(value).or(Err(BufferError::BadValue))
}

pub(crate) fn i32_from_u32(value: u32) -> BufferResult<i32> {
    i32::try_from(value).or(Err(BufferError::BadValue))
}

/// Allocates a zero-filled vector without aborting the process on allocation failure.
pub(crate) fn create_vec_exact(size: usize) -> BufferResult<Vec<u8>> {
    let mut v = Vec::<u8>::new();
    if v.try_reserve_exact(size).is_err() {
        return BufferError::no_memory();
    }
    v.resize(size, 0);
    Ok(v)
}
