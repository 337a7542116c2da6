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

//! Buffer interchange between hardware codec blocks and client-visible flat images.
//!
//! Hardware graphic and linear blocks are wrapped by the types in [`buffers`]. Graphic views are
//! exposed to clients as a [`image::MediaImage`] described flat buffer, either by wrapping the
//! mapped memory directly or by copying into a backing buffer (see [`reformat::converter`]).

#[macro_use]
mod internal_utils;

pub mod buffers;
pub mod byte_buffer;
pub mod format;
pub mod hardware;
pub mod image;
pub mod layout;
pub mod pool;
pub mod reformat;
pub mod utils;

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferError {
    BadValue,
    NoMemory,
    MapFailed,
    TimedOut,
    Unsupported,
    Corrupted,
    NotInitialized,
    UnknownError(String),
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::BadValue => write!(f, "bad value"),
            BufferError::NoMemory => write!(f, "no memory"),
            BufferError::MapFailed => write!(f, "mapping failed"),
            BufferError::TimedOut => write!(f, "timed out"),
            BufferError::Unsupported => write!(f, "unsupported configuration"),
            BufferError::Corrupted => write!(f, "corrupted source"),
            BufferError::NotInitialized => write!(f, "not initialized"),
            BufferError::UnknownError(message) => write!(f, "unknown error: {message}"),
        }
    }
}

impl std::error::Error for BufferError {}

pub type BufferResult<T> = Result<T, BufferError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum YuvRange {
    Limited,
    #[default]
    Full,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatrixCoefficients {
    #[default]
    Bt601,
    Bt709,
}

/// Dimensions and position of a rectangular region of a graphic allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }

    pub fn at(self, left: u32, top: u32) -> Self {
        Self { left, top, ..self }
    }

    pub(crate) fn fits_in(&self, width: u32, height: u32) -> bool {
        match (
            self.left.checked_add(self.width),
            self.top.checked_add(self.height),
        ) {
            (Some(right), Some(bottom)) => right <= width && bottom <= height,
            _ => false,
        }
    }
}
