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

//! Client-visible buffers wrapping hardware blocks.
//!
//! Every wrapper exposes a flat [`ByteBuffer`] with a visible range, can tell whether a
//! [`HardwareBuffer`] produced by the codec can be copied into it, and converts itself back into a
//! [`HardwareBuffer`] for the codec. Hardware references are dropped with
//! [`Codec2Buffer::clear_hardware_references`], independently of the wrapper's own lifetime.

pub mod dummy;
pub mod encrypted;
pub mod graphic;
pub mod linear;

pub use dummy::DummyContainerBuffer;
pub use encrypted::*;
pub use graphic::*;
pub use linear::*;

use crate::byte_buffer::*;
use crate::format::*;
use crate::hardware::HardwareBuffer;
use crate::image::MediaImage;
use crate::*;

use std::sync::Arc;

/// State shared by all wrappers.
#[derive(Debug, Default)]
pub struct BufferCore {
    format: MediaFormat,
    buffer: ByteBuffer,
    image_data: Option<MediaImage>,
}

impl BufferCore {
    pub(crate) fn new(format: MediaFormat, buffer: ByteBuffer) -> Self {
        Self {
            format,
            buffer,
            image_data: None,
        }
    }

    /// Checks whether `source` can be copied with [`BufferCore::copy_linear`].
    pub(crate) fn can_copy_linear(&self, source: Option<&Arc<HardwareBuffer>>) -> bool {
        if !self.buffer.has_base() {
            return false;
        }
        let source = match source {
            // Nothing to copy, so we can copy by doing nothing.
            None => return true,
            Some(source) => source,
        };
        if !matches!(source.data(), crate::hardware::BufferData::Linear(_)) {
            return false;
        }
        match source.linear_blocks() {
            [] => true,
            [block] => block.size() <= self.buffer.capacity(),
            // More than one block cannot be copied.
            _ => false,
        }
    }

    /// Copies the single linear block of `source` to the start of the buffer.
    pub(crate) fn copy_linear(&mut self, source: Option<&Arc<HardwareBuffer>>) -> BufferResult<()> {
        if source.is_some_and(|source| source.linear_blocks().len() > 1) {
            log::debug!("cannot copy more than one linear block");
            return BufferError::bad_value();
        }
        let block = match source.and_then(|source| source.linear_blocks().first()) {
            Some(block) if block.size() > 0 => block,
            _ => return self.buffer.set_range(0, 0),
        };
        let view = block.map().map_err(|err| {
            log::debug!("error while mapping: {err}");
            err
        })?;
        if view.capacity() > self.buffer.capacity() {
            log::error!(
                "linear block lied, it does not fit: view({}) > this({})",
                view.capacity(),
                self.buffer.capacity()
            );
            return BufferError::corrupted();
        }
        let length = view.capacity();
        match self.buffer.storage() {
            // The source may be a window into the same allocation.
            Storage::Region(region) if !self.buffer.is_read_only() => {
                region.copy_from(0, view.region(), 0, length)?
            }
            _ => self.buffer.base_mut()?[..length].copy_from_slice(&view.data()),
        }
        self.buffer.set_range(0, length)
    }
}

pub trait Codec2Buffer {
    fn core(&self) -> &BufferCore;
    fn core_mut(&mut self) -> &mut BufferCore;

    fn format(&self) -> &MediaFormat {
        &self.core().format
    }

    fn buffer(&self) -> &ByteBuffer {
        &self.core().buffer
    }

    fn base(&self) -> BufferRef<'_> {
        self.core().buffer.base()
    }

    fn base_mut(&mut self) -> BufferResult<BufferMut<'_>> {
        self.core_mut().buffer.base_mut()
    }

    fn capacity(&self) -> usize {
        self.core().buffer.capacity()
    }

    fn offset(&self) -> usize {
        self.core().buffer.offset()
    }

    fn size(&self) -> usize {
        self.core().buffer.size()
    }

    fn set_range(&mut self, offset: usize, size: usize) -> BufferResult<()> {
        self.core_mut().buffer.set_range(offset, size)
    }

    /// The visible range.
    fn data(&self) -> BufferRef<'_> {
        self.core().buffer.data()
    }

    fn image_data(&self) -> Option<&MediaImage> {
        self.core().image_data.as_ref()
    }

    /// Attaches the plane layout of the buffer contents. The serialized layout is also published
    /// in the format under [`KEY_IMAGE_DATA`].
    fn set_image_data(&mut self, image_data: MediaImage) {
        let core = self.core_mut();
        core.format.set_buffer(KEY_IMAGE_DATA, image_data.to_bytes());
        core.image_data = Some(image_data);
    }

    /// Returns true if [`Codec2Buffer::copy`] is expected to succeed for `source`. Does not
    /// modify the buffer.
    fn can_copy(&self, _source: Option<&Arc<HardwareBuffer>>) -> bool {
        false
    }

    /// Copies the contents of `source` into this buffer. The visible range is only updated on
    /// success.
    fn copy(&mut self, _source: Option<&Arc<HardwareBuffer>>) -> BufferResult<()> {
        BufferError::unsupported()
    }

    /// The hardware buffer to hand back to the codec, reflecting anything written into this
    /// buffer. None once the hardware references have been cleared.
    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        None
    }

    /// Drops the references to hardware memory held by this buffer. Idempotent.
    fn clear_hardware_references(&mut self) {}
}
