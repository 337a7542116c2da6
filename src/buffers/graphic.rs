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

use crate::buffers::*;
use crate::byte_buffer::ByteBuffer;
use crate::format::*;
use crate::hardware::*;
use crate::image::MediaImage;
use crate::internal_utils::*;
use crate::reformat::converter::GraphicViewConverter;
use crate::reformat::copy::*;
use crate::utils::align;
use crate::*;

use std::sync::Arc;

// Exposes `view` as a flat buffer, either by wrapping it or through a back buffer obtained from
// `alloc`. The back buffer is filled from the view when `fill` is set.
fn convert<F>(
    view: &GraphicView,
    format: &MediaFormat,
    fill: bool,
    alloc: F,
) -> BufferResult<(ByteBuffer, MediaImage, bool)>
where
    F: FnOnce(usize) -> Option<ByteBuffer>,
{
    let mut converter = GraphicViewConverter::new(view, format, false);
    converter.init_check().map_err(|err| {
        log::debug!("converter init failed: {err}");
        err
    })?;
    if let Some(wrapped) = converter.wrap() {
        return Ok((wrapped, *converter.image_data(), true));
    }
    let back_buffer = match alloc(converter.back_buffer_size()) {
        Some(back_buffer) => back_buffer,
        None => {
            log::debug!(
                "failed to allocate a back buffer of {} bytes",
                converter.back_buffer_size()
            );
            return BufferError::no_memory();
        }
    };
    converter.set_back_buffer(back_buffer)?;
    if fill {
        converter.copy_to_media_image()?;
    }
    let image = *converter.image_data();
    match converter.take_back_buffer() {
        Some(back_buffer) => Ok((back_buffer, image, false)),
        None => BufferError::unknown_error("back buffer disappeared"),
    }
}

/// A writable graphic block exposed as a flat image. When the block cannot be wrapped, writes go
/// to a back buffer and reach the block in [`Codec2Buffer::to_hardware_buffer`].
pub struct GraphicBlockBuffer {
    core: BufferCore,
    view: Option<GraphicView>,
    block: Option<GraphicBlock>,
    wrapped: bool,
}

impl GraphicBlockBuffer {
    pub fn allocate<F>(format: MediaFormat, block: GraphicBlock, alloc: F) -> BufferResult<Self>
    where
        F: FnOnce(usize) -> Option<ByteBuffer>,
    {
        let view = block.map()?;
        let (buffer, image, wrapped) = convert(&view, &format, false, alloc)?;
        let mut this = Self {
            core: BufferCore::new(format, buffer),
            view: Some(view),
            block: Some(block),
            wrapped,
        };
        this.set_image_data(image);
        Ok(this)
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }
}

impl Codec2Buffer for GraphicBlockBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        let block = self.block.as_ref()?;
        let view = self.view.as_mut()?;
        if !self.wrapped {
            if let Some(image) = self.core.image_data.as_ref() {
                if let Err(err) = copy_image_to_view(view, &self.core.buffer.base(), image) {
                    log::warn!("GraphicBlockBuffer::to_hardware_buffer: copy failed: {err}");
                }
            }
        }
        match block.share(view.crop(), Fence::signaled()) {
            Ok(shared) => Some(HardwareBuffer::create_graphic_buffer(shared)),
            Err(err) => {
                log::debug!("cannot share graphic block: {err}");
                None
            }
        }
    }

    fn clear_hardware_references(&mut self) {
        self.view = None;
        self.block = None;
        if self.wrapped {
            self.core.buffer.release();
        }
    }
}

/// A read-only flat image of a graphic block produced by the codec.
pub struct ConstGraphicBlockBuffer {
    core: BufferCore,
    // Keeps the mapping alive while the buffer wraps it.
    view: Option<GraphicView>,
    buffer_ref: Option<Arc<HardwareBuffer>>,
    wrapped: bool,
}

impl ConstGraphicBlockBuffer {
    pub fn allocate<F>(format: MediaFormat, buffer: Arc<HardwareBuffer>, alloc: F) -> BufferResult<Self>
    where
        F: FnOnce(usize) -> Option<ByteBuffer>,
    {
        let block = match (buffer.data(), buffer.graphic_blocks()) {
            (BufferData::Graphic(_), [block]) => block,
            _ => {
                log::warn!(
                    "ConstGraphicBlockBuffer::allocate: # graphic blocks={}",
                    buffer.graphic_blocks().len()
                );
                return BufferError::bad_value();
            }
        };
        let view = block.map()?;
        let (byte_buffer, image, wrapped) = convert(&view, &format, true, alloc)?;
        let mut this = Self {
            core: BufferCore::new(format, byte_buffer),
            view: if wrapped { Some(view) } else { None },
            buffer_ref: Some(buffer),
            wrapped,
        };
        this.set_image_data(image);
        Ok(this)
    }

    /// Creates an empty buffer large enough for a 4:2:0 image of the size in `format`, to be
    /// filled later with [`Codec2Buffer::copy`].
    pub fn allocate_empty<F>(format: MediaFormat, alloc: F) -> BufferResult<Self>
    where
        F: FnOnce(usize) -> Option<ByteBuffer>,
    {
        let (width, height) = match (format.width(), format.height()) {
            (Some(width), Some(height)) => (width, height),
            _ => {
                log::warn!("ConstGraphicBlockBuffer::allocate_empty: width or height missing");
                return BufferError::bad_value();
            }
        };
        let bits_per_pixel: usize = match format.color_format() {
            ColorFormat::YuvP010 => 24,
            _ => 12,
        };
        let size = checked_mul!(
            usize_from_u32(align(width, 16)?)?,
            usize_from_u32(align(height, 16)?)?
        )?;
        let size = checked_mul!(size, bits_per_pixel)? / 8;
        let buffer = match alloc(size) {
            Some(buffer) => buffer,
            None => {
                log::debug!("failed to allocate {size} bytes");
                return BufferError::no_memory();
            }
        };
        Ok(Self {
            core: BufferCore::new(format, buffer),
            view: None,
            buffer_ref: None,
            wrapped: false,
        })
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    // The single graphic block of `source`, or None when there is nothing to copy.
    fn source_block(source: Option<&Arc<HardwareBuffer>>) -> BufferResult<Option<&ConstGraphicBlock>> {
        let source = match source {
            None => return Ok(None),
            Some(source) => source,
        };
        if !matches!(source.data(), BufferData::Graphic(_)) {
            return BufferError::bad_value();
        }
        match source.graphic_blocks() {
            [] => Ok(None),
            [block] => Ok(Some(block)),
            _ => BufferError::bad_value(),
        }
    }
}

impl Codec2Buffer for ConstGraphicBlockBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn can_copy(&self, source: Option<&Arc<HardwareBuffer>>) -> bool {
        if self.wrapped || self.buffer_ref.is_some() || !self.core.buffer.has_base() {
            log::trace!(
                "ConstGraphicBlockBuffer::can_copy: wrapped={} buffer_ref={}",
                self.wrapped,
                self.buffer_ref.is_some()
            );
            return false;
        }
        let block = match Self::source_block(source) {
            Ok(Some(block)) => block,
            Ok(None) => return true,
            Err(_) => return false,
        };
        let view = match block.map() {
            Ok(view) => view,
            Err(_) => return false,
        };
        let converter = GraphicViewConverter::new(&view, &self.core.format, true);
        converter.init_check().is_ok() && converter.back_buffer_size() <= self.core.buffer.capacity()
    }

    fn copy(&mut self, source: Option<&Arc<HardwareBuffer>>) -> BufferResult<()> {
        let block = match Self::source_block(source)? {
            Some(block) => block,
            None => return self.core.buffer.set_range(0, 0),
        };
        let view = block.map()?;
        let converter = GraphicViewConverter::new(&view, &self.core.format, true);
        converter.init_check()?;
        let size = converter.back_buffer_size();
        if size > self.core.buffer.capacity() {
            log::debug!(
                "ConstGraphicBlockBuffer::copy: {size} bytes do not fit in {}",
                self.core.buffer.capacity()
            );
            return BufferError::no_memory();
        }
        if self.core.buffer.shares_memory_with(view.memory()) {
            log::debug!("ConstGraphicBlockBuffer::copy: source aliases the destination");
            return BufferError::bad_value();
        }
        copy_view_to_image(
            &mut self.core.buffer.base_mut()?,
            converter.image_data(),
            converter.view(),
        )?;
        self.core.buffer.set_range(0, size)?;
        self.set_image_data(*converter.image_data());
        self.buffer_ref = source.cloned();
        Ok(())
    }

    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        self.buffer_ref.clone()
    }

    fn clear_hardware_references(&mut self) {
        self.view = None;
        self.buffer_ref = None;
        if self.wrapped {
            self.core.buffer.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::*;
    use crate::pool::MemoryBlockPool;

    fn format_with(color_format: ColorFormat) -> MediaFormat {
        let mut format = MediaFormat::new();
        format.set_i32(KEY_COLOR_FORMAT, color_format.into());
        format
    }

    fn sized_format(width: i32, height: i32, color_format: ColorFormat) -> MediaFormat {
        let mut format = format_with(color_format);
        format.set_i32(KEY_WIDTH, width);
        format.set_i32(KEY_HEIGHT, height);
        format
    }

    fn alloc(size: usize) -> Option<ByteBuffer> {
        ByteBuffer::new(size).ok()
    }

    fn filled_source(width: u32, height: u32, format: HardwareFormat) -> BufferResult<Arc<HardwareBuffer>> {
        let block = GraphicBlock::allocate(width, height, format)?;
        let mut view = block.map()?;
        for (index, byte) in view.data_mut()?.iter_mut().enumerate() {
            *byte = (index % 251) as u8;
        }
        Ok(HardwareBuffer::create_graphic_buffer(
            block.share(block.crop(), Fence::signaled())?,
        ))
    }

    #[test]
    fn writable_block_is_wrapped() -> BufferResult<()> {
        let block = GraphicBlock::allocate(16, 16, HardwareFormat::Nv12)?;
        let mut buffer = GraphicBlockBuffer::allocate(MediaFormat::new(), block.clone(), |_| None)?;
        assert!(buffer.is_wrapped());
        assert_eq!(buffer.capacity(), 384);
        assert!(buffer.format().contains(KEY_IMAGE_DATA));
        buffer.base_mut()?[300] = 77;
        let shared = buffer.to_hardware_buffer().unwrap();
        let view = shared.graphic_blocks()[0].map()?;
        assert_eq!(view.data()[300], 77);
        Ok(())
    }

    #[test]
    fn writable_block_copies_back_buffer_on_share() -> BufferResult<()> {
        let block = GraphicBlock::allocate(16, 16, HardwareFormat::Nv12)?;
        let pool = MemoryBlockPool::new();
        let mut buffer = GraphicBlockBuffer::allocate(
            format_with(ColorFormat::Yuv420Planar),
            block.clone(),
            |size| pool.fetch(size).ok().map(ByteBuffer::from_block),
        )?;
        assert!(!buffer.is_wrapped());
        assert_eq!(pool.in_use_count(), 1);
        {
            let mut base = buffer.base_mut()?;
            base[..256].fill(1);
            base[256..320].fill(2);
            base[320..384].fill(3);
        }
        let shared = buffer.to_hardware_buffer().unwrap();
        let view = shared.graphic_blocks()[0].map()?;
        let data = view.data();
        assert!(data[..256].iter().all(|&byte| byte == 1));
        for pair in data[256..384].chunks_exact(2) {
            assert_eq!(pair, &[2, 3]);
        }

        buffer.clear_hardware_references();
        assert!(buffer.to_hardware_buffer().is_none());
        // The back buffer stays with the client.
        assert_eq!(buffer.capacity(), 384);
        Ok(())
    }

    #[test]
    fn failed_back_buffer_allocation() -> BufferResult<()> {
        let block = GraphicBlock::allocate(16, 16, HardwareFormat::Nv12)?;
        let result = GraphicBlockBuffer::allocate(format_with(ColorFormat::Yuv420Planar), block, |_| None);
        assert!(matches!(result, Err(BufferError::NoMemory)));
        Ok(())
    }

    #[test]
    fn const_block_is_wrapped_read_only() -> BufferResult<()> {
        let source = filled_source(16, 16, HardwareFormat::Nv12)?;
        let mut buffer = ConstGraphicBlockBuffer::allocate(MediaFormat::new(), source.clone(), alloc)?;
        assert!(buffer.is_wrapped());
        assert!(buffer.base_mut().is_err());
        assert_eq!(buffer.data()[257], (257 % 251) as u8);
        assert!(!buffer.can_copy(None));
        assert!(Arc::ptr_eq(&buffer.to_hardware_buffer().unwrap(), &source));
        buffer.clear_hardware_references();
        assert!(buffer.to_hardware_buffer().is_none());
        assert!(!buffer.buffer().has_base());
        Ok(())
    }

    #[test]
    fn const_block_is_copied_for_planar_client() -> BufferResult<()> {
        let source = filled_source(16, 16, HardwareFormat::Nv12)?;
        let buffer = ConstGraphicBlockBuffer::allocate(
            format_with(ColorFormat::Yuv420Planar),
            source.clone(),
            alloc,
        )?;
        assert!(!buffer.is_wrapped());
        let image = buffer.image_data().unwrap();
        assert_eq!(image.planes[PLANE_V].offset, 320);
        let data = buffer.data();
        for index in 0..64 {
            assert_eq!(data[256 + index], ((256 + 2 * index) % 251) as u8);
            assert_eq!(data[320 + index], ((257 + 2 * index) % 251) as u8);
        }
        Ok(())
    }

    #[test]
    fn const_block_needs_one_graphic_block() {
        let linear = HardwareBuffer::new(BufferData::Linear(vec![]));
        assert!(ConstGraphicBlockBuffer::allocate(MediaFormat::new(), linear, alloc).is_err());
        let empty = HardwareBuffer::new(BufferData::Graphic(vec![]));
        assert!(ConstGraphicBlockBuffer::allocate(MediaFormat::new(), empty, alloc).is_err());
    }

    #[test]
    fn empty_buffer_sizes() -> BufferResult<()> {
        let buffer =
            ConstGraphicBlockBuffer::allocate_empty(sized_format(16, 16, ColorFormat::Yuv420Flexible), alloc)?;
        assert_eq!(buffer.capacity(), 384);
        let buffer = ConstGraphicBlockBuffer::allocate_empty(sized_format(20, 10, ColorFormat::YuvP010), alloc)?;
        assert_eq!(buffer.capacity(), 32 * 16 * 3);
        assert!(ConstGraphicBlockBuffer::allocate_empty(MediaFormat::new(), alloc).is_err());
        assert!(matches!(
            ConstGraphicBlockBuffer::allocate_empty(sized_format(16, 16, ColorFormat::Yuv420Flexible), |_| None),
            Err(BufferError::NoMemory)
        ));
        Ok(())
    }

    #[test]
    fn copy_into_empty_buffer() -> BufferResult<()> {
        let source = filled_source(16, 16, HardwareFormat::Nv12)?;
        let mut buffer =
            ConstGraphicBlockBuffer::allocate_empty(sized_format(16, 16, ColorFormat::Yuv420Flexible), alloc)?;
        assert!(buffer.can_copy(None));
        assert!(buffer.can_copy(Some(&source)));
        buffer.copy(Some(&source))?;
        assert_eq!(buffer.size(), 384);
        assert_eq!(*buffer.data(), *source.graphic_blocks()[0].map()?.data());
        assert!(buffer.image_data().is_some());
        // A second copy would drop the first source.
        assert!(!buffer.can_copy(Some(&source)));
        assert!(Arc::ptr_eq(&buffer.to_hardware_buffer().unwrap(), &source));
        Ok(())
    }

    #[test]
    fn copy_rejects_sources_that_do_not_fit() -> BufferResult<()> {
        let source = filled_source(32, 32, HardwareFormat::Nv12)?;
        let mut buffer =
            ConstGraphicBlockBuffer::allocate_empty(sized_format(16, 16, ColorFormat::Yuv420Flexible), alloc)?;
        let size = buffer.size();
        assert!(!buffer.can_copy(Some(&source)));
        assert_eq!(buffer.copy(Some(&source)), Err(BufferError::NoMemory));
        assert_eq!(buffer.size(), size);
        assert!(buffer.to_hardware_buffer().is_none());

        let linear = HardwareBuffer::new(BufferData::Linear(vec![]));
        assert!(!buffer.can_copy(Some(&linear)));
        buffer.copy(None)?;
        assert_eq!(buffer.size(), 0);
        Ok(())
    }
}
