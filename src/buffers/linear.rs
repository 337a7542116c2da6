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
use crate::format::MediaFormat;
use crate::hardware::*;
use crate::*;

use std::sync::Arc;

/// A linear buffer in process memory.
pub struct LocalLinearBuffer {
    core: BufferCore,
}

impl LocalLinearBuffer {
    pub fn new(format: MediaFormat, buffer: ByteBuffer) -> Self {
        Self {
            core: BufferCore::new(format, buffer),
        }
    }
}

impl Codec2Buffer for LocalLinearBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn can_copy(&self, source: Option<&Arc<HardwareBuffer>>) -> bool {
        self.core.can_copy_linear(source)
    }

    fn copy(&mut self, source: Option<&Arc<HardwareBuffer>>) -> BufferResult<()> {
        self.core.copy_linear(source)
    }
}

/// A writable mapping of a hardware linear block.
pub struct LinearBlockBuffer {
    core: BufferCore,
    block: Option<LinearBlock>,
}

impl LinearBlockBuffer {
    pub fn allocate(format: MediaFormat, block: LinearBlock) -> BufferResult<Self> {
        let view = block.map()?;
        Ok(Self {
            core: BufferCore::new(format, ByteBuffer::from_region(view.region().clone())),
            block: Some(block),
        })
    }
}

impl Codec2Buffer for LinearBlockBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn can_copy(&self, source: Option<&Arc<HardwareBuffer>>) -> bool {
        self.core.can_copy_linear(source)
    }

    fn copy(&mut self, source: Option<&Arc<HardwareBuffer>>) -> BufferResult<()> {
        self.core.copy_linear(source)
    }

    /// Shares the visible range of the block.
    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        let block = self.block.as_ref()?;
        match block.share(self.offset(), self.size(), Fence::signaled()) {
            Ok(shared) => Some(HardwareBuffer::create_linear_buffer(shared)),
            Err(err) => {
                log::debug!("cannot share linear block: {err}");
                None
            }
        }
    }

    fn clear_hardware_references(&mut self) {
        self.block = None;
        self.core.buffer.release();
    }
}

/// A read-only mapping of the single linear block of a hardware buffer. The hardware buffer is
/// returned to the codec unmodified.
pub struct ConstLinearBlockBuffer {
    core: BufferCore,
    buffer_ref: Option<Arc<HardwareBuffer>>,
}

impl ConstLinearBlockBuffer {
    pub fn allocate(format: MediaFormat, buffer: Arc<HardwareBuffer>) -> BufferResult<Self> {
        let block = match (buffer.data(), buffer.linear_blocks()) {
            (BufferData::Linear(_), [block]) => block,
            _ => {
                log::warn!(
                    "ConstLinearBlockBuffer::allocate: # linear blocks={}",
                    buffer.linear_blocks().len()
                );
                return BufferError::bad_value();
            }
        };
        let view = block.map()?;
        let byte_buffer = ByteBuffer::from_read_only_region(view.region().clone());
        Ok(Self {
            core: BufferCore::new(format, byte_buffer),
            buffer_ref: Some(buffer),
        })
    }
}

impl Codec2Buffer for ConstLinearBlockBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        self.buffer_ref.clone()
    }

    fn clear_hardware_references(&mut self) {
        self.buffer_ref = None;
        self.core.buffer.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_source(data: &[u8]) -> BufferResult<Arc<HardwareBuffer>> {
        let block = LinearBlock::allocate(data.len())?;
        block.map()?.data_mut().copy_from_slice(data);
        Ok(HardwareBuffer::create_linear_buffer(block.share(
            0,
            data.len(),
            Fence::signaled(),
        )?))
    }

    #[test]
    fn local_copy() -> BufferResult<()> {
        let mut buffer = LocalLinearBuffer::new(MediaFormat::new(), ByteBuffer::new(8)?);
        let source = linear_source(&[1, 2, 3])?;
        assert!(buffer.can_copy(Some(&source)));
        buffer.copy(Some(&source))?;
        assert_eq!(*buffer.data(), [1, 2, 3]);
        // Nothing to copy empties the range.
        assert!(buffer.can_copy(None));
        buffer.copy(None)?;
        assert_eq!(buffer.size(), 0);
        Ok(())
    }

    #[test]
    fn multiple_blocks_cannot_be_copied() -> BufferResult<()> {
        let mut buffer = LocalLinearBuffer::new(MediaFormat::new(), ByteBuffer::new(8)?);
        let block = LinearBlock::allocate(4)?;
        let source = HardwareBuffer::new(BufferData::Linear(vec![
            block.share(0, 2, Fence::signaled())?,
            block.share(2, 2, Fence::signaled())?,
        ]));
        assert!(!buffer.can_copy(Some(&source)));
        assert_eq!(buffer.copy(Some(&source)), Err(BufferError::BadValue));
        assert_eq!(buffer.size(), 8);
        let empty = HardwareBuffer::new(BufferData::Linear(vec![]));
        assert!(buffer.can_copy(Some(&empty)));
        let graphic = HardwareBuffer::new(BufferData::Graphic(vec![]));
        assert!(!buffer.can_copy(Some(&graphic)));
        Ok(())
    }

    #[test]
    fn copy_within_one_allocation() -> BufferResult<()> {
        let memory = SharedMemory::from_slice(&[1, 2, 3, 4, 0, 0, 0, 0])?;
        let block = LinearBlock::from_memory(memory.clone(), 0, 8)?;
        let source = HardwareBuffer::create_linear_buffer(block.share(0, 4, Fence::signaled())?);
        let destination = MemoryRegion::new(memory, 4, 4)?;
        let mut buffer =
            LocalLinearBuffer::new(MediaFormat::new(), ByteBuffer::from_region(destination));
        assert!(buffer.can_copy(Some(&source)));
        buffer.copy(Some(&source))?;
        assert_eq!(*buffer.data(), [1, 2, 3, 4]);
        assert_eq!(*block.map()?.data(), [1, 2, 3, 4, 1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn released_buffer_cannot_copy() {
        let buffer = LocalLinearBuffer::new(MediaFormat::new(), ByteBuffer::default());
        assert!(!buffer.can_copy(None));
    }

    #[test]
    fn block_buffer_shares_visible_range() -> BufferResult<()> {
        let block = LinearBlock::allocate(16)?;
        let mut buffer = LinearBlockBuffer::allocate(MediaFormat::new(), block.clone())?;
        assert_eq!(buffer.capacity(), 16);
        buffer.base_mut()?[4..8].copy_from_slice(&[9, 8, 7, 6]);
        buffer.set_range(4, 4)?;
        let hardware_buffer = buffer.to_hardware_buffer().unwrap();
        let shared = &hardware_buffer.linear_blocks()[0];
        assert_eq!(shared.handle(), block.handle());
        assert_eq!(*shared.map()?.data(), [9, 8, 7, 6]);

        buffer.clear_hardware_references();
        assert!(buffer.to_hardware_buffer().is_none());
        buffer.clear_hardware_references();
        assert_eq!(buffer.capacity(), 0);
        Ok(())
    }

    #[test]
    fn const_block_buffer_returns_original() -> BufferResult<()> {
        let source = linear_source(&[5, 6, 7])?;
        let mut buffer = ConstLinearBlockBuffer::allocate(MediaFormat::new(), source.clone())?;
        assert_eq!(*buffer.data(), [5, 6, 7]);
        assert!(buffer.base_mut().is_err());
        assert!(!buffer.can_copy(None));
        assert!(Arc::ptr_eq(&buffer.to_hardware_buffer().unwrap(), &source));
        buffer.clear_hardware_references();
        assert!(buffer.to_hardware_buffer().is_none());
        Ok(())
    }

    #[test]
    fn const_block_buffer_needs_one_block() -> BufferResult<()> {
        let empty = HardwareBuffer::new(BufferData::Linear(vec![]));
        assert!(ConstLinearBlockBuffer::allocate(MediaFormat::new(), empty).is_err());
        Ok(())
    }
}
