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
use crate::hardware::fence::FENCE_WAIT_TIMEOUT;
use crate::hardware::*;
use crate::internal_utils::*;
use crate::*;

use std::sync::Arc;

/// A range of a shared heap holding protected content, with an optional fence signaled once the
/// content is ready.
#[derive(Clone, Debug)]
pub struct SecureMemory {
    region: MemoryRegion,
    fence: Option<Fence>,
}

impl SecureMemory {
    pub fn new(heap: Arc<SharedMemory>, offset: usize, size: usize) -> BufferResult<Self> {
        Ok(Self {
            region: MemoryRegion::new(heap, offset, size)?,
            fence: None,
        })
    }

    pub fn with_fence(mut self, fence: Fence) -> Self {
        self.fence = Some(fence);
        self
    }

    pub fn heap(&self) -> &Arc<SharedMemory> {
        self.region.memory()
    }

    pub fn offset(&self) -> usize {
        self.region.offset()
    }

    pub fn size(&self) -> usize {
        self.region.len()
    }

    pub fn data(&self) -> MemoryRef<'_> {
        self.region.read()
    }

    fn wait(&self) -> BufferResult<()> {
        match &self.fence {
            Some(fence) => fence.wait(FENCE_WAIT_TIMEOUT),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapHandle(pub u64);

/// Source descriptor of the legacy DRM sharing convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrmSharedBuffer {
    pub buffer_id: u32,
    pub offset: u64,
    pub size: u64,
}

/// Source descriptor of the CAS sharing convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CasSharedBuffer {
    pub heap_base: HeapHandle,
    pub offset: u64,
    pub size: u64,
}

/// A linear block receiving decrypted content. The client sees the encrypted input in secure
/// memory while the decrypted output is copied into the block.
pub struct EncryptedLinearBlockBuffer {
    core: BufferCore,
    block: Option<LinearBlock>,
    view: Option<WriteView>,
    memory: SecureMemory,
    heap_seq_num: u32,
}

impl EncryptedLinearBlockBuffer {
    pub fn new(
        format: MediaFormat,
        block: LinearBlock,
        memory: SecureMemory,
        heap_seq_num: u32,
    ) -> Self {
        Self {
            core: BufferCore::new(format, ByteBuffer::from_region(memory.region.clone())),
            block: Some(block),
            view: None,
            memory,
            heap_seq_num,
        }
    }

    pub fn fill_drm_source(&self) -> BufferResult<DrmSharedBuffer> {
        Ok(DrmSharedBuffer {
            buffer_id: self.heap_seq_num,
            offset: u64_from_usize(self.memory.offset())?,
            size: u64_from_usize(self.memory.size())?,
        })
    }

    pub fn fill_cas_source(&self) -> BufferResult<CasSharedBuffer> {
        Ok(CasSharedBuffer {
            heap_base: HeapHandle(self.memory.heap().id()),
            offset: u64_from_usize(self.memory.offset())?,
            size: u64_from_usize(self.memory.size())?,
        })
    }

    /// Copies the first `length` bytes of `decrypted` to the start of the block.
    pub fn copy_decrypted_content(
        &mut self,
        decrypted: &SecureMemory,
        length: usize,
    ) -> BufferResult<()> {
        let block = match &self.block {
            Some(block) => block,
            None => return BufferError::not_initialized(),
        };
        let mut view = block.map()?;
        copy_into_view(&mut view, decrypted, length)
    }

    /// Copies the first `length` bytes of the buffer's own secure memory to the start of the
    /// block.
    pub fn copy_decrypted_content_from_memory(&mut self, length: usize) -> BufferResult<()> {
        let memory = self.memory.clone();
        self.copy_decrypted_content(&memory, length)
    }

    pub fn handle(&self) -> Option<NativeHandle> {
        self.block.as_ref().map(LinearBlock::handle)
    }

    /// Maps the block for a sequence of decrypted copies. The write cursor goes back to the
    /// start of the block when the returned value is dropped.
    pub fn mapped_block(&mut self) -> BufferResult<MappedBlock<'_>> {
        let block = match &self.block {
            Some(block) => block,
            None => return BufferError::not_initialized(),
        };
        if self.view.is_none() {
            self.view = Some(block.map()?);
        }
        match self.view.as_mut() {
            Some(view) => Ok(MappedBlock { view }),
            None => BufferError::map_failed(),
        }
    }
}

fn copy_into_view(view: &mut WriteView, decrypted: &SecureMemory, length: usize) -> BufferResult<()> {
    if view.size() < length {
        log::debug!(
            "view of {} bytes is shorter than the decrypted length {length}",
            view.size()
        );
        return BufferError::no_memory();
    }
    if length > decrypted.size() {
        return BufferError::bad_value();
    }
    decrypted.wait()?;
    // The decrypted content may live in the same heap as the block.
    view.region()
        .copy_from(view.offset(), &decrypted.region, 0, length)
}

impl Codec2Buffer for EncryptedLinearBlockBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        let block = self.block.as_ref()?;
        match block.share(self.core.buffer.offset(), self.core.buffer.size(), Fence::signaled()) {
            Ok(shared) => Some(HardwareBuffer::create_linear_buffer(shared)),
            Err(err) => {
                log::debug!("cannot share encrypted block: {err}");
                None
            }
        }
    }

    fn clear_hardware_references(&mut self) {
        self.view = None;
        self.block = None;
    }
}

/// A mapping of the block of an [`EncryptedLinearBlockBuffer`] with a write cursor.
pub struct MappedBlock<'a> {
    view: &'a mut WriteView,
}

impl MappedBlock<'_> {
    /// Copies `length` bytes of `decrypted` at the cursor and advances the cursor past them.
    pub fn copy_decrypted_content(
        &mut self,
        decrypted: &SecureMemory,
        length: usize,
    ) -> BufferResult<()> {
        copy_into_view(self.view, decrypted, length)?;
        let offset = checked_add!(self.view.offset(), length)?;
        self.view.set_offset(offset)
    }

    pub fn offset(&self) -> usize {
        self.view.offset()
    }

    pub fn size(&self) -> usize {
        self.view.size()
    }
}

impl Drop for MappedBlock<'_> {
    fn drop(&mut self) {
        // Offset 0 is always in range.
        let _ = self.view.set_offset(0);
    }
}
