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

use crate::hardware::fence::*;
use crate::hardware::memory::*;
use crate::hardware::NativeHandle;
use crate::internal_utils::*;
use crate::*;

use parking_lot::MappedRwLockReadGuard;
use parking_lot::MappedRwLockWriteGuard;
use std::sync::Arc;

/// A writable range of a linear hardware allocation.
#[derive(Clone, Debug)]
pub struct LinearBlock {
    memory: Arc<SharedMemory>,
    offset: usize,
    capacity: usize,
}

impl LinearBlock {
    pub fn allocate(capacity: usize) -> BufferResult<Self> {
        Ok(Self {
            memory: SharedMemory::new(capacity)?,
            offset: 0,
            capacity,
        })
    }

    pub fn from_memory(memory: Arc<SharedMemory>, offset: usize, capacity: usize) -> BufferResult<Self> {
        if checked_add!(offset, capacity)? > memory.len() {
            return BufferError::bad_value();
        }
        Ok(Self {
            memory,
            offset,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn handle(&self) -> NativeHandle {
        NativeHandle(self.memory.id())
    }

    pub fn map(&self) -> BufferResult<WriteView> {
        let region = MemoryRegion::new(self.memory.clone(), self.offset, self.capacity)
            .or(Err(BufferError::MapFailed))?;
        Ok(WriteView { region, offset: 0 })
    }

    /// Publishes `size` bytes starting at `offset` of this block for reading.
    pub fn share(&self, offset: usize, size: usize, fence: Fence) -> BufferResult<ConstLinearBlock> {
        if checked_add!(offset, size)? > self.capacity {
            return BufferError::bad_value();
        }
        Ok(ConstLinearBlock {
            memory: self.memory.clone(),
            offset: self.offset + offset,
            size,
            fence,
        })
    }
}

/// A read-only range of a linear hardware allocation.
#[derive(Clone, Debug)]
pub struct ConstLinearBlock {
    pub(crate) memory: Arc<SharedMemory>,
    pub(crate) offset: usize,
    pub(crate) size: usize,
    pub(crate) fence: Fence,
}

impl ConstLinearBlock {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    pub fn handle(&self) -> NativeHandle {
        NativeHandle(self.memory.id())
    }

    pub fn map(&self) -> BufferResult<ReadView> {
        self.fence.wait(FENCE_WAIT_TIMEOUT)?;
        let region = MemoryRegion::new(self.memory.clone(), self.offset, self.size)
            .or(Err(BufferError::MapFailed))?;
        Ok(ReadView { region })
    }
}

#[derive(Debug)]
pub struct ReadView {
    region: MemoryRegion,
}

impl ReadView {
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    pub fn data(&self) -> MemoryRef<'_> {
        self.region.read()
    }

    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }
}

/// Mapped writable linear memory with a movable start.
#[derive(Debug)]
pub struct WriteView {
    region: MemoryRegion,
    offset: usize,
}

impl WriteView {
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes available from the current offset to the end of the mapping.
    pub fn size(&self) -> usize {
        self.capacity() - self.offset
    }

    pub fn set_offset(&mut self, offset: usize) -> BufferResult<()> {
        if offset > self.capacity() {
            return BufferError::bad_value();
        }
        self.offset = offset;
        Ok(())
    }

    pub fn data(&self) -> MemoryRef<'_> {
        let offset = self.offset;
        MappedRwLockReadGuard::map(self.region.read(), |data| &data[offset..])
    }

    pub fn data_mut(&mut self) -> MemoryMut<'_> {
        let offset = self.offset;
        MappedRwLockWriteGuard::map(self.region.write(), |data| &mut data[offset..])
    }

    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }
}
