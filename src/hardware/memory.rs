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

use crate::internal_utils::*;
use crate::*;

use parking_lot::MappedRwLockReadGuard;
use parking_lot::MappedRwLockWriteGuard;
use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1);

/// Read access to the bytes of a [`MemoryRegion`]. Writers wait until it is dropped.
pub type MemoryRef<'a> = MappedRwLockReadGuard<'a, [u8]>;
/// Exclusive access to the bytes of a [`MemoryRegion`].
pub type MemoryMut<'a> = MappedRwLockWriteGuard<'a, [u8]>;

/// A fixed-size allocation that may be mapped by several views at once, like memory owned by a
/// hardware allocator. Every view goes through the same lock, so a writer never overlaps a
/// reader of the same allocation.
pub struct SharedMemory {
    id: u64,
    len: usize,
    bytes: RwLock<Box<[u8]>>,
}

impl std::fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemory")
            .field("id", &self.id)
            .field("len", &self.len)
            .finish()
    }
}

impl SharedMemory {
    pub fn new(size: usize) -> BufferResult<Arc<Self>> {
        let bytes = create_vec_exact(size)?;
        Ok(Arc::new(Self {
            id: NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed),
            len: size,
            bytes: RwLock::new(bytes.into_boxed_slice()),
        }))
    }

    pub fn from_slice(data: &[u8]) -> BufferResult<Arc<Self>> {
        let memory = Self::new(data.len())?;
        memory.bytes.write().copy_from_slice(data);
        Ok(memory)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A window of `len` bytes starting at `offset` into a [`SharedMemory`].
#[derive(Clone, Debug)]
pub struct MemoryRegion {
    memory: Arc<SharedMemory>,
    offset: usize,
    len: usize,
}

impl MemoryRegion {
    pub fn new(memory: Arc<SharedMemory>, offset: usize, len: usize) -> BufferResult<Self> {
        if checked_add!(offset, len)? > memory.len() {
            return BufferError::bad_value();
        }
        Ok(Self {
            memory,
            offset,
            len,
        })
    }

    pub fn whole(memory: Arc<SharedMemory>) -> Self {
        let len = memory.len();
        Self {
            memory,
            offset: 0,
            len,
        }
    }

    /// Returns a window relative to this one.
    pub fn sub_region(&self, offset: usize, len: usize) -> BufferResult<Self> {
        if checked_add!(offset, len)? > self.len {
            return BufferError::bad_value();
        }
        Self::new(self.memory.clone(), self.offset + offset, len)
    }

    pub fn memory(&self) -> &Arc<SharedMemory> {
        &self.memory
    }

    /// True if both regions are windows into the same allocation.
    pub fn shares_memory_with(&self, other: &MemoryRegion) -> bool {
        Arc::ptr_eq(&self.memory, &other.memory)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Locks the allocation for reading. Reads may nest on one thread; a write access taken on
    /// the same thread while this is alive blocks forever.
    pub fn read(&self) -> MemoryRef<'_> {
        let range = self.offset..self.offset + self.len;
        RwLockReadGuard::map(self.memory.bytes.read_recursive(), |bytes| &bytes[range])
    }

    /// Locks the allocation for writing.
    pub fn write(&self) -> MemoryMut<'_> {
        let range = self.offset..self.offset + self.len;
        RwLockWriteGuard::map(self.memory.bytes.write(), |bytes| &mut bytes[range])
    }

    /// Copies `len` bytes at `src_offset` of `src` to `offset` of this region. The regions may
    /// be windows into the same allocation.
    pub fn copy_from(
        &self,
        offset: usize,
        src: &MemoryRegion,
        src_offset: usize,
        len: usize,
    ) -> BufferResult<()> {
        if checked_add!(offset, len)? > self.len || checked_add!(src_offset, len)? > src.len {
            return BufferError::bad_value();
        }
        let dst_start = self.offset + offset;
        let src_start = src.offset + src_offset;
        if self.shares_memory_with(src) {
            let mut bytes = self.memory.bytes.write();
            bytes.copy_within(src_start..src_start + len, dst_start);
        } else {
            let src_bytes = src.memory.bytes.read_recursive();
            let mut dst_bytes = self.memory.bytes.write();
            dst_bytes[dst_start..dst_start + len]
                .copy_from_slice(&src_bytes[src_start..src_start + len]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_share_memory() -> BufferResult<()> {
        let memory = SharedMemory::new(32)?;
        let writer = MemoryRegion::new(memory.clone(), 8, 16)?;
        writer.write()[0] = 42;
        let reader = MemoryRegion::whole(memory.clone());
        assert_eq!(reader.read()[8], 42);
        let sub = writer.sub_region(0, 4)?;
        assert_eq!(sub.offset(), 8);
        assert_eq!(sub.read()[0], 42);
        Ok(())
    }

    #[test]
    fn out_of_range_regions() -> BufferResult<()> {
        let memory = SharedMemory::new(32)?;
        assert!(MemoryRegion::new(memory.clone(), 16, 17).is_err());
        assert!(MemoryRegion::new(memory.clone(), usize::MAX, 2).is_err());
        let region = MemoryRegion::new(memory, 16, 16)?;
        assert!(region.sub_region(8, 9).is_err());
        Ok(())
    }

    #[test]
    fn ids_are_unique() -> BufferResult<()> {
        let first = SharedMemory::new(1)?;
        let second = SharedMemory::from_slice(&[1, 2, 3])?;
        assert_ne!(first.id(), second.id());
        assert_eq!(*MemoryRegion::whole(second).read(), [1, 2, 3]);
        Ok(())
    }

    #[test]
    fn clones_do_not_alias_a_live_reader() -> BufferResult<()> {
        let memory = SharedMemory::new(4)?;
        let writer = MemoryRegion::whole(memory.clone());
        let reader = writer.clone();
        let snapshot = reader.read();
        let (sender, receiver) = std::sync::mpsc::channel();
        let thread = std::thread::spawn(move || {
            writer.write()[0] = 9;
            sender.send(()).ok();
        });
        // The writer cannot get in while the read access is alive.
        assert!(receiver
            .recv_timeout(std::time::Duration::from_millis(50))
            .is_err());
        assert_eq!(snapshot[0], 0);
        drop(snapshot);
        receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .or(Err(BufferError::TimedOut))?;
        thread.join().or(Err(BufferError::UnknownError("writer panicked".into())))?;
        assert_eq!(reader.read()[0], 9);
        Ok(())
    }

    #[test]
    fn copy_between_and_within_allocations() -> BufferResult<()> {
        let memory = SharedMemory::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8])?;
        let region = MemoryRegion::whole(memory);
        region.copy_from(4, &region.clone(), 0, 4)?;
        assert_eq!(*region.read(), [1, 2, 3, 4, 1, 2, 3, 4]);
        let other = MemoryRegion::whole(SharedMemory::new(2)?);
        other.copy_from(0, &region, 6, 2)?;
        assert_eq!(*other.read(), [3, 4]);
        assert!(other.copy_from(1, &region, 0, 2).is_err());
        assert!(other.copy_from(0, &region, 7, 2).is_err());
        Ok(())
    }
}
