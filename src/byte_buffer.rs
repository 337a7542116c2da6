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

use crate::hardware::MemoryMut;
use crate::hardware::MemoryRef;
use crate::hardware::MemoryRegion;
use crate::internal_utils::*;
use crate::pool::MemoryBlock;
use crate::*;

use parking_lot::MappedRwLockReadGuard;
use std::ops::Deref;
use std::ops::DerefMut;
use std::ops::Range;

/// Read access to the bytes of a [`ByteBuffer`].
pub enum BufferRef<'a> {
    Plain(&'a [u8]),
    Mapped(MemoryRef<'a>),
}

impl BufferRef<'_> {
    fn slice(self, range: Range<usize>) -> Self {
        match self {
            Self::Plain(data) => Self::Plain(&data[range]),
            Self::Mapped(data) => Self::Mapped(MappedRwLockReadGuard::map(data, |data| &data[range])),
        }
    }
}

impl Deref for BufferRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Plain(data) => data,
            Self::Mapped(data) => data,
        }
    }
}

/// Write access to the bytes of a [`ByteBuffer`].
pub enum BufferMut<'a> {
    Plain(&'a mut [u8]),
    Mapped(MemoryMut<'a>),
}

impl Deref for BufferMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Plain(data) => data,
            Self::Mapped(data) => data,
        }
    }
}

impl DerefMut for BufferMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Plain(data) => data,
            Self::Mapped(data) => data,
        }
    }
}

#[derive(Debug, Default)]
pub enum Storage {
    #[default]
    Empty,
    Owned(Vec<u8>),
    // Zero-copy window over hardware memory.
    Region(MemoryRegion),
    Block(MemoryBlock),
}

/// A flat buffer with a visible range, as seen by clients.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    storage: Storage,
    read_only: bool,
    range_offset: usize,
    range_size: usize,
}

impl ByteBuffer {
    fn with_storage(storage: Storage, read_only: bool) -> Self {
        let mut buffer = Self {
            storage,
            read_only,
            range_offset: 0,
            range_size: 0,
        };
        buffer.range_size = buffer.capacity();
        buffer
    }

    /// Allocates a zero-filled buffer whose range covers the whole capacity.
    pub fn new(capacity: usize) -> BufferResult<Self> {
        Ok(Self::from_vec(create_vec_exact(capacity)?))
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self::with_storage(Storage::Owned(data), false)
    }

    pub fn from_region(region: MemoryRegion) -> Self {
        Self::with_storage(Storage::Region(region), false)
    }

    pub fn from_read_only_region(region: MemoryRegion) -> Self {
        Self::with_storage(Storage::Region(region), true)
    }

    pub fn from_block(block: MemoryBlock) -> Self {
        Self::with_storage(Storage::Block(block), false)
    }

    /// False once the storage has been released.
    pub fn has_base(&self) -> bool {
        !matches!(self.storage, Storage::Empty)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Empty => 0,
            Storage::Owned(data) => data.len(),
            Storage::Region(region) => region.len(),
            Storage::Block(block) => block.size(),
        }
    }

    pub fn offset(&self) -> usize {
        self.range_offset
    }

    pub fn size(&self) -> usize {
        self.range_size
    }

    pub fn set_range(&mut self, offset: usize, size: usize) -> BufferResult<()> {
        if checked_add!(offset, size)? > self.capacity() {
            return BufferError::bad_value();
        }
        self.range_offset = offset;
        self.range_size = size;
        Ok(())
    }

    /// The whole storage, regardless of the visible range. Region storage stays locked for
    /// reading until the returned value is dropped.
    pub fn base(&self) -> BufferRef<'_> {
        match &self.storage {
            Storage::Empty => BufferRef::Plain(&[]),
            Storage::Owned(data) => BufferRef::Plain(data),
            Storage::Region(region) => BufferRef::Mapped(region.read()),
            Storage::Block(block) => BufferRef::Plain(block.data()),
        }
    }

    pub fn base_mut(&mut self) -> BufferResult<BufferMut<'_>> {
        if self.read_only {
            return BufferError::bad_value();
        }
        Ok(match &mut self.storage {
            Storage::Empty => BufferMut::Plain(&mut []),
            Storage::Owned(data) => BufferMut::Plain(data),
            Storage::Region(region) => BufferMut::Mapped(region.write()),
            Storage::Block(block) => BufferMut::Plain(block.data_mut()),
        })
    }

    /// The visible range.
    pub fn data(&self) -> BufferRef<'_> {
        self.base()
            .slice(self.range_offset..self.range_offset + self.range_size)
    }

    /// True if the storage is a window into the same allocation as `region`.
    pub fn shares_memory_with(&self, region: &MemoryRegion) -> bool {
        matches!(&self.storage, Storage::Region(own) if own.shares_memory_with(region))
    }

    /// Drops the storage. The buffer reports no base and zero capacity afterwards.
    pub fn release(&mut self) {
        *self = Self::default();
    }
}
