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

//! A free list of byte blocks for internal buffers, keyed by the last requested size.

use crate::internal_utils::*;
use crate::*;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct PoolState {
    current_size: usize,
    free: VecDeque<Box<[u8]>>,
    in_use: usize,
    allocations: usize,
}

#[derive(Debug, Default)]
struct PoolInner {
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn release(&self, data: Box<[u8]>) {
        let mut state = self.state.lock();
        state.in_use -= 1;
        if data.len() == state.current_size {
            state.free.push_front(data);
        }
    }
}

/// Hands out blocks of one size at a time. Requesting a new size drops all free blocks of other
/// sizes, so a caller switching sizes does not grow the pool.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlockPool {
    inner: Arc<PoolInner>,
}

impl MemoryBlockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch(&self, size: usize) -> BufferResult<MemoryBlock> {
        let reused = {
            let mut state = self.inner.state.lock();
            state.free.retain(|block| block.len() == size);
            state.current_size = size;
            let reused = state.free.pop_front();
            if reused.is_some() {
                state.in_use += 1;
            }
            reused
        };
        let data = match reused {
            Some(data) => data,
            None => {
                let data = create_vec_exact(size)?.into_boxed_slice();
                let mut state = self.inner.state.lock();
                state.allocations += 1;
                state.in_use += 1;
                data
            }
        };
        Ok(MemoryBlock {
            data: Some(data),
            pool: Some(self.inner.clone()),
        })
    }

    /// Number of blocks that were freshly allocated since the pool was created.
    pub fn allocation_count(&self) -> usize {
        self.inner.state.lock().allocations
    }

    pub fn free_count(&self) -> usize {
        self.inner.state.lock().free.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.inner.state.lock().in_use
    }
}

/// A block of bytes from a [`MemoryBlockPool`]. Dropping it returns it to the pool if the pool
/// still serves blocks of its size.
#[derive(Debug, Default)]
pub struct MemoryBlock {
    data: Option<Box<[u8]>>,
    pool: Option<Arc<PoolInner>>,
}

impl MemoryBlock {
    /// Allocates a block that is not shared with any other caller.
    pub fn allocate(size: usize) -> BufferResult<Self> {
        MemoryBlockPool::new().fetch(size)
    }

    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.len())
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        if let (Some(data), Some(pool)) = (self.data.take(), self.pool.take()) {
            pool.release(data);
        }
    }
}
