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

//! In-process model of the hardware allocator: shared memory, fences, linear and graphic blocks
//! and the opaque buffer handle exchanged with the codec.

pub mod fence;
pub mod graphic;
pub mod linear;
pub mod memory;

pub use fence::Fence;
pub use graphic::*;
pub use linear::*;
pub use memory::*;

use crate::*;

use std::sync::Arc;

/// Identifies the memory behind a block across processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

#[derive(Clone, Debug)]
pub enum BufferData {
    Linear(Vec<ConstLinearBlock>),
    Graphic(Vec<ConstGraphicBlock>),
}

/// Opaque buffer handed back and forth between the codec and its clients.
#[derive(Clone, Debug)]
pub struct HardwareBuffer {
    data: BufferData,
}

impl HardwareBuffer {
    pub fn new(data: BufferData) -> Arc<Self> {
        Arc::new(Self { data })
    }

    pub fn create_linear_buffer(block: ConstLinearBlock) -> Arc<Self> {
        Self::new(BufferData::Linear(vec![block]))
    }

    pub fn create_graphic_buffer(block: ConstGraphicBlock) -> Arc<Self> {
        Self::new(BufferData::Graphic(vec![block]))
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }

    pub fn linear_blocks(&self) -> &[ConstLinearBlock] {
        match &self.data {
            BufferData::Linear(blocks) => blocks,
            BufferData::Graphic(_) => &[],
        }
    }

    pub fn graphic_blocks(&self) -> &[ConstGraphicBlock] {
        match &self.data {
            BufferData::Graphic(blocks) => blocks,
            BufferData::Linear(_) => &[],
        }
    }
}

pub trait GraphicAllocator: Send + Sync {
    fn allocate_graphic(
        &self,
        width: u32,
        height: u32,
        format: HardwareFormat,
    ) -> BufferResult<GraphicBlock>;
}

pub trait LinearAllocator: Send + Sync {
    fn allocate_linear(&self, capacity: usize) -> BufferResult<LinearBlock>;
}

/// Serves blocks from process memory.
#[derive(Clone, Copy, Debug)]
pub struct HeapAllocator {
    flexible_format: HardwareFormat,
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self {
            flexible_format: HardwareFormat::Nv12,
        }
    }
}

impl HeapAllocator {
    /// Creates an allocator that lays out flexible 4:2:0 requests as `flexible_format`.
    pub fn with_flexible_format(flexible_format: HardwareFormat) -> BufferResult<Self> {
        match flexible_format {
            HardwareFormat::Nv12
            | HardwareFormat::Nv21
            | HardwareFormat::I420
            | HardwareFormat::Yv12 => Ok(Self { flexible_format }),
            _ => BufferError::bad_value(),
        }
    }
}

impl GraphicAllocator for HeapAllocator {
    fn allocate_graphic(
        &self,
        width: u32,
        height: u32,
        format: HardwareFormat,
    ) -> BufferResult<GraphicBlock> {
        let format = match format {
            HardwareFormat::Ycbcr420Flexible => self.flexible_format,
            format => format,
        };
        GraphicBlock::allocate(width, height, format)
    }
}

impl LinearAllocator for HeapAllocator {
    fn allocate_linear(&self, capacity: usize) -> BufferResult<LinearBlock> {
        LinearBlock::allocate(capacity)
    }
}
