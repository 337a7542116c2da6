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

// Not all functions are used from all test targets. So allow dead code in this module.
#![allow(dead_code)]

use codec2_buffers::byte_buffer::ByteBuffer;
use codec2_buffers::format::*;
use codec2_buffers::hardware::*;
use codec2_buffers::layout::*;
use codec2_buffers::pool::MemoryBlockPool;
use codec2_buffers::*;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn format_with(color_format: ColorFormat) -> MediaFormat {
    let mut format = MediaFormat::new();
    format.set_i32(KEY_COLOR_FORMAT, color_format.into());
    format
}

/// Fills every byte of the block with a nonzero value derived from `seed`.
pub fn fill_block(block: &GraphicBlock, seed: u64) -> BufferResult<()> {
    let mut view = block.map()?;
    let mut rng = StdRng::seed_from_u64(seed);
    for byte in view.data_mut()?.iter_mut() {
        *byte = rng.gen_range(1..=255);
    }
    Ok(())
}

pub fn filled_block(width: u32, height: u32, format: HardwareFormat, seed: u64) -> BufferResult<GraphicBlock> {
    let block = GraphicBlock::allocate(width, height, format)?;
    fill_block(&block, seed)?;
    Ok(block)
}

/// Shares the whole crop of `block` as the output of a codec.
pub fn codec_output(block: &GraphicBlock) -> BufferResult<Arc<HardwareBuffer>> {
    Ok(HardwareBuffer::create_graphic_buffer(
        block.share(block.crop(), Fence::signaled())?,
    ))
}

/// 8-bit 4:4:4 YUV with all three channels interleaved in one memory plane.
pub fn interleaved_yuv444_block(width: u32, height: u32) -> BufferResult<GraphicBlock> {
    let row_inc = i32::try_from(width * 3).or(Err(BufferError::BadValue))?;
    let mut planes = [PlaneInfo::default(); MAX_PLANE_COUNT];
    for (index, channel) in [Channel::Y, Channel::Cb, Channel::Cr].into_iter().enumerate() {
        planes[index] = PlaneInfo {
            channel,
            col_inc: 3,
            row_inc,
            offset: index as u32,
            ..Default::default()
        };
    }
    let layout = PlanarLayout {
        layout_type: LayoutType::Yuv,
        num_planes: 3,
        root_planes: 1,
        planes,
    };
    let size = (width * height * 3) as usize;
    let allocation = GraphicAllocation::with_layout(SharedMemory::new(size)?, width, height, layout, &[0, 1, 2])?;
    Ok(GraphicBlock::new(allocation))
}

pub fn pool_alloc(pool: &MemoryBlockPool) -> impl FnOnce(usize) -> Option<ByteBuffer> + '_ {
    move |size| pool.fetch(size).ok().map(ByteBuffer::from_block)
}
