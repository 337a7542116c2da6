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

use codec2_buffers::buffers::*;
use codec2_buffers::byte_buffer::ByteBuffer;
use codec2_buffers::format::*;
use codec2_buffers::hardware::*;
use codec2_buffers::image::*;
use codec2_buffers::pool::MemoryBlockPool;
use codec2_buffers::*;

#[path = "utils/mod.rs"]
mod utils;
use utils::*;

use std::sync::Arc;

use test_case::test_case;

#[test_case(HardwareFormat::Nv12, ColorFormat::Yuv420Flexible, true ; "nv12 flexible wraps")]
#[test_case(HardwareFormat::Nv12, ColorFormat::Yuv420SemiPlanar, true ; "nv12 semi planar wraps")]
#[test_case(HardwareFormat::Nv21, ColorFormat::Yuv420SemiPlanar, false ; "nv21 semi planar copies")]
#[test_case(HardwareFormat::I420, ColorFormat::Yuv420Planar, true ; "i420 planar wraps")]
#[test_case(HardwareFormat::Yv12, ColorFormat::Yuv420Planar, false ; "yv12 planar copies")]
fn decoder_output_reaches_client(
    format: HardwareFormat,
    client: ColorFormat,
    wrapped: bool,
) -> BufferResult<()> {
    init_logging();
    let block = filled_block(16, 16, format, 10)?;
    let pool = MemoryBlockPool::new();
    let buffer = ConstGraphicBlockBuffer::allocate(format_with(client), codec_output(&block)?, pool_alloc(&pool))?;
    assert_eq!(buffer.is_wrapped(), wrapped);
    assert_eq!(pool.in_use_count(), if wrapped { 0 } else { 1 });

    // Whatever the path, the client reads the decoded luma through the image description.
    let image = MediaImage::from_bytes(buffer.format().find_buffer(KEY_IMAGE_DATA).unwrap())?;
    assert_eq!(&image, buffer.image_data().unwrap());
    let luma = &image.planes[PLANE_Y];
    let view = block.map()?;
    for y in 0..16 {
        for x in 0..16 {
            let offset = luma.offset as usize + y * luma.row_inc as usize + x;
            assert_eq!(buffer.data()[offset], view.data()[y * 16 + x]);
        }
    }
    Ok(())
}

#[test]
fn encoder_input_reaches_codec() -> BufferResult<()> {
    let block = GraphicBlock::allocate(16, 16, HardwareFormat::Nv21)?;
    let pool = MemoryBlockPool::new();
    let mut buffer = GraphicBlockBuffer::allocate(
        format_with(ColorFormat::Yuv420SemiPlanar),
        block.clone(),
        pool_alloc(&pool),
    )?;
    assert!(!buffer.is_wrapped());
    // The client writes NV12.
    {
        let mut base = buffer.base_mut()?;
        base[..256].fill(16);
        for pair in base[256..384].chunks_exact_mut(2) {
            pair.copy_from_slice(&[100, 200]);
        }
    }
    let output = buffer.to_hardware_buffer().unwrap();
    let view = output.graphic_blocks()[0].map()?;
    assert!(view.data()[..256].iter().all(|&byte| byte == 16));
    for pair in view.data()[256..384].chunks_exact(2) {
        assert_eq!(pair, &[200, 100]);
    }
    buffer.clear_hardware_references();
    drop(buffer);
    assert_eq!(pool.free_count(), 1);
    Ok(())
}

#[test]
fn pooled_back_buffers_are_reused() -> BufferResult<()> {
    let pool = MemoryBlockPool::new();
    for seed in 0..3 {
        let block = filled_block(16, 16, HardwareFormat::Nv12, seed)?;
        let buffer = ConstGraphicBlockBuffer::allocate(
            format_with(ColorFormat::Yuv420Planar),
            codec_output(&block)?,
            pool_alloc(&pool),
        )?;
        assert_eq!(buffer.capacity(), 384);
    }
    assert_eq!(pool.allocation_count(), 1);
    Ok(())
}

#[test]
fn empty_buffer_receives_a_later_frame() -> BufferResult<()> {
    let mut format = format_with(ColorFormat::Yuv420Planar);
    format.set_i32(KEY_WIDTH, 16);
    format.set_i32(KEY_HEIGHT, 16);
    let mut buffer = ConstGraphicBlockBuffer::allocate_empty(format, |size| ByteBuffer::new(size).ok())?;
    let block = filled_block(16, 16, HardwareFormat::Nv12, 11)?;
    let source = codec_output(&block)?;
    assert!(buffer.can_copy(Some(&source)));
    buffer.copy(Some(&source))?;
    let view = block.map()?;
    assert_eq!(&buffer.data()[..256], &view.data()[..256]);
    assert_eq!(buffer.data()[256], view.data()[256]);
    assert_eq!(buffer.data()[320], view.data()[257]);
    assert!(Arc::ptr_eq(&buffer.to_hardware_buffer().unwrap(), &source));
    buffer.clear_hardware_references();
    assert!(buffer.to_hardware_buffer().is_none());
    // Still holds the copied pixels.
    assert_eq!(buffer.size(), 384);
    Ok(())
}

#[test]
fn oversized_linear_block_is_reported_as_corrupt() -> BufferResult<()> {
    let block = LinearBlock::allocate(32)?;
    block.map()?.data_mut().fill(0xaa);
    let source = HardwareBuffer::create_linear_buffer(block.share(0, 32, Fence::signaled())?);
    let mut buffer = LocalLinearBuffer::new(MediaFormat::new(), ByteBuffer::new(16)?);
    buffer.set_range(0, 4)?;
    assert!(!buffer.can_copy(Some(&source)));
    assert_eq!(buffer.copy(Some(&source)), Err(BufferError::Corrupted));
    assert!(buffer.base().iter().all(|&byte| byte == 0));
    assert_eq!((buffer.offset(), buffer.size()), (0, 4));
    Ok(())
}

#[test]
fn linear_round_trip_through_codec() -> BufferResult<()> {
    let allocator = HeapAllocator::default();
    let mut input = LinearBlockBuffer::allocate(MediaFormat::new(), allocator.allocate_linear(64)?)?;
    input.base_mut()?[..5].copy_from_slice(b"hello");
    input.set_range(0, 5)?;
    let shared = input.to_hardware_buffer().unwrap();

    let output = ConstLinearBlockBuffer::allocate(MediaFormat::new(), shared.clone())?;
    assert_eq!(*output.data(), *b"hello");
    let mut local = LocalLinearBuffer::new(MediaFormat::new(), ByteBuffer::new(8)?);
    assert!(local.can_copy(Some(&shared)));
    local.copy(Some(&shared))?;
    assert_eq!(*local.data(), *b"hello");
    Ok(())
}

#[test]
fn decrypt_session_restarts_at_block_start() -> BufferResult<()> {
    let heap = SharedMemory::from_slice(&[7; 256])?;
    let memory = SecureMemory::new(heap, 0, 256)?;
    let mut buffer = EncryptedLinearBlockBuffer::new(MediaFormat::new(), LinearBlock::allocate(1024)?, memory.clone(), 1);
    {
        let mut mapped = buffer.mapped_block()?;
        mapped.copy_decrypted_content(&memory, 200)?;
        assert_eq!(mapped.offset(), 200);
    }
    {
        let mut mapped = buffer.mapped_block()?;
        assert_eq!(mapped.offset(), 0);
        mapped.copy_decrypted_content(&memory, 256)?;
        mapped.copy_decrypted_content(&memory, 256)?;
        mapped.copy_decrypted_content(&memory, 256)?;
        mapped.copy_decrypted_content(&memory, 256)?;
        assert_eq!(
            mapped.copy_decrypted_content(&memory, 1),
            Err(BufferError::NoMemory)
        );
    }
    Ok(())
}

#[test]
fn dummy_buffer_carries_the_codec_buffer() -> BufferResult<()> {
    let block = filled_block(16, 16, HardwareFormat::Nv12, 12)?;
    let source = codec_output(&block)?;
    let mut buffer = DummyContainerBuffer::new(MediaFormat::new(), None)?;
    assert!(buffer.can_copy(Some(&source)));
    buffer.copy(Some(&source))?;
    assert_eq!(buffer.size(), 1);
    let carried = buffer.to_hardware_buffer().unwrap();
    assert_eq!(carried.graphic_blocks()[0].handle(), block.handle());
    Ok(())
}
