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
use crate::layout::*;
use crate::utils::align;
use crate::utils::div_up;
use crate::*;

use std::sync::Arc;

/// Pixel formats a graphic allocation can be requested in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HardwareFormat {
    Nv12,
    Nv21,
    I420,
    Yv12,
    P010,
    Rgb888,
    Rgba8888,
    /// 8-bit 4:2:0 in a layout of the allocator's choosing.
    #[default]
    Ycbcr420Flexible,
}

type CanonicalLayout = (PlanarLayout, [usize; MAX_PLANE_COUNT], usize);

impl HardwareFormat {
    /// Returns the plane layout, the plane origins and the allocation size for a buffer of this
    /// format. Luma rows are aligned to 16 samples and the height to 2 rows.
    fn canonical_layout(&self, width: u32, height: u32) -> BufferResult<CanonicalLayout> {
        let aligned_width = usize_from_u32(align(width, 16)?)?;
        let vstride = usize_from_u32(align(height, 2)?)?;
        match self {
            Self::Nv12 | Self::Nv21 | Self::Ycbcr420Flexible | Self::I420 | Self::Yv12 => {
                let stride = aligned_width;
                let luma_size = checked_mul!(stride, vstride)?;
                let chroma_stride = stride / 2;
                let chroma_size = chroma_stride * (vstride / 2);
                let row_inc = i32::try_from(stride).or(Err(BufferError::BadValue))?;
                let total_size = checked_add!(luma_size, 2 * chroma_size)?;
                Ok(match self {
                    Self::Nv21 => (
                        PlanarLayout::nv21(row_inc),
                        [0, luma_size + 1, luma_size, 0],
                        total_size,
                    ),
                    Self::I420 => (
                        PlanarLayout::i420(row_inc, row_inc / 2),
                        [0, luma_size, luma_size + chroma_size, 0],
                        total_size,
                    ),
                    Self::Yv12 => (
                        PlanarLayout::i420(row_inc, row_inc / 2),
                        [0, luma_size + chroma_size, luma_size, 0],
                        total_size,
                    ),
                    _ => (
                        PlanarLayout::nv12(row_inc),
                        [0, luma_size, luma_size + 1, 0],
                        total_size,
                    ),
                })
            }
            Self::P010 => {
                let stride = checked_mul!(aligned_width, 2)?;
                let luma_size = checked_mul!(stride, vstride)?;
                let row_inc = i32::try_from(stride).or(Err(BufferError::BadValue))?;
                Ok((
                    PlanarLayout::p010(row_inc),
                    [0, luma_size, luma_size + 2, 0],
                    checked_add!(luma_size, luma_size / 2)?,
                ))
            }
            Self::Rgb888 | Self::Rgba8888 => {
                let with_alpha = *self == Self::Rgba8888;
                let stride = checked_mul!(aligned_width, if with_alpha { 4 } else { 3 })?;
                let row_inc = i32::try_from(stride).or(Err(BufferError::BadValue))?;
                Ok((
                    PlanarLayout::packed_rgb(row_inc, with_alpha),
                    [0, 1, 2, if with_alpha { 3 } else { 0 }],
                    checked_mul!(stride, usize_from_u32(height)?)?,
                ))
            }
        }
    }
}

/// A two dimensional hardware allocation and the geometry of its planes.
#[derive(Debug)]
pub struct GraphicAllocation {
    memory: Arc<SharedMemory>,
    width: u32,
    height: u32,
    layout: PlanarLayout,
    plane_origins: [usize; MAX_PLANE_COUNT],
}

impl GraphicAllocation {
    pub fn allocate(width: u32, height: u32, format: HardwareFormat) -> BufferResult<Arc<Self>> {
        if width == 0 || height == 0 {
            return BufferError::bad_value();
        }
        let (layout, plane_origins, size) = format.canonical_layout(width, height)?;
        Self::with_layout(
            SharedMemory::new(size)?,
            width,
            height,
            layout,
            &plane_origins[..layout.plane_count()],
        )
    }

    /// Describes existing memory with an arbitrary layout. `plane_origins` holds the byte offset
    /// of the first sample of each plane. Every sample addressed by the layout must be inside
    /// `memory`.
    pub fn with_layout(
        memory: Arc<SharedMemory>,
        width: u32,
        height: u32,
        layout: PlanarLayout,
        plane_origins: &[usize],
    ) -> BufferResult<Arc<Self>> {
        if layout.num_planes == 0
            || layout.num_planes as usize > MAX_PLANE_COUNT
            || plane_origins.len() != layout.plane_count()
        {
            return BufferError::bad_value();
        }
        let memory_size = isize_from_usize(memory.len())?;
        let mut origins = [0usize; MAX_PLANE_COUNT];
        for ((plane, &origin), slot) in layout
            .active_planes()
            .iter()
            .zip(plane_origins)
            .zip(origins.iter_mut())
        {
            if plane.col_sampling == 0 || plane.row_sampling == 0 || plane.allocated_depth == 0 {
                return BufferError::bad_value();
            }
            let cols = div_up(width, plane.col_sampling);
            let rows = div_up(height, plane.row_sampling);
            let origin_offset = isize_from_usize(origin)?;
            if checked_add!(origin_offset, plane.min_offset(cols, rows))? < 0
                || checked_add!(origin_offset, plane.max_offset(cols, rows))? > memory_size
            {
                log::debug!("plane {plane:?} at {origin} does not fit in {memory_size} bytes");
                return BufferError::bad_value();
            }
            *slot = origin;
        }
        Ok(Arc::new(Self {
            memory,
            width,
            height,
            layout,
            plane_origins: origins,
        }))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> &PlanarLayout {
        &self.layout
    }

    pub fn memory(&self) -> &Arc<SharedMemory> {
        &self.memory
    }

    fn map(&self, crop: Rect, writable: bool) -> BufferResult<GraphicView> {
        if !crop.fits_in(self.width, self.height) {
            return BufferError::map_failed();
        }
        let mut plane_origins = [0usize; MAX_PLANE_COUNT];
        for (index, plane) in self.layout.active_planes().iter().enumerate() {
            let col = isize_from_u32(crop.left / plane.col_sampling)?;
            let row = isize_from_u32(crop.top / plane.row_sampling)?;
            let origin = isize_from_usize(self.plane_origins[index])?
                + col * isize_from_i32(plane.col_inc)?
                + row * isize_from_i32(plane.row_inc)?;
            plane_origins[index] = usize_from_isize(origin).or(Err(BufferError::MapFailed))?;
        }
        Ok(GraphicView {
            memory: MemoryRegion::whole(self.memory.clone()),
            layout: self.layout,
            plane_origins,
            crop,
            writable,
        })
    }
}

/// A writable graphic allocation.
#[derive(Clone, Debug)]
pub struct GraphicBlock {
    allocation: Arc<GraphicAllocation>,
    crop: Rect,
}

impl GraphicBlock {
    pub fn new(allocation: Arc<GraphicAllocation>) -> Self {
        let crop = Rect::new(allocation.width, allocation.height);
        Self { allocation, crop }
    }

    pub fn allocate(width: u32, height: u32, format: HardwareFormat) -> BufferResult<Self> {
        Ok(Self::new(GraphicAllocation::allocate(width, height, format)?))
    }

    pub fn with_crop(allocation: Arc<GraphicAllocation>, crop: Rect) -> BufferResult<Self> {
        if !crop.fits_in(allocation.width, allocation.height) {
            return BufferError::bad_value();
        }
        Ok(Self { allocation, crop })
    }

    pub fn width(&self) -> u32 {
        self.allocation.width
    }

    pub fn height(&self) -> u32 {
        self.allocation.height
    }

    pub fn crop(&self) -> Rect {
        self.crop
    }

    pub fn allocation(&self) -> &Arc<GraphicAllocation> {
        &self.allocation
    }

    pub fn handle(&self) -> NativeHandle {
        NativeHandle(self.allocation.memory.id())
    }

    pub fn map(&self) -> BufferResult<GraphicView> {
        self.allocation.map(self.crop, true)
    }

    pub fn share(&self, crop: Rect, fence: Fence) -> BufferResult<ConstGraphicBlock> {
        if !crop.fits_in(self.width(), self.height()) {
            return BufferError::bad_value();
        }
        Ok(ConstGraphicBlock {
            allocation: self.allocation.clone(),
            crop,
            fence,
        })
    }
}

/// A read-only graphic allocation, usable once its fence is signaled.
#[derive(Clone, Debug)]
pub struct ConstGraphicBlock {
    allocation: Arc<GraphicAllocation>,
    crop: Rect,
    fence: Fence,
}

impl ConstGraphicBlock {
    pub fn width(&self) -> u32 {
        self.allocation.width
    }

    pub fn height(&self) -> u32 {
        self.allocation.height
    }

    pub fn crop(&self) -> Rect {
        self.crop
    }

    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    pub fn allocation(&self) -> &Arc<GraphicAllocation> {
        &self.allocation
    }

    pub fn handle(&self) -> NativeHandle {
        NativeHandle(self.allocation.memory.id())
    }

    pub fn map(&self) -> BufferResult<GraphicView> {
        self.fence.wait(FENCE_WAIT_TIMEOUT)?;
        self.allocation.map(self.crop, false)
    }
}

/// Mapped planes of a graphic allocation, restricted to a crop rectangle.
#[derive(Clone, Debug)]
pub struct GraphicView {
    memory: MemoryRegion,
    layout: PlanarLayout,
    plane_origins: [usize; MAX_PLANE_COUNT],
    crop: Rect,
    writable: bool,
}

impl GraphicView {
    pub fn width(&self) -> u32 {
        self.crop.width
    }

    pub fn height(&self) -> u32 {
        self.crop.height
    }

    pub fn crop(&self) -> Rect {
        self.crop
    }

    pub fn layout(&self) -> &PlanarLayout {
        &self.layout
    }

    /// Byte offset into [`GraphicView::data`] of the first (top left, after cropping) sample of
    /// plane `index`.
    pub fn plane_origin(&self, index: usize) -> usize {
        self.plane_origins[index]
    }

    pub fn memory(&self) -> &MemoryRegion {
        &self.memory
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Locks the mapped allocation for reading until the returned value is dropped.
    pub fn data(&self) -> MemoryRef<'_> {
        self.memory.read()
    }

    pub fn data_mut(&mut self) -> BufferResult<MemoryMut<'_>> {
        if !self.writable {
            log::debug!("attempt to write into a read-only graphic view");
            return BufferError::bad_value();
        }
        Ok(self.memory.write())
    }
}
