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

//! Pixel copies between mapped graphic views and flat buffers described by a [`MediaImage`].
//!
//! Pairs of the canonical 4:2:0 layouts (NV12, NV21, I420 and P010) take a fast path that
//! copies whole rows. Everything else goes through a generic per-plane copy that validates
//! depths, sampling and endianness first. Every access is bounds checked against the slices.

use crate::hardware::GraphicView;
use crate::image::*;
use crate::internal_utils::*;
use crate::layout::*;
use crate::reformat::classify::*;
use crate::utils::div_up;
use crate::*;

/// Addressing of one plane inside a byte slice.
#[derive(Clone, Copy, Debug)]
struct PlaneGeometry {
    origin: isize,
    col_inc: isize,
    row_inc: isize,
    width: usize,
    height: usize,
    sample_bytes: usize,
}

impl PlaneGeometry {
    fn for_view(view: &GraphicView, index: usize) -> BufferResult<Self> {
        let plane = &view.layout().planes[index];
        Ok(Self {
            origin: isize_from_usize(view.plane_origin(index))?,
            col_inc: isize_from_i32(plane.col_inc)?,
            row_inc: isize_from_i32(plane.row_inc)?,
            width: usize_from_u32(div_up(view.width(), plane.col_sampling))?,
            height: usize_from_u32(div_up(view.height(), plane.row_sampling))?,
            sample_bytes: usize_from_u32(plane.bytes_per_sample())?,
        })
    }

    fn for_image(image: &MediaImage, index: usize) -> BufferResult<Self> {
        let plane = &image.planes[index];
        if plane.horiz_subsampling == 0 || plane.vert_subsampling == 0 {
            return BufferError::bad_value();
        }
        Ok(Self {
            origin: isize_from_u32(plane.offset)?,
            col_inc: isize_from_i32(plane.col_inc)?,
            row_inc: isize_from_i32(plane.row_inc)?,
            width: usize_from_u32(div_up(image.width, plane.horiz_subsampling))?,
            height: usize_from_u32(div_up(image.height, plane.vert_subsampling))?,
            sample_bytes: usize_from_u32(image.bytes_per_sample())?,
        })
    }

    /// The chroma pairs of an interleaved layout seen as one plane of packed samples, twice as
    /// wide as each chroma plane.
    fn interleaved_pairs(&self) -> Self {
        Self {
            col_inc: self.sample_bytes as isize,
            width: self.width * 2,
            ..*self
        }
    }

    fn is_packed(&self) -> bool {
        self.col_inc == self.sample_bytes as isize
    }

    fn row_bytes(&self) -> usize {
        self.width * self.sample_bytes
    }

    /// Checks that every sample of the plane lies inside a slice of `len` bytes.
    fn validate(&self, len: usize) -> BufferResult<()> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let last_col = isize_from_usize(self.width - 1)?;
        let last_row = isize_from_usize(self.height - 1)?;
        let col_extent = checked_mul!(self.col_inc, last_col)?;
        let row_extent = checked_mul!(self.row_inc, last_row)?;
        let min = self.origin + col_extent.min(0) + row_extent.min(0);
        let max = checked_add!(
            checked_add!(self.origin, col_extent.max(0))?,
            row_extent.max(0)
        )?;
        let max = checked_add!(max, isize_from_usize(self.sample_bytes)?)?;
        if min < 0 || max > isize_from_usize(len)? {
            log::debug!("plane {self:?} does not fit in {len} bytes");
            return BufferError::bad_value();
        }
        Ok(())
    }

    // Only meaningful after a successful validate().
    fn offset(&self, x: usize, y: usize) -> usize {
        (self.origin + x as isize * self.col_inc + y as isize * self.row_inc) as usize
    }
}

fn check_plane_pair(
    dst_len: usize,
    dst_plane: &PlaneGeometry,
    src_len: usize,
    src_plane: &PlaneGeometry,
) -> BufferResult<()> {
    if dst_plane.width != src_plane.width
        || dst_plane.height != src_plane.height
        || dst_plane.sample_bytes != src_plane.sample_bytes
    {
        return BufferError::bad_value();
    }
    dst_plane.validate(dst_len)?;
    src_plane.validate(src_len)
}

fn copy_plane(
    dst: &mut [u8],
    dst_plane: &PlaneGeometry,
    src: &[u8],
    src_plane: &PlaneGeometry,
) -> BufferResult<()> {
    check_plane_pair(dst.len(), dst_plane, src.len(), src_plane)?;
    if dst_plane.width == 0 || dst_plane.height == 0 {
        return Ok(());
    }
    let sample_bytes = dst_plane.sample_bytes;
    let row_bytes = dst_plane.row_bytes();
    if dst_plane.is_packed() && src_plane.is_packed() {
        let contiguous = |plane: &PlaneGeometry| plane.row_inc == row_bytes as isize;
        if contiguous(dst_plane) && contiguous(src_plane) {
            let size = row_bytes * dst_plane.height;
            let dst_start = dst_plane.offset(0, 0);
            let src_start = src_plane.offset(0, 0);
            dst[dst_start..dst_start + size].copy_from_slice(&src[src_start..src_start + size]);
            return Ok(());
        }
        for y in 0..dst_plane.height {
            let dst_start = dst_plane.offset(0, y);
            let src_start = src_plane.offset(0, y);
            dst[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }
        return Ok(());
    }
    for y in 0..dst_plane.height {
        for x in 0..dst_plane.width {
            let dst_start = dst_plane.offset(x, y);
            let src_start = src_plane.offset(x, y);
            dst[dst_start..dst_start + sample_bytes]
                .copy_from_slice(&src[src_start..src_start + sample_bytes]);
        }
    }
    Ok(())
}

fn has_fast_path(view: PixelLayout, image: PixelLayout) -> bool {
    use PixelLayout::*;
    matches!(
        (view, image),
        (P010, P010) | (Nv12 | Nv21 | I420, Nv12 | Nv21 | I420)
    )
}

/// Checks the conditions the generic copy needs: both sides agree on the plane count, sampling
/// and sample size, and every sample is stored natively and MSB aligned.
fn check_generic_copy(image: &MediaImage, layout: &PlanarLayout) -> BufferResult<()> {
    if image.plane_count() != layout.plane_count() || image.num_planes != layout.num_planes {
        log::debug!(
            "plane count mismatch: image {} layout {}",
            image.num_planes,
            layout.num_planes
        );
        return BufferError::bad_value();
    }
    for (plane, image_plane) in layout.active_planes().iter().zip(image.planes.iter()) {
        if plane.col_sampling != image_plane.horiz_subsampling
            || plane.row_sampling != image_plane.vert_subsampling
            || plane.allocated_depth != image.bit_depth_allocated
            || plane.allocated_depth < plane.bit_depth
            || plane.right_shift != plane.allocated_depth - plane.bit_depth
            || (plane.bytes_per_sample() > 1 && !plane.endianness.is_native())
        {
            log::debug!("cannot copy plane {plane:?} into {image_plane:?}");
            return BufferError::bad_value();
        }
    }
    Ok(())
}

struct CopyPlan {
    plane_count: usize,
    view_planes: [PlaneGeometry; MAX_PLANE_COUNT],
    image_planes: [PlaneGeometry; MAX_PLANE_COUNT],
    /// Set when both sides interleave their chroma the same way. Holds the index of the chroma
    /// plane that comes first in each pair.
    interleaved_chroma: Option<usize>,
}

impl CopyPlan {
    fn new(image: &MediaImage, view: &GraphicView) -> BufferResult<Self> {
        if view.width() != image.width || view.height() != image.height {
            log::debug!(
                "view is {}x{} but image is {}x{}",
                view.width(),
                view.height(),
                image.width,
                image.height
            );
            return BufferError::bad_value();
        }
        let layout = view.layout();
        let view_kind = classify_layout(layout);
        let image_kind = classify_image(image);
        let sample_bytes = image.bytes_per_sample();
        let packed_luma = layout.planes[PLANE_Y].col_inc as u32 == sample_bytes
            && image.planes[PLANE_Y].col_inc as u32 == sample_bytes;
        let fast = has_fast_path(view_kind, image_kind) && packed_luma;
        if !fast {
            check_generic_copy(image, layout)?;
        }
        let plane_count = layout.plane_count();
        let placeholder = PlaneGeometry {
            origin: 0,
            col_inc: 0,
            row_inc: 0,
            width: 0,
            height: 0,
            sample_bytes: 0,
        };
        let mut view_planes = [placeholder; MAX_PLANE_COUNT];
        let mut image_planes = [placeholder; MAX_PLANE_COUNT];
        for index in 0..plane_count {
            view_planes[index] = PlaneGeometry::for_view(view, index)?;
            image_planes[index] = PlaneGeometry::for_image(image, index)?;
        }
        let interleaved_chroma = match (fast, view_kind, image_kind) {
            (true, PixelLayout::Nv12, PixelLayout::Nv12)
            | (true, PixelLayout::P010, PixelLayout::P010) => Some(PLANE_U),
            (true, PixelLayout::Nv21, PixelLayout::Nv21) => Some(PLANE_V),
            _ => None,
        };
        log::trace!("copy {view_kind:?} <-> {image_kind:?}, fast path: {fast}");
        Ok(Self {
            plane_count,
            view_planes,
            image_planes,
            interleaved_chroma,
        })
    }

    fn execute(
        &self,
        dst: &mut [u8],
        dst_planes: &[PlaneGeometry; MAX_PLANE_COUNT],
        src: &[u8],
        src_planes: &[PlaneGeometry; MAX_PLANE_COUNT],
    ) -> BufferResult<()> {
        let pairs: Vec<(PlaneGeometry, PlaneGeometry)> = match self.interleaved_chroma {
            Some(first) => vec![
                (dst_planes[PLANE_Y], src_planes[PLANE_Y]),
                (
                    dst_planes[first].interleaved_pairs(),
                    src_planes[first].interleaved_pairs(),
                ),
            ],
            None => dst_planes
                .iter()
                .zip(src_planes.iter())
                .take(self.plane_count)
                .map(|(dst_plane, src_plane)| (*dst_plane, *src_plane))
                .collect(),
        };
        // Nothing is written unless every plane fits.
        for (dst_plane, src_plane) in &pairs {
            check_plane_pair(dst.len(), dst_plane, src.len(), src_plane)?;
        }
        for (dst_plane, src_plane) in &pairs {
            copy_plane(dst, dst_plane, src, src_plane)?;
        }
        Ok(())
    }
}

/// Copies the pixels of `view` into `dst`, laid out as described by `image`.
pub fn copy_view_to_image(dst: &mut [u8], image: &MediaImage, view: &GraphicView) -> BufferResult<()> {
    let plan = CopyPlan::new(image, view)?;
    plan.execute(dst, &plan.image_planes, &view.data(), &plan.view_planes)
}

/// Copies the pixels of `src`, laid out as described by `image`, into `view`. Samples of the
/// underlying allocation outside the crop of `view` are left untouched.
pub fn copy_image_to_view(view: &mut GraphicView, src: &[u8], image: &MediaImage) -> BufferResult<()> {
    let plan = CopyPlan::new(image, view)?;
    plan.execute(&mut view.data_mut()?, &plan.view_planes, src, &plan.image_planes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::*;

    fn fill(view: &mut GraphicView) -> BufferResult<()> {
        for (index, byte) in view.data_mut()?.iter_mut().enumerate() {
            *byte = (index % 251) as u8;
        }
        Ok(())
    }

    #[test]
    fn nv12_view_to_i420_image() -> BufferResult<()> {
        let mut view = GraphicBlock::allocate(16, 16, HardwareFormat::Nv12)?.map()?;
        fill(&mut view)?;
        let image = MediaImage::yuv420_planar(16, 16, 16, 16)?;
        let mut dst = vec![0u8; 384];
        copy_view_to_image(&mut dst, &image, &view)?;
        let src = view.data();
        assert_eq!(&dst[..256], &src[..256]);
        for index in 0..64 {
            assert_eq!(dst[256 + index], src[256 + 2 * index]);
            assert_eq!(dst[320 + index], src[257 + 2 * index]);
        }
        Ok(())
    }

    #[test]
    fn copy_into_cropped_view_stays_inside_crop() -> BufferResult<()> {
        let allocation = GraphicAllocation::allocate(32, 32, HardwareFormat::Nv12)?;
        let block = GraphicBlock::with_crop(allocation, Rect::new(16, 16).at(4, 2))?;
        let mut view = block.map()?;
        let image = MediaImage::yuv420_semi_planar(16, 16, 16, 16)?;
        let src: Vec<u8> = (0..384).map(|index| 1 + (index % 200) as u8).collect();
        copy_image_to_view(&mut view, &src, &image)?;
        let data = view.data();
        assert_eq!(data.iter().filter(|byte| **byte != 0).count(), 256 + 128);
        assert_eq!(data[2 * 32 + 4], src[0]);
        // First chroma pair of the crop: row 1, column 2 of the chroma plane.
        assert_eq!(data[32 * 32 + 32 + 4], src[256]);
        assert_eq!(data[32 * 32 + 32 + 5], src[257]);
        Ok(())
    }

    #[test]
    fn mismatched_dimensions() -> BufferResult<()> {
        let view = GraphicBlock::allocate(16, 16, HardwareFormat::Nv12)?.map()?;
        let image = MediaImage::yuv420_planar(16, 8, 16, 16)?;
        let mut dst = vec![0u8; 384];
        assert_eq!(
            copy_view_to_image(&mut dst, &image, &view),
            Err(BufferError::BadValue)
        );
        Ok(())
    }

    #[test]
    fn generic_copy_rejects_depth_mismatch() -> BufferResult<()> {
        let view = GraphicBlock::allocate(16, 16, HardwareFormat::P010)?.map()?;
        let image = MediaImage::yuv420_planar(16, 16, 16, 16)?;
        let mut dst = vec![0u8; 768];
        assert_eq!(
            copy_view_to_image(&mut dst, &image, &view),
            Err(BufferError::BadValue)
        );
        Ok(())
    }

    #[test]
    fn short_destination_is_rejected() -> BufferResult<()> {
        let view = GraphicBlock::allocate(16, 16, HardwareFormat::I420)?.map()?;
        let image = MediaImage::yuv420_planar(16, 16, 16, 16)?;
        let mut dst = vec![0u8; 383];
        assert_eq!(
            copy_view_to_image(&mut dst, &image, &view),
            Err(BufferError::BadValue)
        );
        Ok(())
    }

    #[test]
    fn packed_rgb_goes_through_generic_copy() -> BufferResult<()> {
        let mut view = GraphicBlock::allocate(4, 4, HardwareFormat::Rgb888)?.map()?;
        fill(&mut view)?;
        let mut image = MediaImage {
            image_type: ImageType::Rgb,
            num_planes: 3,
            width: 4,
            height: 4,
            bit_depth: 8,
            bit_depth_allocated: 8,
            ..Default::default()
        };
        for (index, plane) in image.planes.iter_mut().take(3).enumerate() {
            *plane = ImagePlane {
                offset: index as u32,
                col_inc: 3,
                row_inc: 12,
                horiz_subsampling: 1,
                vert_subsampling: 1,
            };
        }
        let mut dst = vec![0u8; 48];
        copy_view_to_image(&mut dst, &image, &view)?;
        let src = view.data();
        for y in 0..4 {
            assert_eq!(&dst[y * 12..(y + 1) * 12], &src[y * 48..y * 48 + 12]);
        }
        Ok(())
    }
}
