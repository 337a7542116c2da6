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

//! Recognizes the plane layouts that have dedicated copy routines. The numeric conditions here
//! (subsampling, column increments, right shifts) are exactly what the routines in
//! [`crate::reformat::copy`] rely on.

use crate::image::*;
use crate::layout::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    I420,
    Nv12,
    Nv21,
    P010,
    /// 8-bit 4:2:0 with a chroma arrangement other than the ones above.
    Yuv420,
    /// 10-bit in 16-bit 4:2:0 with a chroma arrangement other than P010.
    Yuv420TenBit,
    Generic,
}

impl PixelLayout {
    pub fn has_fast_path(&self) -> bool {
        matches!(self, Self::I420 | Self::Nv12 | Self::Nv21 | Self::P010)
    }
}

fn has_yuv420_shape(layout: &PlanarLayout) -> bool {
    let planes = &layout.planes;
    layout.num_planes == 3
        && layout.layout_type == LayoutType::Yuv
        && planes[PLANE_Y].channel == Channel::Y
        && planes[PLANE_Y].has_420_sampling(true)
        && planes[PLANE_U].channel == Channel::Cb
        && planes[PLANE_U].has_420_sampling(false)
        && planes[PLANE_V].channel == Channel::Cr
        && planes[PLANE_V].has_420_sampling(false)
}

pub fn is_yuv420(layout: &PlanarLayout) -> bool {
    has_yuv420_shape(layout)
        && layout
            .active_planes()
            .iter()
            .all(|plane| plane.has_depth(8, 8) && plane.right_shift == 0)
}

// The right shift is not part of this check; P010 requires it separately.
pub fn is_yuv420_10bit(layout: &PlanarLayout) -> bool {
    has_yuv420_shape(layout)
        && layout
            .active_planes()
            .iter()
            .all(|plane| plane.has_depth(16, 10))
}

fn has_interleaved_chroma(layout: &PlanarLayout, col_inc: i32, first: usize, second_offset: u32) -> bool {
    let (u, v) = (&layout.planes[PLANE_U], &layout.planes[PLANE_V]);
    let (u_offset, v_offset) = if first == PLANE_U {
        (0, second_offset)
    } else {
        (second_offset, 0)
    };
    layout.root_planes == 2
        && u.col_inc == col_inc
        && u.root_index == first
        && u.offset == u_offset
        && v.col_inc == col_inc
        && v.root_index == first
        && v.offset == v_offset
}

pub fn is_nv12(layout: &PlanarLayout) -> bool {
    is_yuv420(layout) && has_interleaved_chroma(layout, 2, PLANE_U, 1)
}

pub fn is_nv21(layout: &PlanarLayout) -> bool {
    is_yuv420(layout) && has_interleaved_chroma(layout, 2, PLANE_V, 1)
}

pub fn is_p010(layout: &PlanarLayout) -> bool {
    is_yuv420_10bit(layout)
        && has_interleaved_chroma(layout, 4, PLANE_U, 2)
        && layout
            .active_planes()
            .iter()
            .all(|plane| plane.right_shift == 6)
}

pub fn is_i420(layout: &PlanarLayout) -> bool {
    let (u, v) = (&layout.planes[PLANE_U], &layout.planes[PLANE_V]);
    is_yuv420(layout)
        && layout.root_planes == 3
        && u.col_inc == 1
        && u.root_index == PLANE_U
        && u.offset == 0
        && v.col_inc == 1
        && v.root_index == PLANE_V
        && v.offset == 0
}

pub fn classify_layout(layout: &PlanarLayout) -> PixelLayout {
    if is_nv12(layout) {
        PixelLayout::Nv12
    } else if is_nv21(layout) {
        PixelLayout::Nv21
    } else if is_i420(layout) {
        PixelLayout::I420
    } else if is_p010(layout) {
        PixelLayout::P010
    } else if is_yuv420(layout) {
        PixelLayout::Yuv420
    } else if is_yuv420_10bit(layout) {
        PixelLayout::Yuv420TenBit
    } else {
        PixelLayout::Generic
    }
}

fn has_yuv420_image_shape(image: &MediaImage) -> bool {
    let planes = &image.planes;
    image.image_type == ImageType::Yuv
        && image.num_planes == 3
        && planes[PLANE_Y].horiz_subsampling == 1
        && planes[PLANE_Y].vert_subsampling == 1
        && planes[PLANE_U].horiz_subsampling == 2
        && planes[PLANE_U].vert_subsampling == 2
        && planes[PLANE_V].horiz_subsampling == 2
        && planes[PLANE_V].vert_subsampling == 2
}

pub fn is_yuv420_image(image: &MediaImage) -> bool {
    has_yuv420_image_shape(image) && image.bit_depth == 8 && image.bit_depth_allocated == 8
}

pub fn is_yuv420_10bit_image(image: &MediaImage) -> bool {
    has_yuv420_image_shape(image) && image.bit_depth == 10 && image.bit_depth_allocated == 16
}

fn chroma_col_incs(image: &MediaImage, col_inc: i32) -> bool {
    image.planes[PLANE_U].col_inc == col_inc && image.planes[PLANE_V].col_inc == col_inc
}

fn follows(image: &MediaImage, first: usize, second: usize, distance: u32) -> bool {
    image.planes[first].offset.checked_add(distance) == Some(image.planes[second].offset)
}

pub fn is_nv12_image(image: &MediaImage) -> bool {
    is_yuv420_image(image) && chroma_col_incs(image, 2) && follows(image, PLANE_U, PLANE_V, 1)
}

pub fn is_nv21_image(image: &MediaImage) -> bool {
    is_yuv420_image(image) && chroma_col_incs(image, 2) && follows(image, PLANE_V, PLANE_U, 1)
}

pub fn is_i420_image(image: &MediaImage) -> bool {
    is_yuv420_image(image)
        && chroma_col_incs(image, 1)
        && image.planes[PLANE_V].offset > image.planes[PLANE_U].offset
}

pub fn is_p010_image(image: &MediaImage) -> bool {
    is_yuv420_10bit_image(image) && chroma_col_incs(image, 4) && follows(image, PLANE_U, PLANE_V, 2)
}

pub fn classify_image(image: &MediaImage) -> PixelLayout {
    if is_nv12_image(image) {
        PixelLayout::Nv12
    } else if is_nv21_image(image) {
        PixelLayout::Nv21
    } else if is_i420_image(image) {
        PixelLayout::I420
    } else if is_p010_image(image) {
        PixelLayout::P010
    } else if is_yuv420_image(image) {
        PixelLayout::Yuv420
    } else if is_yuv420_10bit_image(image) {
        PixelLayout::Yuv420TenBit
    } else {
        PixelLayout::Generic
    }
}
