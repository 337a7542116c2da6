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

//! Plane geometry of mapped graphic allocations.

use crate::utils::div_up;

pub const MAX_PLANE_COUNT: usize = 4;

pub const PLANE_Y: usize = 0;
pub const PLANE_U: usize = 1;
pub const PLANE_V: usize = 2;
pub const PLANE_R: usize = 0;
pub const PLANE_G: usize = 1;
pub const PLANE_B: usize = 2;
pub const PLANE_A: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    #[default]
    Y,
    Cb,
    Cr,
    R,
    G,
    B,
    A,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    #[default]
    Native,
    Little,
    Big,
}

impl Endianness {
    pub fn is_native(&self) -> bool {
        match self {
            Endianness::Native => true,
            Endianness::Little => cfg!(target_endian = "little"),
            Endianness::Big => cfg!(target_endian = "big"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutType {
    #[default]
    Unknown,
    Yuv,
    Yuva,
    Rgb,
    Rgba,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneInfo {
    pub channel: Channel,
    /// Byte distance between horizontally adjacent samples.
    pub col_inc: i32,
    /// Byte distance between vertically adjacent samples.
    pub row_inc: i32,
    pub col_sampling: u32,
    pub row_sampling: u32,
    pub allocated_depth: u32,
    pub bit_depth: u32,
    pub right_shift: u32,
    pub endianness: Endianness,
    /// Index of the plane that owns the memory this plane is interleaved into.
    pub root_index: usize,
    /// Byte offset of this plane's first sample from the first sample of its root plane.
    pub offset: u32,
}

impl Default for PlaneInfo {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            col_inc: 1,
            row_inc: 0,
            col_sampling: 1,
            row_sampling: 1,
            allocated_depth: 8,
            bit_depth: 8,
            right_shift: 0,
            endianness: Endianness::default(),
            root_index: 0,
            offset: 0,
        }
    }
}

impl PlaneInfo {
    pub fn bytes_per_sample(&self) -> u32 {
        div_up(self.allocated_depth, 8)
    }

    /// Smallest byte offset addressed by a `cols` x `rows` region, relative to the plane origin.
    pub fn min_offset(&self, cols: u32, rows: u32) -> isize {
        let mut offset: isize = 0;
        if cols > 0 && self.col_inc < 0 {
            offset += self.col_inc as isize * (cols as isize - 1);
        }
        if rows > 0 && self.row_inc < 0 {
            offset += self.row_inc as isize * (rows as isize - 1);
        }
        offset
    }

    /// One past the largest byte offset addressed by a `cols` x `rows` region, relative to the
    /// plane origin.
    pub fn max_offset(&self, cols: u32, rows: u32) -> isize {
        let mut offset = self.bytes_per_sample() as isize;
        if cols > 0 && self.col_inc > 0 {
            offset += self.col_inc as isize * (cols as isize - 1);
        }
        if rows > 0 && self.row_inc > 0 {
            offset += self.row_inc as isize * (rows as isize - 1);
        }
        offset
    }

    pub fn has_420_sampling(&self, full_resolution: bool) -> bool {
        let sampling = if full_resolution { 1 } else { 2 };
        self.col_sampling == sampling && self.row_sampling == sampling
    }

    pub fn has_depth(&self, allocated_depth: u32, bit_depth: u32) -> bool {
        self.allocated_depth == allocated_depth && self.bit_depth == bit_depth
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanarLayout {
    pub layout_type: LayoutType,
    pub num_planes: u32,
    /// Number of distinct memory planes the planes are interleaved into.
    pub root_planes: u32,
    pub planes: [PlaneInfo; MAX_PLANE_COUNT],
}

impl PlanarLayout {
    pub fn plane_count(&self) -> usize {
        (self.num_planes as usize).min(MAX_PLANE_COUNT)
    }

    pub fn active_planes(&self) -> &[PlaneInfo] {
        &self.planes[..self.plane_count()]
    }

    fn yuv420(root_planes: u32, depth: (u32, u32, u32), y: (i32, i32), chroma: (i32, i32)) -> Self {
        let (allocated_depth, bit_depth, right_shift) = depth;
        let base = PlaneInfo {
            allocated_depth,
            bit_depth,
            right_shift,
            ..Default::default()
        };
        let chroma_plane = |channel| PlaneInfo {
            channel,
            col_inc: chroma.0,
            row_inc: chroma.1,
            col_sampling: 2,
            row_sampling: 2,
            ..base
        };
        Self {
            layout_type: LayoutType::Yuv,
            num_planes: 3,
            root_planes,
            planes: [
                PlaneInfo {
                    channel: Channel::Y,
                    col_inc: y.0,
                    row_inc: y.1,
                    root_index: PLANE_Y,
                    ..base
                },
                chroma_plane(Channel::Cb),
                chroma_plane(Channel::Cr),
                PlaneInfo::default(),
            ],
        }
    }

    /// Semi-planar 8-bit 4:2:0 with Cb first in each chroma pair.
    pub fn nv12(stride: i32) -> Self {
        let mut layout = Self::yuv420(2, (8, 8, 0), (1, stride), (2, stride));
        layout.planes[PLANE_U].root_index = PLANE_U;
        layout.planes[PLANE_V].root_index = PLANE_U;
        layout.planes[PLANE_V].offset = 1;
        layout
    }

    /// Semi-planar 8-bit 4:2:0 with Cr first in each chroma pair.
    pub fn nv21(stride: i32) -> Self {
        let mut layout = Self::yuv420(2, (8, 8, 0), (1, stride), (2, stride));
        layout.planes[PLANE_U].root_index = PLANE_V;
        layout.planes[PLANE_U].offset = 1;
        layout.planes[PLANE_V].root_index = PLANE_V;
        layout
    }

    /// Fully planar 8-bit 4:2:0. The relative order of the chroma planes in memory is decided by
    /// the plane origins, not by the layout.
    pub fn i420(stride: i32, chroma_stride: i32) -> Self {
        let mut layout = Self::yuv420(3, (8, 8, 0), (1, stride), (1, chroma_stride));
        layout.planes[PLANE_U].root_index = PLANE_U;
        layout.planes[PLANE_V].root_index = PLANE_V;
        layout
    }

    /// Semi-planar 4:2:0 with 10 meaningful bits stored in the high bits of 16-bit words.
    pub fn p010(stride: i32) -> Self {
        let mut layout = Self::yuv420(2, (16, 10, 6), (2, stride), (4, stride));
        layout.planes[PLANE_U].root_index = PLANE_U;
        layout.planes[PLANE_V].root_index = PLANE_U;
        layout.planes[PLANE_V].offset = 2;
        layout
    }

    /// Packed 8-bit RGB (3 channels) or RGBA (4 channels) in a single memory plane.
    pub fn packed_rgb(stride: i32, with_alpha: bool) -> Self {
        let channels = if with_alpha { 4 } else { 3 };
        let mut planes = [PlaneInfo::default(); MAX_PLANE_COUNT];
        for (index, channel) in [Channel::R, Channel::G, Channel::B, Channel::A]
            .into_iter()
            .take(channels)
            .enumerate()
        {
            planes[index] = PlaneInfo {
                channel,
                col_inc: channels as i32,
                row_inc: stride,
                root_index: 0,
                offset: index as u32,
                ..Default::default()
            };
        }
        Self {
            layout_type: if with_alpha {
                LayoutType::Rgba
            } else {
                LayoutType::Rgb
            },
            num_planes: channels as u32,
            root_planes: 1,
            planes,
        }
    }
}
