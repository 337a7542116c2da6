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
use crate::layout::MAX_PLANE_COUNT;
use crate::utils::div_up;
use crate::*;

pub use crate::layout::{PLANE_U, PLANE_V, PLANE_Y};

const HEADER_WORDS: usize = 6;
const PLANE_WORDS: usize = 5;
/// Size of the serialized descriptor, matching the platform MediaImage2 struct.
pub const MEDIA_IMAGE_SIZE: usize = (HEADER_WORDS + MAX_PLANE_COUNT * PLANE_WORDS) * 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageType {
    #[default]
    Unknown,
    Yuv,
    Yuva,
    Rgb,
    Rgba,
}

impl From<ImageType> for u32 {
    fn from(image_type: ImageType) -> Self {
        match image_type {
            ImageType::Unknown => 0,
            ImageType::Yuv => 1,
            ImageType::Rgb => 2,
            ImageType::Rgba => 3,
            ImageType::Yuva => 0x100,
        }
    }
}

impl From<u32> for ImageType {
    fn from(value: u32) -> Self {
        match value {
            1 => ImageType::Yuv,
            2 => ImageType::Rgb,
            3 => ImageType::Rgba,
            0x100 => ImageType::Yuva,
            _ => ImageType::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImagePlane {
    pub offset: u32,
    pub col_inc: i32,
    pub row_inc: i32,
    pub horiz_subsampling: u32,
    pub vert_subsampling: u32,
}

impl ImagePlane {
    fn new(offset: u32, col_inc: i32, row_inc: i32, subsampling: u32) -> Self {
        Self {
            offset,
            col_inc,
            row_inc,
            horiz_subsampling: subsampling,
            vert_subsampling: subsampling,
        }
    }
}

/// Describes how the bytes of a flat buffer are to be interpreted as image planes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MediaImage {
    pub image_type: ImageType,
    pub num_planes: u32,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub bit_depth_allocated: u32,
    pub planes: [ImagePlane; MAX_PLANE_COUNT],
}

impl MediaImage {
    fn yuv420_8bit(width: u32, height: u32, planes: [ImagePlane; 3]) -> Self {
        let mut image = Self {
            image_type: ImageType::Yuv,
            num_planes: 3,
            width,
            height,
            bit_depth: 8,
            bit_depth_allocated: 8,
            ..Default::default()
        };
        image.planes[..3].copy_from_slice(&planes);
        image
    }

    /// Planar 8-bit 4:2:0 with the V plane following the U plane.
    pub fn yuv420_planar(width: u32, height: u32, stride: u32, vstride: u32) -> BufferResult<Self> {
        let luma_size = checked_mul!(stride, vstride)?;
        let chroma_stride = i32_from_u32(stride / 2)?;
        Ok(Self::yuv420_8bit(
            width,
            height,
            [
                ImagePlane::new(0, 1, i32_from_u32(stride)?, 1),
                ImagePlane::new(luma_size, 1, chroma_stride, 2),
                ImagePlane::new(checked_mul!(luma_size, 5)? / 4, 1, chroma_stride, 2),
            ],
        ))
    }

    /// Semi-planar 8-bit 4:2:0 with U and V interleaved, U first.
    pub fn yuv420_semi_planar(
        width: u32,
        height: u32,
        stride: u32,
        vstride: u32,
    ) -> BufferResult<Self> {
        let luma_size = checked_mul!(stride, vstride)?;
        let row_inc = i32_from_u32(stride)?;
        Ok(Self::yuv420_8bit(
            width,
            height,
            [
                ImagePlane::new(0, 1, row_inc, 1),
                ImagePlane::new(luma_size, 2, row_inc, 2),
                ImagePlane::new(checked_add!(luma_size, 1)?, 2, row_inc, 2),
            ],
        ))
    }

    /// Semi-planar 4:2:0 with 10 meaningful bits per 16-bit sample. `stride` is in bytes.
    pub fn yuv420_p010(width: u32, height: u32, stride: u32, vstride: u32) -> BufferResult<Self> {
        let luma_size = checked_mul!(stride, vstride)?;
        let row_inc = i32_from_u32(stride)?;
        let mut image = Self::yuv420_8bit(
            width,
            height,
            [
                ImagePlane::new(0, 2, row_inc, 1),
                ImagePlane::new(luma_size, 4, row_inc, 2),
                ImagePlane::new(checked_add!(luma_size, 2)?, 4, row_inc, 2),
            ],
        );
        image.bit_depth = 10;
        image.bit_depth_allocated = 16;
        Ok(image)
    }

    pub fn plane_count(&self) -> usize {
        (self.num_planes as usize).min(MAX_PLANE_COUNT)
    }

    pub fn bytes_per_sample(&self) -> u32 {
        div_up(self.bit_depth_allocated, 8)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut words: Vec<u32> = vec![
            self.image_type.into(),
            self.num_planes,
            self.width,
            self.height,
            self.bit_depth,
            self.bit_depth_allocated,
        ];
        for plane in &self.planes {
            words.extend_from_slice(&[
                plane.offset,
                plane.col_inc as u32,
                plane.row_inc as u32,
                plane.horiz_subsampling,
                plane.vert_subsampling,
            ]);
        }
        words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    pub fn from_bytes(data: &[u8]) -> BufferResult<Self> {
        if data.len() != MEDIA_IMAGE_SIZE {
            return BufferError::bad_value();
        }
        let words: Vec<u32> = data
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let mut image = Self {
            image_type: words[0].into(),
            num_planes: words[1],
            width: words[2],
            height: words[3],
            bit_depth: words[4],
            bit_depth_allocated: words[5],
            ..Default::default()
        };
        if image.num_planes as usize > MAX_PLANE_COUNT {
            return BufferError::bad_value();
        }
        for (plane, fields) in image
            .planes
            .iter_mut()
            .zip(words[HEADER_WORDS..].chunks_exact(PLANE_WORDS))
        {
            *plane = ImagePlane {
                offset: fields[0],
                col_inc: fields[1] as i32,
                row_inc: fields[2] as i32,
                horiz_subsampling: fields[3],
                vert_subsampling: fields[4],
            };
        }
        Ok(image)
    }
}
