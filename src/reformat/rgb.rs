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

use crate::hardware::GraphicView;
use crate::internal_utils::*;
use crate::layout::*;
use crate::utils::div_up;
use crate::*;

// Rows are Y, U and V. Coefficients are scaled by 256.
const BT601_FULL: [[i32; 3]; 3] = [[77, 150, 29], [-43, -85, 128], [128, -107, -21]];
const BT601_LIMITED: [[i32; 3]; 3] = [[66, 129, 25], [-38, -74, 112], [112, -94, -18]];
const BT709_FULL: [[i32; 3]; 3] = [[54, 183, 19], [-29, -99, 128], [128, -116, -12]];
const BT709_LIMITED: [[i32; 3]; 3] = [[47, 157, 16], [-26, -86, 112], [112, -102, -10]];

struct Weights {
    matrix: &'static [[i32; 3]; 3],
    zero_level: i32,
    max_luma: i32,
    max_chroma: i32,
}

impl Weights {
    fn new(matrix: MatrixCoefficients, range: YuvRange) -> Self {
        let matrix = match (matrix, range) {
            (MatrixCoefficients::Bt601, YuvRange::Full) => &BT601_FULL,
            (MatrixCoefficients::Bt601, YuvRange::Limited) => &BT601_LIMITED,
            (MatrixCoefficients::Bt709, YuvRange::Full) => &BT709_FULL,
            (MatrixCoefficients::Bt709, YuvRange::Limited) => &BT709_LIMITED,
        };
        match range {
            YuvRange::Full => Self {
                matrix,
                zero_level: 0,
                max_luma: 255,
                max_chroma: 255,
            },
            YuvRange::Limited => Self {
                matrix,
                zero_level: 16,
                max_luma: 235,
                max_chroma: 240,
            },
        }
    }

    fn apply(&self, row: usize, rgb: [i32; 3]) -> i32 {
        let weights = &self.matrix[row];
        (rgb[0] * weights[0] + rgb[1] * weights[1] + rgb[2] * weights[2]) >> 8
    }

    fn luma(&self, rgb: [i32; 3]) -> u8 {
        (self.apply(0, rgb) + self.zero_level).clamp(self.zero_level, self.max_luma) as u8
    }

    fn chroma(&self, row: usize, rgb: [i32; 3]) -> u8 {
        (self.apply(row, rgb) + 128).clamp(self.zero_level, self.max_chroma) as u8
    }
}

/// Converts an 8-bit RGB or RGBA view into planar 4:2:0 YUV. `dst` receives a luma plane of
/// `stride` x `vstride` bytes followed by the U and V planes, each with a row stride of
/// `stride / 2` and `vstride / 2` rows. Both chroma planes must hold every subsampled column and
/// row of the view. Chroma is taken from the top left pixel of every 2x2
/// block. Alpha is dropped.
pub fn convert_rgb_to_planar_yuv(
    dst: &mut [u8],
    stride: usize,
    vstride: usize,
    view: &GraphicView,
    matrix: MatrixCoefficients,
    range: YuvRange,
) -> BufferResult<()> {
    let layout = view.layout();
    if !matches!(layout.layout_type, LayoutType::Rgb | LayoutType::Rgba)
        || layout.num_planes < 3
        || layout.planes[..3]
            .iter()
            .any(|plane| plane.allocated_depth != 8 || plane.col_sampling != 1 || plane.row_sampling != 1)
    {
        return BufferError::bad_value();
    }
    let width = usize_from_u32(view.width())?;
    let height = usize_from_u32(view.height())?;
    let chroma_stride = stride / 2;
    let chroma_rows = vstride / 2;
    if width > stride
        || height > vstride
        || usize_from_u32(div_up(view.width(), 2))? > chroma_stride
        || usize_from_u32(div_up(view.height(), 2))? > chroma_rows
    {
        log::debug!("{width}x{height} does not fit in stride {stride} and vstride {vstride}");
        return BufferError::bad_value();
    }
    let luma_size = checked_mul!(stride, vstride)?;
    let chroma_size = checked_mul!(chroma_stride, chroma_rows)?;
    let u_start = luma_size;
    let v_start = checked_add!(u_start, chroma_size)?;
    if checked_add!(v_start, chroma_size)? > dst.len() {
        log::debug!("conversion buffer is too small for converting from RGB to YUV");
        return BufferError::no_memory();
    }
    let weights = Weights::new(matrix, range);
    let src = view.data();
    let channels = [PLANE_R, PLANE_G, PLANE_B].map(|index| {
        let plane = &layout.planes[index];
        (
            view.plane_origin(index) as isize,
            plane.col_inc as isize,
            plane.row_inc as isize,
        )
    });
    for y in 0..height {
        for x in 0..width {
            // Mapped views only expose samples inside their allocation.
            let rgb = channels.map(|(origin, col_inc, row_inc)| {
                i32::from(src[(origin + x as isize * col_inc + y as isize * row_inc) as usize])
            });
            dst[y * stride + x] = weights.luma(rgb);
            if x % 2 == 0 && y % 2 == 0 {
                let chroma_offset = (y / 2) * chroma_stride + x / 2;
                dst[u_start + chroma_offset] = weights.chroma(1, rgb);
                dst[v_start + chroma_offset] = weights.chroma(2, rgb);
            }
        }
    }
    Ok(())
}
