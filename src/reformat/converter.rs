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

//! Exposes a mapped graphic view as a flat buffer described by a [`MediaImage`].
//!
//! The view is wrapped without copying when its planes already form one contiguous span that a
//! [`MediaImage`] can describe. Otherwise the caller supplies a back buffer of
//! [`GraphicViewConverter::back_buffer_size`] bytes and the pixels are copied into it.

use crate::byte_buffer::ByteBuffer;
use crate::format::*;
use crate::hardware::GraphicView;
use crate::hardware::MemoryRegion;
use crate::image::*;
use crate::internal_utils::*;
use crate::layout::*;
use crate::reformat::copy::copy_view_to_image;
use crate::utils::align;
use crate::utils::div_up;
use crate::*;

pub struct GraphicViewConverter {
    view: GraphicView,
    client_color_format: ColorFormat,
    component_color_format: ColorFormat,
    status: BufferResult<()>,
    image: MediaImage,
    back_buffer_size: usize,
    wrapped: Option<MemoryRegion>,
    // Set once a wrapped buffer has been handed out.
    wrap_taken: bool,
    back_buffer: Option<ByteBuffer>,
}

impl GraphicViewConverter {
    /// Analyzes `view` for the client color format found in `format`. With `copy` set, the view
    /// is never wrapped.
    pub fn new(view: &GraphicView, format: &MediaFormat, copy: bool) -> Self {
        let mut converter = Self {
            view: view.clone(),
            client_color_format: format.color_format(),
            component_color_format: format.component_color_format(),
            status: Err(BufferError::NotInitialized),
            image: MediaImage::default(),
            back_buffer_size: 0,
            wrapped: None,
            wrap_taken: false,
            back_buffer: None,
        };
        converter.status = converter.init(copy);
        converter
    }

    fn init(&mut self, copy: bool) -> BufferResult<()> {
        let layout = *self.view.layout();
        if layout.num_planes == 0 {
            log::debug!("converter: 0 planes");
            return BufferError::bad_value();
        }
        let allocated_depth = layout.planes[0].allocated_depth;
        let bit_depth = layout.planes[0].bit_depth;
        let crop = self.view.crop();
        // Aligned to support subsampling cleanly. The stride is in bytes.
        let stride = checked_mul!(align(crop.width, 2)?, div_up(allocated_depth, 8))?;
        let vstride = align(crop.height, 2)?;

        let (mut image, mut try_wrapping) = match layout.layout_type {
            LayoutType::Yuv => self.yuv_image(&layout, stride, vstride)?,
            LayoutType::Rgb | LayoutType::Rgba => self.rgb_image(&layout, stride)?,
            LayoutType::Yuva => {
                log::debug!(
                    "converter: unrecognized color format (client {:?} component {:?}) for YUVA layout",
                    self.client_color_format,
                    self.component_color_format
                );
                return BufferError::unsupported();
            }
            LayoutType::Unknown => {
                if layout.num_planes != 1 {
                    log::debug!(
                        "converter: unrecognized layout: color format (client {:?} component {:?})",
                        self.client_color_format,
                        self.component_color_format
                    );
                    return BufferError::unsupported();
                }
                let plane = &layout.planes[0];
                let mut image = MediaImage {
                    image_type: ImageType::Unknown,
                    ..Default::default()
                };
                image.planes[0] = ImagePlane {
                    offset: 0,
                    col_inc: i32_from_u32(plane.bytes_per_sample())?,
                    row_inc: i32_from_u32(stride / plane.col_sampling)?,
                    horiz_subsampling: plane.col_sampling,
                    vert_subsampling: plane.row_sampling,
                };
                (image, true)
            }
        };
        image.num_planes = layout.num_planes;
        image.width = crop.width;
        image.height = crop.height;
        image.bit_depth = bit_depth;
        image.bit_depth_allocated = allocated_depth;

        let mut back_buffer_size: usize = 0;
        for plane in layout.active_planes() {
            if plane.allocated_depth < plane.bit_depth
                || plane.right_shift != plane.allocated_depth - plane.bit_depth
            {
                log::debug!("right shift value of {} unsupported", plane.right_shift);
                return BufferError::bad_value();
            }
            if plane.allocated_depth > 8 && !plane.endianness.is_native() {
                log::debug!("endianness {:?} unsupported", plane.endianness);
                return BufferError::bad_value();
            }
            if plane.allocated_depth != allocated_depth || plane.bit_depth != bit_depth {
                log::debug!("different allocated depth or bit depth per plane unsupported");
                return BufferError::bad_value();
            }
            let plane_size =
                checked_mul!(stride, vstride)? / plane.row_sampling / plane.col_sampling;
            back_buffer_size = checked_add!(back_buffer_size, usize_from_u32(plane_size)?)?;
        }

        // Direct pointer wrapping cannot represent negative increments.
        try_wrapping = try_wrapping
            && !copy
            && layout
                .active_planes()
                .iter()
                .all(|plane| plane.col_inc > 0 && plane.row_inc >= 0);
        if try_wrapping {
            self.wrapped = self.try_wrap(&layout, &mut image)?;
        }
        self.image = image;
        self.back_buffer_size = back_buffer_size;
        Ok(())
    }

    /// Lays out a YUV image for the client color format. Also returns whether the view geometry
    /// still allows wrapping.
    fn yuv_image(
        &self,
        layout: &PlanarLayout,
        stride: u32,
        vstride: u32,
    ) -> BufferResult<(MediaImage, bool)> {
        if layout.num_planes != 3 {
            log::debug!("converter: {} planes for YUV layout", layout.num_planes);
            return BufferError::bad_value();
        }
        let (y, u, v) = (
            &layout.planes[PLANE_Y],
            &layout.planes[PLANE_U],
            &layout.planes[PLANE_V],
        );
        if let Some(client_bit_depth) = self.client_color_format.yuv_bit_depth() {
            if client_bit_depth != y.bit_depth {
                log::debug!(
                    "bit depth of client: {client_bit_depth} and component: {} differs",
                    y.bit_depth
                );
                return BufferError::bad_value();
            }
        }
        if y.channel != Channel::Y || u.channel != Channel::Cb || v.channel != Channel::Cr {
            log::debug!("converter: not YUV layout");
            return BufferError::bad_value();
        }
        let has_420_sampling =
            y.has_420_sampling(true) && u.has_420_sampling(false) && v.has_420_sampling(false);
        let yuv420888 = has_420_sampling
            && layout
                .active_planes()
                .iter()
                .all(|plane| plane.has_depth(8, 8))
            && y.col_inc == 1
            && u.row_inc == v.row_inc;
        let client = self.client_color_format;
        let mut copy_format = client;
        if yuv420888 && client == ColorFormat::Yuv420Flexible {
            if u.col_inc == 2 && v.col_inc == 2 && y.row_inc == u.row_inc {
                copy_format = ColorFormat::Yuv420PackedSemiPlanar;
            } else if u.col_inc == 1 && v.col_inc == 1 && y.row_inc == u.row_inc * 2 {
                copy_format = ColorFormat::Yuv420PackedPlanar;
            }
        }
        log::trace!(
            "client format {client:?} y:{{col_inc={} row_inc={}}} u:{{col_inc={} row_inc={}}} \
             v:{{col_inc={} row_inc={}}}",
            y.col_inc,
            y.row_inc,
            u.col_inc,
            u.row_inc,
            v.col_inc,
            v.row_inc
        );
        let origins_ascending = self.view.plane_origin(PLANE_Y) < self.view.plane_origin(PLANE_U)
            && self.view.plane_origin(PLANE_U) < self.view.plane_origin(PLANE_V);
        let (width, height) = (self.view.width(), self.view.height());
        let flexible = client == ColorFormat::Yuv420Flexible;
        match copy_format {
            ColorFormat::Yuv420Flexible if !has_420_sampling => self.planar_image(layout, stride, vstride),
            ColorFormat::Yuv420Flexible
            | ColorFormat::Yuv420Planar
            | ColorFormat::Yuv420PackedPlanar => Ok((
                MediaImage::yuv420_planar(width, height, stride, vstride)?,
                flexible
                    || (yuv420888
                        && u.col_inc == 1
                        && v.col_inc == 1
                        && y.row_inc == u.row_inc * 2
                        && origins_ascending),
            )),
            ColorFormat::Yuv420SemiPlanar | ColorFormat::Yuv420PackedSemiPlanar => Ok((
                MediaImage::yuv420_semi_planar(width, height, stride, vstride)?,
                flexible
                    || (yuv420888
                        && u.col_inc == 2
                        && v.col_inc == 2
                        && y.row_inc == u.row_inc
                        && origins_ascending),
            )),
            ColorFormat::YuvP010 => Ok((
                MediaImage::yuv420_p010(width, height, stride, vstride)?,
                layout
                    .active_planes()
                    .iter()
                    .all(|plane| plane.has_depth(16, 10) && plane.right_shift == 6)
                    && has_420_sampling
                    && y.col_inc == 2
                    && u.col_inc == 4
                    && v.col_inc == 4
                    && y.row_inc == u.row_inc
                    && y.row_inc == v.row_inc,
            )),
            _ => self.planar_image(layout, stride, vstride),
        }
    }

    /// Fully planar layout following the sampling of the view. Used when the client format has
    /// no fixed layout of its own.
    fn planar_image(
        &self,
        layout: &PlanarLayout,
        stride: u32,
        vstride: u32,
    ) -> BufferResult<(MediaImage, bool)> {
        let mut image = MediaImage {
            image_type: ImageType::Yuv,
            ..Default::default()
        };
        let mut offset: u32 = 0;
        for (plane, image_plane) in layout.planes[..3].iter().zip(image.planes.iter_mut()) {
            let row_inc = stride / plane.col_sampling;
            *image_plane = ImagePlane {
                offset,
                col_inc: i32_from_u32(plane.bytes_per_sample())?,
                row_inc: i32_from_u32(row_inc)?,
                horiz_subsampling: plane.col_sampling,
                vert_subsampling: plane.row_sampling,
            };
            offset = checked_add!(offset, checked_mul!(row_inc, vstride)? / plane.row_sampling)?;
        }
        Ok((image, true))
    }

    fn rgb_image(&self, layout: &PlanarLayout, stride: u32) -> BufferResult<(MediaImage, bool)> {
        let with_alpha = layout.layout_type == LayoutType::Rgba;
        let accepted = if with_alpha {
            matches!(
                self.client_color_format,
                ColorFormat::Surface
                    | ColorFormat::RgbaFlexible
                    | ColorFormat::Format32bitAbgr8888
                    | ColorFormat::Format32bitArgb8888
                    | ColorFormat::Format32bitBgra8888
            )
        } else {
            matches!(
                self.client_color_format,
                ColorFormat::Surface
                    | ColorFormat::RgbFlexible
                    | ColorFormat::Format24bitBgr888
                    | ColorFormat::Format24bitRgb888
            )
        };
        if !accepted {
            log::debug!(
                "converter: unrecognized color format (client {:?} component {:?}) for {:?} layout",
                self.client_color_format,
                self.component_color_format,
                layout.layout_type
            );
            return BufferError::unsupported();
        }
        let channels: u32 = if with_alpha { 4 } else { 3 };
        if layout.num_planes != channels {
            log::debug!(
                "converter: {} planes for {:?} layout",
                layout.num_planes,
                layout.layout_type
            );
            return BufferError::bad_value();
        }
        let sample_bytes = layout.planes[0].bytes_per_sample();
        let mut image = MediaImage {
            image_type: if with_alpha {
                ImageType::Rgba
            } else {
                ImageType::Rgb
            },
            ..Default::default()
        };
        for (index, image_plane) in image.planes.iter_mut().take(channels as usize).enumerate() {
            *image_plane = ImagePlane {
                offset: u32_from_usize(index)? * sample_bytes,
                col_inc: i32_from_u32(checked_mul!(channels, sample_bytes)?)?,
                row_inc: i32_from_u32(checked_mul!(stride, channels)?)?,
                horiz_subsampling: 1,
                vert_subsampling: 1,
            };
        }
        Ok((image, true))
    }

    /// Describes the view planes relative to the lowest addressed sample if all of them fit in
    /// one span no larger than the planes would take up laid out back to back.
    fn try_wrap(
        &self,
        layout: &PlanarLayout,
        image: &mut MediaImage,
    ) -> BufferResult<Option<MemoryRegion>> {
        let width = self.view.width();
        let height = self.view.height();
        let sample_bytes = isize_from_u32(div_up(layout.planes[0].allocated_depth, 8))?;
        let first_origin = isize_from_usize(self.view.plane_origin(0))?;
        let mut min = first_origin;
        let mut max = first_origin;
        let mut total_plane_size: isize = 0;
        for (index, plane) in layout.active_planes().iter().enumerate() {
            let origin = isize_from_usize(self.view.plane_origin(index))?;
            let cols = width / plane.col_sampling;
            let rows = height / plane.row_sampling;
            min = min.min(origin + plane.min_offset(cols, rows));
            max = max.max(origin + plane.max_offset(cols, rows));
            let plane_stride = isize_from_u32((plane.row_inc / plane.col_inc).unsigned_abs())?;
            let plane_size = checked_mul!(
                checked_mul!(plane_stride, sample_bytes)?,
                isize_from_u32(align(height, 64)?)?
            )? / isize_from_u32(plane.row_sampling)?;
            total_plane_size = checked_add!(total_plane_size, plane_size)?;
        }
        if min != first_origin || max - min > total_plane_size {
            log::trace!(
                "converter: span {} exceeds plane size {total_plane_size}, not wrapping",
                max - min
            );
            return Ok(None);
        }
        for (index, plane) in layout.active_planes().iter().enumerate() {
            image.planes[index] = ImagePlane {
                offset: u32_from_isize(isize_from_usize(self.view.plane_origin(index))? - min)?,
                col_inc: plane.col_inc,
                row_inc: plane.row_inc,
                horiz_subsampling: plane.col_sampling,
                vert_subsampling: plane.row_sampling,
            };
        }
        let region = self
            .view
            .memory()
            .sub_region(usize_from_isize(min)?, usize_from_isize(max - min)?)?;
        log::trace!("converter: wrapped (capacity={})", region.len());
        Ok(Some(region))
    }

    pub fn init_check(&self) -> BufferResult<()> {
        self.status.clone()
    }

    pub fn back_buffer_size(&self) -> usize {
        self.back_buffer_size
    }

    /// A zero-copy buffer over the view memory, unless the view could not be wrapped or a back
    /// buffer has been set. Once a buffer has been returned, no back buffer is accepted.
    pub fn wrap(&mut self) -> Option<ByteBuffer> {
        if !self.is_wrapped() {
            return None;
        }
        let region = self.wrapped.clone()?;
        self.wrap_taken = true;
        Some(if self.view.is_writable() {
            ByteBuffer::from_region(region)
        } else {
            ByteBuffer::from_read_only_region(region)
        })
    }

    pub fn is_wrapped(&self) -> bool {
        self.status.is_ok() && self.back_buffer.is_none() && self.wrapped.is_some()
    }

    /// Adopts `back_buffer` as the destination of [`Self::copy_to_media_image`] and sets its range
    /// to the required size. A buffer that is too small is dropped.
    pub fn set_back_buffer(&mut self, mut back_buffer: ByteBuffer) -> BufferResult<()> {
        self.status.clone()?;
        if self.wrap_taken {
            log::debug!("converter: view already handed out wrapped");
            return BufferError::bad_value();
        }
        if back_buffer.shares_memory_with(self.view.memory()) {
            log::debug!("converter: back buffer aliases the view");
            return BufferError::bad_value();
        }
        if back_buffer.capacity() < self.back_buffer_size {
            log::debug!(
                "back buffer of {} bytes is smaller than {}",
                back_buffer.capacity(),
                self.back_buffer_size
            );
            return BufferError::no_memory();
        }
        back_buffer.set_range(0, self.back_buffer_size)?;
        self.back_buffer = Some(back_buffer);
        Ok(())
    }

    pub fn take_back_buffer(&mut self) -> Option<ByteBuffer> {
        self.back_buffer.take()
    }

    pub fn copy_to_media_image(&mut self) -> BufferResult<()> {
        self.status.clone()?;
        let back_buffer = match self.back_buffer.as_mut() {
            Some(back_buffer) => back_buffer,
            None => return BufferError::not_initialized(),
        };
        copy_view_to_image(&mut back_buffer.base_mut()?, &self.image, &self.view)
    }

    pub fn image_data(&self) -> &MediaImage {
        &self.image
    }

    pub fn view(&self) -> &GraphicView {
        &self.view
    }
}
