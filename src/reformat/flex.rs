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

use crate::format::ColorFormat;
use crate::hardware::GraphicAllocator;
use crate::hardware::HardwareFormat;
use crate::layout::*;
use crate::*;

use parking_lot::const_mutex;
use parking_lot::Mutex;

/// Chroma arrangement the allocator uses for flexible 4:2:0 buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlexLayout {
    #[default]
    Unknown,
    Planar,
    SemiplanarUv,
    SemiplanarVu,
}

impl FlexLayout {
    /// The client color format that describes buffers of this layout, if there is one.
    pub fn color_format(&self) -> Option<ColorFormat> {
        match self {
            Self::Planar => Some(ColorFormat::Yuv420Planar),
            Self::SemiplanarUv => Some(ColorFormat::Yuv420SemiPlanar),
            Self::SemiplanarVu | Self::Unknown => None,
        }
    }
}

static FLEX_LAYOUT: Mutex<Option<FlexLayout>> = const_mutex(None);

const PROBE_SIZE: u32 = 16;

fn probe(allocator: &dyn GraphicAllocator) -> BufferResult<FlexLayout> {
    let view = allocator
        .allocate_graphic(PROBE_SIZE, PROBE_SIZE, HardwareFormat::Ycbcr420Flexible)?
        .map()?;
    let layout = view.layout();
    if layout.num_planes != 3 || layout.planes[PLANE_Y].col_inc != 1 {
        return Ok(FlexLayout::Unknown);
    }
    let (u, v) = (&layout.planes[PLANE_U], &layout.planes[PLANE_V]);
    Ok(match (u.col_inc, v.col_inc) {
        (1, 1) => FlexLayout::Planar,
        (2, 2) => {
            let distance = view.plane_origin(PLANE_V) as i64 - view.plane_origin(PLANE_U) as i64;
            match distance {
                1 => FlexLayout::SemiplanarUv,
                -1 => FlexLayout::SemiplanarVu,
                _ => FlexLayout::Unknown,
            }
        }
        _ => FlexLayout::Unknown,
    })
}

/// Returns the layout `allocator` uses for flexible 4:2:0 buffers. The first known result is
/// cached for the lifetime of the process; failed probes are retried on the next call.
pub fn yuv420_flexible_layout(allocator: &dyn GraphicAllocator) -> FlexLayout {
    let mut cached = FLEX_LAYOUT.lock();
    if let Some(layout) = *cached {
        return layout;
    }
    let layout = match probe(allocator) {
        Ok(layout) => layout,
        Err(err) => {
            log::debug!("flexible layout probe failed: {err}");
            FlexLayout::Unknown
        }
    };
    if layout != FlexLayout::Unknown {
        *cached = Some(layout);
    }
    layout
}

/// Forgets the cached flexible layout.
pub fn reset_flexible_layout_cache() {
    *FLEX_LAYOUT.lock() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::*;
    use test_case::test_case;

    struct FailingAllocator;

    impl GraphicAllocator for FailingAllocator {
        fn allocate_graphic(&self, _: u32, _: u32, _: HardwareFormat) -> BufferResult<GraphicBlock> {
            BufferError::no_memory()
        }
    }

    // The cache is process-wide, so the scenarios run sequentially in one test.
    #[test]
    fn probe_and_cache() -> BufferResult<()> {
        reset_flexible_layout_cache();
        assert_eq!(yuv420_flexible_layout(&FailingAllocator), FlexLayout::Unknown);
        // Unknown results are not cached.
        let nv21 = HeapAllocator::with_flexible_format(HardwareFormat::Nv21)?;
        assert_eq!(yuv420_flexible_layout(&nv21), FlexLayout::SemiplanarVu);
        // Known results are.
        let i420 = HeapAllocator::with_flexible_format(HardwareFormat::I420)?;
        assert_eq!(yuv420_flexible_layout(&i420), FlexLayout::SemiplanarVu);
        reset_flexible_layout_cache();
        assert_eq!(yuv420_flexible_layout(&i420), FlexLayout::Planar);
        reset_flexible_layout_cache();
        Ok(())
    }

    #[test_case(HardwareFormat::Nv12, FlexLayout::SemiplanarUv)]
    #[test_case(HardwareFormat::Nv21, FlexLayout::SemiplanarVu)]
    #[test_case(HardwareFormat::I420, FlexLayout::Planar)]
    #[test_case(HardwareFormat::Yv12, FlexLayout::Planar)]
    fn probe_classifies_chroma_order(format: HardwareFormat, expected: FlexLayout) -> BufferResult<()> {
        let allocator = HeapAllocator::with_flexible_format(format)?;
        assert_eq!(probe(&allocator)?, expected);
        Ok(())
    }

    #[test]
    fn client_formats() {
        assert_eq!(FlexLayout::Planar.color_format(), Some(ColorFormat::Yuv420Planar));
        assert_eq!(FlexLayout::SemiplanarUv.color_format(), Some(ColorFormat::Yuv420SemiPlanar));
        assert_eq!(FlexLayout::SemiplanarVu.color_format(), None);
    }
}
