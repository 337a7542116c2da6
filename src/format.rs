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

use std::collections::HashMap;

// These keys are documented in
// https://developer.android.com/reference/android/media/MediaFormat
pub const KEY_COLOR_FORMAT: &str = "color-format";
pub const KEY_WIDTH: &str = "width";
pub const KEY_HEIGHT: &str = "height";
pub const KEY_IMAGE_DATA: &str = "image-data";
// Not part of the public SDK. Carries the color format the component itself produces.
pub const KEY_COMPONENT_COLOR_FORMAT: &str = "android._color-format";

/// Color format ids from android.media.MediaCodecInfo.CodecCapabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    Format24bitRgb888,
    Format24bitBgr888,
    Format32bitBgra8888,
    Format32bitArgb8888,
    Format32bitAbgr8888,
    Yuv411Planar,
    Yuv411PackedPlanar,
    Yuv420Planar,
    Yuv420PackedPlanar,
    Yuv420SemiPlanar,
    Yuv422Planar,
    Yuv422PackedPlanar,
    Yuv422SemiPlanar,
    Yuv444Interleaved,
    Yuv420PackedSemiPlanar,
    Yuv422PackedSemiPlanar,
    YuvP010,
    Surface,
    #[default]
    Yuv420Flexible,
    Yuv422Flexible,
    Yuv444Flexible,
    RgbFlexible,
    RgbaFlexible,
    Unknown(i32),
}

impl From<i32> for ColorFormat {
    fn from(value: i32) -> Self {
        match value {
            11 => Self::Format24bitRgb888,
            12 => Self::Format24bitBgr888,
            15 => Self::Format32bitBgra8888,
            16 => Self::Format32bitArgb8888,
            0x7f00a000 => Self::Format32bitAbgr8888,
            17 => Self::Yuv411Planar,
            18 => Self::Yuv411PackedPlanar,
            19 => Self::Yuv420Planar,
            20 => Self::Yuv420PackedPlanar,
            21 => Self::Yuv420SemiPlanar,
            22 => Self::Yuv422Planar,
            23 => Self::Yuv422PackedPlanar,
            24 => Self::Yuv422SemiPlanar,
            29 => Self::Yuv444Interleaved,
            39 => Self::Yuv420PackedSemiPlanar,
            40 => Self::Yuv422PackedSemiPlanar,
            54 => Self::YuvP010,
            0x7f000789 => Self::Surface,
            0x7f420888 => Self::Yuv420Flexible,
            0x7f422888 => Self::Yuv422Flexible,
            0x7f444888 => Self::Yuv444Flexible,
            0x7f36b888 => Self::RgbFlexible,
            0x7f36a888 => Self::RgbaFlexible,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ColorFormat> for i32 {
    fn from(format: ColorFormat) -> Self {
        match format {
            ColorFormat::Format24bitRgb888 => 11,
            ColorFormat::Format24bitBgr888 => 12,
            ColorFormat::Format32bitBgra8888 => 15,
            ColorFormat::Format32bitArgb8888 => 16,
            ColorFormat::Format32bitAbgr8888 => 0x7f00a000,
            ColorFormat::Yuv411Planar => 17,
            ColorFormat::Yuv411PackedPlanar => 18,
            ColorFormat::Yuv420Planar => 19,
            ColorFormat::Yuv420PackedPlanar => 20,
            ColorFormat::Yuv420SemiPlanar => 21,
            ColorFormat::Yuv422Planar => 22,
            ColorFormat::Yuv422PackedPlanar => 23,
            ColorFormat::Yuv422SemiPlanar => 24,
            ColorFormat::Yuv444Interleaved => 29,
            ColorFormat::Yuv420PackedSemiPlanar => 39,
            ColorFormat::Yuv422PackedSemiPlanar => 40,
            ColorFormat::YuvP010 => 54,
            ColorFormat::Surface => 0x7f000789,
            ColorFormat::Yuv420Flexible => 0x7f420888,
            ColorFormat::Yuv422Flexible => 0x7f422888,
            ColorFormat::Yuv444Flexible => 0x7f444888,
            ColorFormat::RgbFlexible => 0x7f36b888,
            ColorFormat::RgbaFlexible => 0x7f36a888,
            ColorFormat::Unknown(value) => value,
        }
    }
}

impl ColorFormat {
    /// Meaningful bits per sample a client expects for this format, if the format is a YUV
    /// format with a fixed depth.
    pub fn yuv_bit_depth(&self) -> Option<u32> {
        match self {
            Self::YuvP010 => Some(10),
            Self::Yuv411Planar
            | Self::Yuv411PackedPlanar
            | Self::Yuv420Planar
            | Self::Yuv420PackedPlanar
            | Self::Yuv420SemiPlanar
            | Self::Yuv420PackedSemiPlanar
            | Self::Yuv422Planar
            | Self::Yuv422PackedPlanar
            | Self::Yuv422SemiPlanar
            | Self::Yuv422PackedSemiPlanar
            | Self::Yuv444Interleaved
            | Self::Yuv420Flexible
            | Self::Yuv422Flexible
            | Self::Yuv444Flexible => Some(8),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormatValue {
    Int32(i32),
    Int64(i64),
    String(String),
    Buffer(Vec<u8>),
}

/// Key-value configuration attached to every buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaFormat {
    entries: HashMap<String, FormatValue>,
}

impl MediaFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_i32(&mut self, key: &str, value: i32) {
        self.entries.insert(key.into(), FormatValue::Int32(value));
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.entries.insert(key.into(), FormatValue::Int64(value));
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.entries.insert(key.into(), FormatValue::String(value.into()));
    }

    pub fn set_buffer(&mut self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.into(), FormatValue::Buffer(value));
    }

    pub fn remove(&mut self, key: &str) -> Option<FormatValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn find_i32(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(FormatValue::Int32(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn find_i64(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(FormatValue::Int64(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn find_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(FormatValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn find_buffer(&self, key: &str) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(FormatValue::Buffer(value)) => Some(value.as_slice()),
            _ => None,
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.find_i32(KEY_WIDTH)
            .and_then(|width| u32::try_from(width).ok())
    }

    pub fn height(&self) -> Option<u32> {
        self.find_i32(KEY_HEIGHT)
            .and_then(|height| u32::try_from(height).ok())
    }

    /// The color format the client asked for.
    pub fn color_format(&self) -> ColorFormat {
        self.find_i32(KEY_COLOR_FORMAT)
            .map(ColorFormat::from)
            .unwrap_or_default()
    }

    /// The color format the component produces natively.
    pub fn component_color_format(&self) -> ColorFormat {
        self.find_i32(KEY_COMPONENT_COLOR_FORMAT)
            .map(ColorFormat::from)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(19, ColorFormat::Yuv420Planar)]
    #[test_case(21, ColorFormat::Yuv420SemiPlanar)]
    #[test_case(54, ColorFormat::YuvP010)]
    #[test_case(0x7f420888, ColorFormat::Yuv420Flexible)]
    #[test_case(0x7f00a000, ColorFormat::Format32bitAbgr8888)]
    #[test_case(1234, ColorFormat::Unknown(1234))]
    fn color_format_ids(id: i32, format: ColorFormat) {
        assert_eq!(ColorFormat::from(id), format);
        assert_eq!(i32::from(format), id);
    }

    #[test]
    fn missing_color_formats_default_to_flexible() {
        let format = MediaFormat::new();
        assert_eq!(format.color_format(), ColorFormat::Yuv420Flexible);
        assert_eq!(format.component_color_format(), ColorFormat::Yuv420Flexible);
    }

    #[test]
    fn typed_lookups() {
        let mut format = MediaFormat::new();
        format.set_i32(KEY_WIDTH, 320);
        format.set_i32(KEY_HEIGHT, -1);
        format.set_string("mime", "video/raw");
        format.set_buffer(KEY_IMAGE_DATA, vec![1, 2, 3]);
        assert_eq!(format.width(), Some(320));
        assert_eq!(format.height(), None);
        assert_eq!(format.find_string("mime"), Some("video/raw"));
        assert_eq!(format.find_i32("mime"), None);
        assert_eq!(format.find_buffer(KEY_IMAGE_DATA), Some(&[1u8, 2, 3][..]));
        assert!(format.remove(KEY_IMAGE_DATA).is_some());
        assert!(!format.contains(KEY_IMAGE_DATA));
    }

    #[test]
    fn client_bit_depths() {
        assert_eq!(ColorFormat::YuvP010.yuv_bit_depth(), Some(10));
        assert_eq!(ColorFormat::Yuv422Flexible.yuv_bit_depth(), Some(8));
        assert_eq!(ColorFormat::RgbFlexible.yuv_bit_depth(), None);
        assert_eq!(ColorFormat::Unknown(7).yuv_bit_depth(), None);
    }
}
