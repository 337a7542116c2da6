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

use crate::buffers::*;
use crate::byte_buffer::ByteBuffer;
use crate::format::MediaFormat;
use crate::hardware::HardwareBuffer;
use crate::*;

use std::sync::Arc;

/// Carries a hardware buffer whose contents are never accessed by the client.
pub struct DummyContainerBuffer {
    core: BufferCore,
    buffer_ref: Option<Arc<HardwareBuffer>>,
}

impl DummyContainerBuffer {
    pub fn new(format: MediaFormat, buffer: Option<Arc<HardwareBuffer>>) -> BufferResult<Self> {
        let mut byte_buffer = ByteBuffer::from_vec(vec![0]);
        if buffer.is_none() {
            byte_buffer.set_range(0, 0)?;
        }
        Ok(Self {
            core: BufferCore::new(format, byte_buffer),
            buffer_ref: buffer,
        })
    }
}

impl Codec2Buffer for DummyContainerBuffer {
    fn core(&self) -> &BufferCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BufferCore {
        &mut self.core
    }

    fn can_copy(&self, _source: Option<&Arc<HardwareBuffer>>) -> bool {
        self.buffer_ref.is_none()
    }

    fn copy(&mut self, source: Option<&Arc<HardwareBuffer>>) -> BufferResult<()> {
        self.buffer_ref = source.cloned();
        let size = if self.buffer_ref.is_some() { 1 } else { 0 };
        self.core.buffer.set_range(0, size)
    }

    fn to_hardware_buffer(&mut self) -> Option<Arc<HardwareBuffer>> {
        self.buffer_ref.clone()
    }

    fn clear_hardware_references(&mut self) {
        self.buffer_ref = None;
    }
}
