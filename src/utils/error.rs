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

use crate::*;

// To be used instead of direct BufferError enum variants in order to debug
// unexpected Err propagations as early as possible in the call stack.
#[allow(dead_code)]
impl BufferError {
    fn on_error() {
        // Use std::intrinsics::breakpoint() or manually add a breakpoint here.
        // Alternatively, uncomment the following to print the stack trace.
        // println!("{}", std::backtrace::Backtrace::force_capture());
    }

    pub(crate) fn bad_value<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::BadValue)
    }
    pub(crate) fn no_memory<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::NoMemory)
    }
    pub(crate) fn map_failed<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::MapFailed)
    }
    pub(crate) fn timed_out<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::TimedOut)
    }
    pub(crate) fn unsupported<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::Unsupported)
    }
    pub(crate) fn corrupted<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::Corrupted)
    }
    pub(crate) fn not_initialized<T>() -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::NotInitialized)
    }
    pub(crate) fn unknown_error<T, O: std::fmt::Display>(object: O) -> Result<T, BufferError> {
        BufferError::on_error();
        Err(BufferError::UnknownError(format!("{object}")))
    }
}
