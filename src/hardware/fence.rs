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

use parking_lot::Condvar;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// Upper bound for waiting on a fence before mapping the memory it guards.
pub const FENCE_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct FenceState {
    signaled: Mutex<bool>,
    condition: Condvar,
}

/// Signaled by the producer of a buffer once its pending operations are complete.
#[derive(Clone, Debug, Default)]
pub struct Fence {
    // None for a fence that is signaled from the start.
    state: Option<Arc<FenceState>>,
}

impl Fence {
    pub fn signaled() -> Self {
        Self { state: None }
    }

    pub fn pending() -> Self {
        Self {
            state: Some(Arc::new(FenceState::default())),
        }
    }

    pub fn signal(&self) {
        if let Some(state) = &self.state {
            *state.signaled.lock() = true;
            state.condition.notify_all();
        }
    }

    pub fn is_signaled(&self) -> bool {
        match &self.state {
            Some(state) => *state.signaled.lock(),
            None => true,
        }
    }

    pub fn wait(&self, timeout: Duration) -> BufferResult<()> {
        let state = match &self.state {
            Some(state) => state,
            None => return Ok(()),
        };
        let deadline = Instant::now() + timeout;
        let mut signaled = state.signaled.lock();
        while !*signaled {
            if state
                .condition
                .wait_until(&mut signaled, deadline)
                .timed_out()
            {
                if *signaled {
                    break;
                }
                log::debug!("fence wait timed out after {timeout:?}");
                return BufferError::timed_out();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaled_fence_does_not_block() {
        assert!(Fence::signaled().wait(Duration::ZERO).is_ok());
        assert!(Fence::default().is_signaled());
    }

    #[test]
    fn pending_fence_times_out() {
        let fence = Fence::pending();
        assert!(!fence.is_signaled());
        assert_eq!(
            fence.wait(Duration::from_millis(5)),
            Err(BufferError::TimedOut)
        );
    }

    #[test]
    fn signal_from_another_thread() {
        let fence = Fence::pending();
        let producer = fence.clone();
        let handle = std::thread::spawn(move || producer.signal());
        assert!(fence.wait(Duration::from_secs(10)).is_ok());
        handle.join().unwrap();
        assert!(fence.is_signaled());
    }
}
