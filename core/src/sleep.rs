// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleep suspends the current task, used between retries.
///
/// Implementations must be cancel safe: dropping the future stops the wait,
/// which is how a global timeout cuts a retry loop short.
#[async_trait::async_trait]
pub trait Sleep: Debug + Send + Sync + 'static {
    /// Wait for `dur`.
    async fn sleep(&self, dur: Duration);
}

/// RecordingSleep returns immediately and remembers every requested duration.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleep {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleep {
    /// Create a new RecordingSleep.
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Sleep for RecordingSleep {
    async fn sleep(&self, dur: Duration) {
        self.calls.lock().expect("lock poisoned").push(dur);
    }
}
