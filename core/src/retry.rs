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

//! Bounded retry with full-jitter exponential backoff.

use crate::{Context, Error, Result};
use std::future::Future;
use std::time::Duration;

/// Default number of attempts, the first try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;

/// Default backoff base.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);

/// Retry runs an operation until it succeeds, fails permanently, or runs out
/// of attempts.
///
/// Before attempt `n + 1` it sleeps a uniformly random duration in
/// `[0, 2^n * base)`, where `n` counts the failures so far. It never sleeps
/// after the last attempt.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl Retry {
    /// Create a Retry with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A Retry that runs the operation exactly once.
    pub fn disabled() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Set the maximum number of attempts. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff base.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// The maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the sleep after `failures` failed attempts.
    pub fn backoff_ceiling(&self, failures: u32) -> Duration {
        // 2^31 * base already exceeds any sane timeout.
        self.base_delay.saturating_mul(1u32 << failures.min(31))
    }

    /// Run `op` until it succeeds.
    ///
    /// Errors for which `is_retryable` returns false are returned at once.
    /// Otherwise the last error is returned once attempts are exhausted.
    pub async fn run<T, F, Fut, R>(&self, ctx: &Context, mut op: F, is_retryable: R) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        R: Fn(&Error) -> bool,
    {
        let mut failures = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(err) => {
                    failures += 1;
                    if failures >= self.max_attempts || !is_retryable(&err) {
                        return Err(err);
                    }

                    let delay = self
                        .backoff_ceiling(failures - 1)
                        .mul_f64(rand::random::<f64>());
                    log::debug!(
                        "attempt {failures}/{} failed, retrying in {delay:?}: {err}",
                        self.max_attempts
                    );
                    ctx.sleep(delay).await;
                }
            }
        }
    }
}
