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

use crate::{Env, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Runner is the workflow runner hosting this step.
///
/// Every step runs in a fresh process, so the only way to hand credentials to
/// later steps is through the runner: exported variables, step outputs and
/// saved state. There is no "unset": clearing a variable means exporting an
/// empty string, which AWS tooling treats as absent.
pub trait Runner: Debug + Send + Sync + 'static {
    /// Export a variable to this process and to every later step of the job.
    fn export_variable(&self, name: &str, value: &str) -> Result<()>;

    /// Set a step output.
    fn set_output(&self, name: &str, value: &str) -> Result<()>;

    /// Register a value that must be masked in all logs.
    fn set_secret(&self, value: &str);

    /// Save state for the post step of this action.
    ///
    /// The post step reads it back from `STATE_<name>`.
    fn save_state(&self, name: &str, value: &str) -> Result<()>;
}

/// MemoryRunner records everything in memory.
///
/// It also implements [`Env`], where exported variables shadow the initial
/// ones, so code that exports and then re-reads the environment behaves like
/// it does on a real runner.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunner {
    inner: Arc<Mutex<MemoryRunnerState>>,
}

#[derive(Debug, Default)]
struct MemoryRunnerState {
    home_dir: Option<PathBuf>,
    envs: HashMap<String, String>,
    exported: Vec<(String, String)>,
    outputs: HashMap<String, String>,
    secrets: Vec<String>,
    states: HashMap<String, String>,
}

impl MemoryRunner {
    /// Create a runner whose environment starts as `envs`.
    pub fn new(envs: HashMap<String, String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryRunnerState {
                envs,
                ..Default::default()
            })),
        }
    }

    /// Set the home dir reported through [`Env::home_dir`].
    pub fn with_home_dir(self, home_dir: impl Into<PathBuf>) -> Self {
        self.state().home_dir = Some(home_dir.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryRunnerState> {
        self.inner.lock().expect("lock poisoned")
    }

    /// Every `export_variable` call, in order.
    pub fn exported(&self) -> Vec<(String, String)> {
        self.state().exported.clone()
    }

    /// The last exported value of `name`.
    pub fn exported_var(&self, name: &str) -> Option<String> {
        self.state()
            .exported
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    /// Current step outputs.
    pub fn outputs(&self) -> HashMap<String, String> {
        self.state().outputs.clone()
    }

    /// Values registered as secrets.
    pub fn secrets(&self) -> Vec<String> {
        self.state().secrets.clone()
    }

    /// Saved state.
    pub fn states(&self) -> HashMap<String, String> {
        self.state().states.clone()
    }
}

impl Runner for MemoryRunner {
    fn export_variable(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        state.envs.insert(name.to_string(), value.to_string());
        state.exported.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.state()
            .outputs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_secret(&self, value: &str) {
        self.state().secrets.push(value.to_string());
    }

    fn save_state(&self, name: &str, value: &str) -> Result<()> {
        self.state()
            .states
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl Env for MemoryRunner {
    fn var(&self, key: &str) -> Option<String> {
        self.state().envs.get(key).cloned()
    }

    fn vars(&self) -> HashMap<String, String> {
        self.state().envs.clone()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.state().home_dir.clone()
    }
}
