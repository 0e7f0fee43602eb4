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

use crate::{Env, Error, FileRead, FileWrite, HttpSend, Result, Runner, Sleep};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Context carries every side effect the action performs.
///
/// ## Important
///
/// Nothing is configured by default. Any unconfigured component uses a no-op
/// implementation that returns errors or empty values when called, so tests
/// only wire up what they exercise.
///
/// ## Example
///
/// ```
/// use awsauth_core::{Context, MemoryRunner, OsEnv};
///
/// let runner = MemoryRunner::default();
/// let ctx = Context::new()
///     .with_env(OsEnv)
///     .with_runner(runner);
/// ```
#[derive(Clone)]
pub struct Context {
    fs: Arc<dyn FileRead>,
    fs_write: Arc<dyn FileWrite>,
    http: Arc<dyn HttpSend>,
    env: Arc<dyn Env>,
    sleep: Arc<dyn Sleep>,
    runner: Arc<dyn Runner>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("fs", &self.fs)
            .field("fs_write", &self.fs_write)
            .field("http", &self.http)
            .field("env", &self.env)
            .field("sleep", &self.sleep)
            .field("runner", &self.runner)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new Context with no-op implementations.
    pub fn new() -> Self {
        Self {
            fs: Arc::new(NoopFileRead),
            fs_write: Arc::new(NoopFileWrite),
            http: Arc::new(NoopHttpSend),
            env: Arc::new(NoopEnv),
            sleep: Arc::new(NoopSleep),
            runner: Arc::new(NoopRunner),
        }
    }

    /// Replace the file reader implementation.
    pub fn with_file_read(mut self, fs: impl FileRead) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Replace the file writer implementation.
    pub fn with_file_write(mut self, fs: impl FileWrite) -> Self {
        self.fs_write = Arc::new(fs);
        self
    }

    /// Replace the HTTP client implementation.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Arc::new(http);
        self
    }

    /// Replace the environment implementation.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Replace the sleep implementation.
    pub fn with_sleep(mut self, sleep: impl Sleep) -> Self {
        self.sleep = Arc::new(sleep);
        self
    }

    /// Replace the runner implementation.
    pub fn with_runner(mut self, runner: impl Runner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Read the file content entirely in `Vec<u8>`.
    #[inline]
    pub async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.file_read(path).await
    }

    /// Read the file content entirely in `String`.
    pub async fn file_read_as_string(&self, path: &str) -> Result<String> {
        let bytes = self.file_read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Check whether a regular file exists at `path`.
    #[inline]
    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        self.fs.file_exists(path).await
    }

    /// Replace the whole content of `path`, applying `mode` on unix.
    #[inline]
    pub async fn file_write(&self, path: &str, content: &[u8], mode: u32) -> Result<()> {
        self.fs_write.file_write(path, content, mode).await
    }

    /// Create a directory and all its parents, applying `mode` on unix.
    #[inline]
    pub async fn create_dir_all(&self, path: &str, mode: u32) -> Result<()> {
        self.fs_write.create_dir_all(path, mode).await
    }

    /// Remove a file.
    #[inline]
    pub async fn remove_file(&self, path: &str) -> Result<()> {
        self.fs_write.remove_file(path).await
    }

    /// Remove an empty directory.
    #[inline]
    pub async fn remove_dir(&self, path: &str) -> Result<()> {
        self.fs_write.remove_dir(path).await
    }

    /// Send http request and return the response.
    #[inline]
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Send http request and return the response as string.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let (parts, body) = self.http.http_send(req).await?.into_parts();
        let body = String::from_utf8_lossy(&body).to_string();
        Ok(http::Response::from_parts(parts, body))
    }

    /// Get the home directory of the current user.
    #[inline]
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.env.home_dir()
    }

    /// Expand `~` in input path.
    ///
    /// - If path not starts with `~/` or `~\\`, returns `Some(path)` directly.
    /// - Otherwise, replace the leading `~` with home dir instead.
    /// - If home_dir is not found, returns `None`.
    pub fn expand_home_dir(&self, path: &str) -> Option<String> {
        if !path.starts_with("~/") && !path.starts_with("~\\") {
            Some(path.to_string())
        } else {
            self.home_dir()
                .map(|home| format!("{}{}", home.to_string_lossy(), &path[1..]))
        }
    }

    /// Get the environment variable.
    ///
    /// - Returns `Some(v)` if the environment variable is found and is valid utf-8.
    /// - Returns `None` if the environment variable is not found or value is invalid.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Get the environment variable, treating an empty value as unset.
    ///
    /// Exported variables can't be removed, only emptied, so this is the
    /// right reader for anything a previous step may have cleared.
    pub fn env_var_non_empty(&self, key: &str) -> Option<String> {
        self.env.var(key).filter(|v| !v.is_empty())
    }

    /// Wait for `dur`.
    #[inline]
    pub async fn sleep(&self, dur: Duration) {
        self.sleep.sleep(dur).await
    }

    /// Export a variable to the rest of the job.
    #[inline]
    pub fn export_variable(&self, name: &str, value: &str) -> Result<()> {
        self.runner.export_variable(name, value)
    }

    /// Set a step output.
    #[inline]
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.runner.set_output(name, value)
    }

    /// Mask `value` in all logs.
    #[inline]
    pub fn set_secret(&self, value: &str) {
        self.runner.set_secret(value)
    }

    /// Save state for the post step.
    #[inline]
    pub fn save_state(&self, name: &str, value: &str) -> Result<()> {
        self.runner.save_state(name, value)
    }

    /// Read state saved by the main step.
    pub fn state(&self, name: &str) -> Option<String> {
        self.env_var_non_empty(&format!("STATE_{name}"))
    }
}

/// NoopFileRead is a no-op implementation that always returns an error.
///
/// This is used when no file reader is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFileRead;

#[async_trait::async_trait]
impl FileRead for NoopFileRead {
    async fn file_read(&self, _path: &str) -> Result<Vec<u8>> {
        Err(Error::unexpected(
            "file reading not supported: no file reader configured",
        ))
    }

    async fn file_exists(&self, _path: &str) -> Result<bool> {
        Err(Error::unexpected(
            "file reading not supported: no file reader configured",
        ))
    }
}

/// NoopFileWrite is a no-op implementation that always returns an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFileWrite;

#[async_trait::async_trait]
impl FileWrite for NoopFileWrite {
    async fn file_write(&self, _path: &str, _content: &[u8], _mode: u32) -> Result<()> {
        Err(Self::unsupported())
    }

    async fn create_dir_all(&self, _path: &str, _mode: u32) -> Result<()> {
        Err(Self::unsupported())
    }

    async fn remove_file(&self, _path: &str) -> Result<()> {
        Err(Self::unsupported())
    }

    async fn remove_dir(&self, _path: &str) -> Result<()> {
        Err(Self::unsupported())
    }
}

impl NoopFileWrite {
    fn unsupported() -> Error {
        Error::unexpected("file writing not supported: no file writer configured")
    }
}

/// NoopHttpSend is a no-op implementation that always returns an error.
///
/// This is used when no HTTP client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, _req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::unexpected(
            "HTTP sending not supported: no HTTP client configured",
        ))
    }
}

/// NoopEnv is a no-op implementation that always returns None/empty.
///
/// This is used when no environment is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnv;

impl Env for NoopEnv {
    fn var(&self, _key: &str) -> Option<String> {
        None
    }

    fn vars(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// NoopSleep returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSleep;

#[async_trait::async_trait]
impl Sleep for NoopSleep {
    async fn sleep(&self, _dur: Duration) {}
}

/// NoopRunner rejects every runner command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRunner;

impl Runner for NoopRunner {
    fn export_variable(&self, name: &str, _value: &str) -> Result<()> {
        Err(Error::unexpected(format!(
            "cannot export {name}: no runner configured"
        )))
    }

    fn set_output(&self, name: &str, _value: &str) -> Result<()> {
        Err(Error::unexpected(format!(
            "cannot set output {name}: no runner configured"
        )))
    }

    fn set_secret(&self, _value: &str) {}

    fn save_state(&self, name: &str, _value: &str) -> Result<()> {
        Err(Error::unexpected(format!(
            "cannot save state {name}: no runner configured"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryRunner, StaticEnv};

    #[test]
    fn test_expand_home_dir() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: Some(PathBuf::from("/home/runner")),
            envs: HashMap::new(),
        });

        assert_eq!(
            ctx.expand_home_dir("~/.aws/config"),
            Some("/home/runner/.aws/config".to_string())
        );
        assert_eq!(
            ctx.expand_home_dir("/etc/aws/config"),
            Some("/etc/aws/config".to_string())
        );
        assert_eq!(
            ctx.expand_home_dir("dir~/config"),
            Some("dir~/config".to_string())
        );

        let ctx = Context::new();
        assert_eq!(ctx.expand_home_dir("~/.aws/config"), None);
    }

    #[test]
    fn test_env_var_non_empty() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([
                ("AWS_SESSION_TOKEN".to_string(), "".to_string()),
                ("AWS_REGION".to_string(), "us-east-1".to_string()),
            ]),
        });

        assert_eq!(ctx.env_var("AWS_SESSION_TOKEN"), Some("".to_string()));
        assert_eq!(ctx.env_var_non_empty("AWS_SESSION_TOKEN"), None);
        assert_eq!(
            ctx.env_var_non_empty("AWS_REGION"),
            Some("us-east-1".to_string())
        );
    }

    #[test]
    fn test_state_roundtrip_through_env() {
        let runner = MemoryRunner::new(HashMap::from([(
            "STATE_created-config-file".to_string(),
            "/tmp/aws/config".to_string(),
        )]));
        let ctx = Context::new().with_env(runner.clone()).with_runner(runner);

        assert_eq!(
            ctx.state("created-config-file"),
            Some("/tmp/aws/config".to_string())
        );
        assert_eq!(ctx.state("created-credentials-file"), None);
    }

    #[tokio::test]
    async fn test_noop_components() {
        let ctx = Context::new();

        assert!(ctx.file_read("/tmp/x").await.is_err());
        assert!(ctx.file_write("/tmp/x", b"x", 0o600).await.is_err());
        assert!(ctx.export_variable("AWS_REGION", "us-east-1").is_err());
        assert!(ctx.env_var("HOME").is_none());
        ctx.sleep(Duration::from_secs(3600)).await;
    }
}
