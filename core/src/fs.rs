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

use crate::Result;
use std::fmt::Debug;

/// FileRead is used to read the file content entirely in `Vec<u8>`.
///
/// This is how web identity tokens and shared profile files are loaded.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read the file content entirely in `Vec<u8>`.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;

    /// Check whether a regular file exists at `path`.
    async fn file_exists(&self, path: &str) -> Result<bool>;
}

/// FileWrite persists AWS profile files and removes them again at cleanup.
#[async_trait::async_trait]
pub trait FileWrite: Debug + Send + Sync + 'static {
    /// Replace the whole content of `path`.
    ///
    /// The file is created with `mode` on unix, and an existing file gets its
    /// permissions reset to `mode`.
    async fn file_write(&self, path: &str, content: &[u8], mode: u32) -> Result<()>;

    /// Create a directory and all missing parents with `mode` on unix.
    async fn create_dir_all(&self, path: &str, mode: u32) -> Result<()>;

    /// Remove a file.
    async fn remove_file(&self, path: &str) -> Result<()>;

    /// Remove a directory, only if it is empty.
    async fn remove_dir(&self, path: &str) -> Result<()>;
}
