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

//! Tokio-based file access for awsauth.
//!
//! [`TokioFileRead`] loads web identity token files and shared profile files.
//! [`TokioFileWrite`] writes the AWS profile files with restrictive
//! permissions and removes them again in the post step.
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_core::{Context, OsEnv};
//! use awsauth_file_tokio::{TokioFileRead, TokioFileWrite};
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead)
//!         .with_file_write(TokioFileWrite)
//!         .with_env(OsEnv);
//!
//!     match ctx.file_read_as_string("/tmp/web-identity-token").await {
//!         Ok(token) => println!("read {} bytes", token.len()),
//!         Err(e) => eprintln!("failed to read token: {e}"),
//!     }
//! }
//! ```

use async_trait::async_trait;
use awsauth_core::{Error, FileRead, FileWrite, Result};
use std::io;

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            Error::unexpected("failed to read file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::unexpected("failed to stat file")
                .with_source(e)
                .with_context(format!("path: {path}"))),
        }
    }
}

/// Tokio-based implementation of the `FileWrite` trait.
///
/// Modes are applied on unix and ignored elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileWrite;

#[async_trait]
impl FileWrite for TokioFileWrite {
    async fn file_write(&self, path: &str, content: &[u8], mode: u32) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let mut opts = tokio::fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        opts.mode(mode);

        let mut f = opts.open(path).await.map_err(|e| write_error(e, path))?;
        // `mode` only applies on creation.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| write_error(e, path))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        f.write_all(content)
            .await
            .map_err(|e| write_error(e, path))?;
        f.flush().await.map_err(|e| write_error(e, path))?;
        log::debug!("wrote {} bytes to {path}", content.len());
        Ok(())
    }

    async fn create_dir_all(&self, path: &str, mode: u32) -> Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path).await.map_err(|e| {
            Error::unexpected("failed to create directory")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(path).await.map_err(|e| {
            Error::unexpected("failed to remove file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        tokio::fs::remove_dir(path).await.map_err(|e| {
            Error::unexpected("failed to remove directory")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }
}

fn write_error(e: io::Error, path: &str) -> Error {
    Error::unexpected("failed to write file")
        .with_source(e)
        .with_context(format!("path: {path}"))
}
