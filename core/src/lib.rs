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

//! Core components for configuring AWS credentials inside a workflow runner.
//!
//! This crate defines the abstractions every other awsauth crate builds on:
//!
//! - [`Context`]: a container for file access, HTTP, environment, sleeping
//!   and runner commands. Everything defaults to a no-op, so tests only wire
//!   up what they need.
//! - [`ProvideCredential`]: loading credentials from one source, and
//!   [`ProvideCredentialChain`] for trying several in order.
//! - [`Runner`]: exporting variables, outputs, masks and post-step state.
//! - [`Retry`]: bounded full-jitter exponential backoff.
//! - [`Error`]: the error type shared by all crates.
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{
    Context, NoopEnv, NoopFileRead, NoopFileWrite, NoopHttpSend, NoopRunner, NoopSleep,
};
mod fs;
pub use fs::{FileRead, FileWrite};
mod http;
pub use http::HttpSend;
mod env;
pub use env::{Env, OsEnv, StaticEnv};
mod sleep;
pub use sleep::{RecordingSleep, Sleep};
mod runner;
pub use runner::{MemoryRunner, Runner};

mod api;
pub use api::{ProvideCredential, ProvideCredentialChain};
pub mod retry;
pub use retry::Retry;

mod error;
pub use error::{Error, ErrorKind, Result};
