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

//! Configure AWS credentials for GitHub Actions.
//!
//! The `configure-aws-credentials` binary resolves credentials from static
//! keys, the runner's OIDC token, a web identity token file or the ambient
//! environment, optionally assumes a role through STS, and publishes the
//! result to later steps of the job. Its post step clears everything again.
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_aws_sts::{action, ActionInputs, CredentialsClient, HttpStsClient};
//! use awsauth_core::{Context, OsEnv};
//! use awsauth_runner_github::GithubRunner;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> awsauth_core::Result<()> {
//!     let ctx = Context::new()
//!         .with_env(OsEnv)
//!         .with_runner(GithubRunner::from_env(&OsEnv));
//!     let inputs = ActionInputs::from_env(&ctx)?;
//!     let mut client = CredentialsClient::new(Arc::new(HttpStsClient::new(&inputs.region)));
//!     action::run(&ctx, &inputs, &mut client).await
//! }
//! ```

pub mod constants;

mod credential;
pub use credential::{AssumedRoleUser, CallerIdentity, Credential};

pub mod sanitize;
pub use sanitize::{sanitize_actor, sanitize_tag_value};

mod proxy;
pub use proxy::ProxyResolver;

pub mod sts;
pub use sts::{HttpStsClient, StsClient};

mod provide_credential;
pub use provide_credential::{
    DefaultCredentialProvider, EnvCredentialProvider, ProfileCredentialProvider,
};

mod client;
pub use client::CredentialsClient;

mod assume_role;
pub use assume_role::{
    assume_role, normalize_role_arn, session_tags, AssumeRoleParams, CredentialSource,
};

mod export;
pub use export::{export_credentials, export_region, unset_credentials};

mod profile_files;
pub use profile_files::{cleanup_profile_files, validate_profile_name, write_profile_files};

mod config;
pub use config::{ActionInputs, InputReader};

mod oidc;
pub use oidc::fetch_id_token;

pub mod action;
pub mod logger;
