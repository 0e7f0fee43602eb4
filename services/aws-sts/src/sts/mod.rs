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

//! Minimal client for the STS query API.

mod client;
pub use client::HttpStsClient;
mod response;
mod sign;
pub use sign::RequestSigner;
mod utils;
pub use utils::{parse_sts_error, sts_endpoint, StsError};

use crate::{AssumedRoleUser, CallerIdentity, Credential};
use async_trait::async_trait;
use awsauth_core::{Context, Result};
use std::fmt::Debug;

/// A session tag attached to assumed role credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a new tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Parameters shared by AssumeRole and AssumeRoleWithWebIdentity.
///
/// `external_id` and `tags` are ignored by AssumeRoleWithWebIdentity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    /// Full ARN of the role.
    pub role_arn: String,
    /// Session name recorded by CloudTrail.
    pub role_session_name: String,
    /// Lifetime of the issued credentials.
    pub duration_seconds: u32,
    /// External id required by the role's trust policy.
    pub external_id: Option<String>,
    /// Session tags, in order.
    pub tags: Vec<Tag>,
    /// Inline session policy document.
    pub policy: Option<String>,
    /// Managed session policy ARNs.
    pub policy_arns: Vec<String>,
}

/// Credentials issued for a role session.
#[derive(Debug, Clone)]
pub struct AssumeRoleOutput {
    /// Temporary credentials.
    pub credentials: Credential,
    /// The role session, when STS returned it.
    pub assumed_role_user: Option<AssumedRoleUser>,
}

/// StsClient issues the three STS calls the action needs.
#[async_trait]
pub trait StsClient: Debug + Send + Sync + 'static {
    /// Call AssumeRole, signed with `cred`.
    async fn assume_role(
        &self,
        ctx: &Context,
        cred: &Credential,
        req: &AssumeRoleRequest,
    ) -> Result<AssumeRoleOutput>;

    /// Call AssumeRoleWithWebIdentity, which is not signed.
    async fn assume_role_with_web_identity(
        &self,
        ctx: &Context,
        req: &AssumeRoleRequest,
        web_identity_token: &str,
    ) -> Result<AssumeRoleOutput>;

    /// Call GetCallerIdentity, signed with `cred`.
    async fn get_caller_identity(&self, ctx: &Context, cred: &Credential) -> Result<CallerIdentity>;
}
