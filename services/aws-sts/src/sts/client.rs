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

use super::response::{
    AssumeRoleResponse, AssumeRoleResult, AssumeRoleWithWebIdentityResponse,
    GetCallerIdentityResponse,
};
use super::{
    parse_sts_error, sts_endpoint, AssumeRoleOutput, AssumeRoleRequest, RequestSigner, StsClient,
};
use crate::constants::{STS_API_VERSION, STS_SERVICE, USER_AGENT};
use crate::{AssumedRoleUser, CallerIdentity, Credential};
use async_trait::async_trait;
use awsauth_core::time::parse_rfc3339;
use awsauth_core::{Context, Error, Result};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT as USER_AGENT_HEADER};
use log::debug;
use quick_xml::de;
use serde::de::DeserializeOwned;

/// HttpStsClient speaks the STS query protocol over [`Context::http_send`].
///
/// Requests are form encoded POSTs to the regional endpoint. AssumeRole and
/// GetCallerIdentity are signed with SigV4.
#[derive(Debug, Clone)]
pub struct HttpStsClient {
    region: String,
    endpoint: String,
}

impl HttpStsClient {
    /// Create a client for the regional endpoint of `region`.
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            endpoint: format!("https://{}/", sts_endpoint(region)),
        }
    }

    /// Override the endpoint url.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(&self, body: String) -> Result<http::Request<Bytes>> {
        let req = http::Request::post(&self.endpoint)
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .header(USER_AGENT_HEADER, USER_AGENT)
            .body(Bytes::from(body))
            .map_err(|e| {
                Error::unexpected("failed to build STS request")
                    .with_source(e)
                    .with_context(format!("endpoint: {}", self.endpoint))
            })?;
        Ok(req)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        action: &str,
        req: http::Request<Bytes>,
    ) -> Result<T> {
        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            let retryable = e.is_retryable();
            Error::unexpected(format!("failed to send {action} request to STS"))
                .with_source(e)
                .with_context(format!("endpoint: {}", self.endpoint))
                .set_retryable(retryable)
        })?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.into_body();

        if status != http::StatusCode::OK {
            return Err(parse_sts_error(
                action,
                status,
                &body,
                request_id.as_deref(),
            ));
        }
        debug!("STS {action} succeeded, request id: {request_id:?}");

        de::from_str(&body).map_err(|e| {
            Error::unexpected(format!("failed to parse STS {action} response"))
                .with_source(e)
                .with_context(format!("response_length: {}", body.len()))
        })
    }
}

/// Form body for AssumeRole and AssumeRoleWithWebIdentity.
fn assume_role_body(action: &str, req: &AssumeRoleRequest, token: Option<&str>) -> String {
    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("Action", action)
        .append_pair("Version", STS_API_VERSION)
        .append_pair("RoleArn", &req.role_arn)
        .append_pair("RoleSessionName", &req.role_session_name)
        .append_pair("DurationSeconds", &req.duration_seconds.to_string());

    match token {
        Some(token) => {
            form.append_pair("WebIdentityToken", token);
        }
        None => {
            if let Some(external_id) = &req.external_id {
                form.append_pair("ExternalId", external_id);
            }
            for (idx, tag) in req.tags.iter().enumerate() {
                let n = idx + 1;
                form.append_pair(&format!("Tags.member.{n}.Key"), &tag.key)
                    .append_pair(&format!("Tags.member.{n}.Value"), &tag.value);
            }
        }
    }

    if let Some(policy) = &req.policy {
        form.append_pair("Policy", policy);
    }
    for (idx, arn) in req.policy_arns.iter().enumerate() {
        form.append_pair(&format!("PolicyArns.member.{}.arn", idx + 1), arn);
    }

    form.finish()
}

fn into_output(result: AssumeRoleResult) -> Result<AssumeRoleOutput> {
    let c = result.credentials;
    if c.access_key_id.trim().is_empty() || c.secret_access_key.trim().is_empty() {
        return Err(Error::unexpected("STS returned no credentials"));
    }

    let expiration = match c.expiration.trim() {
        "" => None,
        v => Some(parse_rfc3339(v).map_err(|e| {
            Error::unexpected("failed to parse credential expiration")
                .with_source(e)
                .with_context(format!("expiration_value: {v}"))
        })?),
    };
    let assumed_role_user = result.assumed_role_user.map(|u| AssumedRoleUser {
        arn: u.arn.trim().to_string(),
        assumed_role_id: u.assumed_role_id.trim().to_string(),
    });

    Ok(AssumeRoleOutput {
        credentials: Credential {
            access_key_id: c.access_key_id.trim().to_string(),
            secret_access_key: c.secret_access_key.trim().to_string(),
            session_token: Some(c.session_token.trim().to_string()).filter(|v| !v.is_empty()),
            expiration,
            account_id: assumed_role_user
                .as_ref()
                .and_then(|u| u.account_id())
                .map(str::to_string),
        },
        assumed_role_user,
    })
}

#[async_trait]
impl StsClient for HttpStsClient {
    async fn assume_role(
        &self,
        ctx: &Context,
        cred: &Credential,
        req: &AssumeRoleRequest,
    ) -> Result<AssumeRoleOutput> {
        let mut http_req = self.build_request(assume_role_body("AssumeRole", req, None))?;
        RequestSigner::new(STS_SERVICE, &self.region).sign(&mut http_req, cred)?;

        let resp: AssumeRoleResponse = self
            .send(ctx, "AssumeRole", http_req)
            .await
            .map_err(|e| e.with_context(format!("role_arn: {}", req.role_arn)))?;
        into_output(resp.result)
    }

    async fn assume_role_with_web_identity(
        &self,
        ctx: &Context,
        req: &AssumeRoleRequest,
        web_identity_token: &str,
    ) -> Result<AssumeRoleOutput> {
        let http_req = self.build_request(assume_role_body(
            "AssumeRoleWithWebIdentity",
            req,
            Some(web_identity_token),
        ))?;

        let resp: AssumeRoleWithWebIdentityResponse = self
            .send(ctx, "AssumeRoleWithWebIdentity", http_req)
            .await
            .map_err(|e| e.with_context(format!("role_arn: {}", req.role_arn)))?;
        into_output(resp.result)
    }

    async fn get_caller_identity(&self, ctx: &Context, cred: &Credential) -> Result<CallerIdentity> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "GetCallerIdentity")
            .append_pair("Version", STS_API_VERSION)
            .finish();
        let mut http_req = self.build_request(body)?;
        RequestSigner::new(STS_SERVICE, &self.region).sign(&mut http_req, cred)?;

        let resp: GetCallerIdentityResponse =
            self.send(ctx, "GetCallerIdentity", http_req).await?;
        Ok(CallerIdentity {
            account: resp.result.account.trim().to_string(),
            arn: resp.result.arn.trim().to_string(),
            user_id: resp.result.user_id.trim().to_string(),
        })
    }
}
