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

use crate::constants::*;
use awsauth_core::{Context, Error, Result};
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, USER_AGENT as USER_AGENT_HEADER};
use http::Method;
use log::debug;
use serde::Deserialize;

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct IdTokenResponse {
    value: String,
}

/// Build the token request url for `audience`.
pub fn id_token_url(base: &str, audience: &str) -> String {
    let audience: String = form_urlencoded::byte_serialize(audience.as_bytes()).collect();
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}audience={audience}")
}

/// Fetch an OIDC token for `audience` from the runner.
///
/// The workflow needs `id-token: write` for the runner to expose the token
/// endpoint. The token is masked before it is returned.
pub async fn fetch_id_token(ctx: &Context, audience: &str) -> Result<String> {
    let (Some(request_token), Some(request_url)) = (
        ctx.env_var_non_empty(ACTIONS_ID_TOKEN_REQUEST_TOKEN),
        ctx.env_var_non_empty(ACTIONS_ID_TOKEN_REQUEST_URL),
    ) else {
        return Err(Error::id_token_unavailable(
            "Unable to get ACTIONS_ID_TOKEN_REQUEST_URL or ACTIONS_ID_TOKEN_REQUEST_TOKEN env variable",
        )
        .with_context("hint: grant the workflow `id-token: write` permission"));
    };

    let url = id_token_url(&request_url, audience);
    let req = http::Request::builder()
        .method(Method::GET)
        .uri(&url)
        .header(AUTHORIZATION, format!("Bearer {request_token}"))
        .header(ACCEPT, "application/json; api-version=2.0")
        .header(USER_AGENT_HEADER, USER_AGENT)
        .body(Bytes::new())?;

    let resp = ctx.http_send_as_string(req).await.map_err(|e| {
        let retryable = e.is_retryable();
        Error::id_token_unavailable("Failed to get ID token")
            .with_source(e)
            .set_retryable(retryable)
    })?;
    let status = resp.status();
    if status != http::StatusCode::OK {
        return Err(Error::id_token_unavailable(format!(
            "Failed to get ID token. Response Code: {status}"
        ))
        .with_context(format!("body: {}", resp.body().chars().take(256).collect::<String>()))
        .set_retryable(status.is_server_error()));
    }

    let token = serde_json::from_str::<IdTokenResponse>(resp.body())
        .map_err(|e| Error::id_token_unavailable("Failed to parse ID token response").with_source(e))?
        .value;
    if token.is_empty() {
        return Err(Error::id_token_unavailable("Response json body do not have ID Token field"));
    }

    ctx.set_secret(&token);
    debug!("fetched ID token for audience {audience}");
    Ok(token)
}
