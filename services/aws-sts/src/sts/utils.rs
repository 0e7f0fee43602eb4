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

use super::response::ErrorResponse;
use awsauth_core::Error;
use quick_xml::de;

/// STS error codes worth retrying.
///
/// The identity provider may be briefly unreachable, and a freshly issued
/// token can be rejected until the provider's keys propagate.
const RETRYABLE_ERROR_CODES: [&str; 3] = [
    "IDPCommunicationError",
    "IDPCommunicationErrorException",
    "InvalidIdentityToken",
];

/// Get the regional sts endpoint.
///
/// The returning format may look like `sts.{region}.amazonaws.com`, while
/// China regions live under `amazonaws.com.cn`.
pub fn sts_endpoint(region: &str) -> String {
    if region.starts_with("cn-") {
        format!("sts.{region}.amazonaws.com.cn")
    } else {
        format!("sts.{region}.amazonaws.com")
    }
}

/// An error returned by STS itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StsError {
    /// Error code, like `AccessDenied`.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Request id for AWS support.
    pub request_id: Option<String>,
}

impl StsError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        RETRYABLE_ERROR_CODES.contains(&self.code.as_str())
    }
}

/// Turn a non-200 STS response into an [`Error`] carrying an [`StsError`].
pub fn parse_sts_error(
    action: &str,
    status: http::StatusCode,
    body: &str,
    request_id: Option<&str>,
) -> Error {
    let sts_error = match de::from_str::<ErrorResponse>(body) {
        Ok(resp) if !resp.error.code.is_empty() => StsError {
            code: resp.error.code,
            message: resp.error.message,
            request_id: Some(resp.request_id)
                .filter(|v| !v.is_empty())
                .or_else(|| request_id.map(str::to_string)),
        },
        _ => StsError {
            code: format!("HTTP{}", status.as_u16()),
            message: body.chars().take(256).collect(),
            request_id: request_id.map(str::to_string),
        },
    };

    let retryable = sts_error.is_retryable();
    let mut err = Error::unexpected(format!("STS {action} failed"))
        .with_context(format!("status: {status}"));
    if let Some(id) = &sts_error.request_id {
        err = err.with_context(format!("request_id: {id}"));
    }
    err.with_source(sts_error).set_retryable(retryable)
}
