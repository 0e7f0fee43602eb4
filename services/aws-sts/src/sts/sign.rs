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

//! AWS SigV4 header signing for STS query requests.

use crate::constants::{X_AMZ_DATE, X_AMZ_SECURITY_TOKEN};
use crate::Credential;
use awsauth_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use awsauth_core::time::{format_date, format_iso8601, now, DateTime};
use awsauth_core::{Error, Result};
use bytes::Bytes;
use http::header::{self, HeaderValue};
use log::debug;
use std::fmt::Write;

/// RequestSigner signs a request in place with AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for `service` in `region`.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Add `host`, `x-amz-date`, `x-amz-security-token` and `authorization`.
    ///
    /// Every header already present on the request is signed.
    pub fn sign(&self, req: &mut http::Request<Bytes>, cred: &Credential) -> Result<()> {
        let now = self.time.unwrap_or_else(now);

        if !req.headers().contains_key(header::HOST) {
            let authority = req
                .uri()
                .authority()
                .ok_or_else(|| Error::unexpected("request to sign has no authority"))?
                .as_str()
                .to_string();
            req.headers_mut()
                .insert(header::HOST, HeaderValue::try_from(authority)?);
        }
        req.headers_mut()
            .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
        if let Some(token) = &cred.session_token {
            let mut value = HeaderValue::from_str(token)?;
            value.set_sensitive(true);
            req.headers_mut().insert(X_AMZ_SECURITY_TOKEN, value);
        }

        let (creq, signed_headers) = canonical_request_string(req)?;
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let mut string_to_sign = String::new();
        writeln!(string_to_sign, "AWS4-HMAC-SHA256")?;
        writeln!(string_to_sign, "{}", format_iso8601(now))?;
        writeln!(string_to_sign, "{scope}")?;
        write!(string_to_sign, "{encoded_req}")?;

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id, scope, signed_headers, signature
        ))?;
        authorization.set_sensitive(true);
        req.headers_mut().insert(header::AUTHORIZATION, authorization);

        Ok(())
    }
}

/// Returns the canonical request and the signed header list.
fn canonical_request_string(req: &http::Request<Bytes>) -> Result<(String, String)> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{}", req.method())?;
    writeln!(f, "{}", req.uri().path())?;

    let mut query: Vec<&str> = req
        .uri()
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|v| !v.is_empty())
        .collect();
    query.sort_unstable();
    writeln!(f, "{}", query.join("&"))?;

    let mut headers: Vec<(String, String)> = Vec::with_capacity(req.headers().len());
    for (name, value) in req.headers() {
        if name == header::AUTHORIZATION {
            continue;
        }
        let value = value.to_str().map_err(|e| {
            Error::unexpected("header value to sign is not visible ascii")
                .with_source(e)
                .with_context(format!("header: {name}"))
        })?;
        // Sequential spaces collapse to one.
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        headers.push((name.as_str().to_string(), value));
    }
    headers.sort();

    for (name, value) in &headers {
        writeln!(f, "{name}:{value}")?;
    }
    writeln!(f)?;

    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    writeln!(f, "{signed_headers}")?;
    write!(f, "{}", hex_sha256(req.body()))?;

    Ok((f, signed_headers))
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
