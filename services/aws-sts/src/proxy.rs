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

use awsauth_core::Context;

/// ProxyResolver decides which proxy, if any, a request should go through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyResolver {
    http_proxy: Option<String>,
    https_proxy: Option<String>,
    no_proxy: Vec<String>,
}

impl ProxyResolver {
    /// Create a resolver from explicit settings.
    ///
    /// `no_proxy` is a comma or whitespace separated list.
    pub fn new(
        http_proxy: Option<String>,
        https_proxy: Option<String>,
        no_proxy: Option<&str>,
    ) -> Self {
        let no_proxy = no_proxy
            .unwrap_or_default()
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_ascii_lowercase())
            .collect();
        Self {
            http_proxy: http_proxy.filter(|v| !v.is_empty()),
            https_proxy: https_proxy.filter(|v| !v.is_empty()),
            no_proxy,
        }
    }

    /// Build a resolver from the `http-proxy` / `no-proxy` inputs, falling
    /// back to the conventional proxy environment variables.
    ///
    /// An explicit `http-proxy` input is used for both schemes.
    pub fn from_env(ctx: &Context, http_proxy: Option<&str>, no_proxy: Option<&str>) -> Self {
        let env = |upper: &str, lower: &str| {
            ctx.env_var_non_empty(upper)
                .or_else(|| ctx.env_var_non_empty(lower))
        };

        let (http, https) = match http_proxy {
            Some(p) => (Some(p.to_string()), Some(p.to_string())),
            None => (
                env("HTTP_PROXY", "http_proxy"),
                env("HTTPS_PROXY", "https_proxy"),
            ),
        };
        let no_proxy = no_proxy
            .map(str::to_string)
            .or_else(|| env("NO_PROXY", "no_proxy"));

        Self::new(http, https, no_proxy.as_deref())
    }

    /// Returns true if no proxy is configured at all.
    pub fn is_empty(&self) -> bool {
        self.http_proxy.is_none() && self.https_proxy.is_none()
    }

    /// Return the proxy to use for `url`, or `None` to connect directly.
    ///
    /// Unparseable urls are sent directly.
    pub fn proxy_for_url(&self, url: &str) -> Option<String> {
        let uri: http::Uri = url.parse().ok()?;
        let scheme = uri.scheme_str()?.to_ascii_lowercase();
        let host = uri.host()?.to_ascii_lowercase();
        let port = uri
            .port_u16()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });

        if self.is_excluded(&host, port) {
            log::debug!("{host}:{port} matches no_proxy, connecting directly");
            return None;
        }

        if scheme == "https" {
            self.https_proxy.clone()
        } else {
            self.http_proxy.clone()
        }
    }

    fn is_excluded(&self, host: &str, port: u16) -> bool {
        self.no_proxy.iter().any(|entry| {
            if entry == "*" {
                return true;
            }

            let (pattern, entry_port) = match entry.rsplit_once(':') {
                Some((h, p)) => match p.parse::<u16>() {
                    Ok(p) => (h, Some(p)),
                    Err(_) => (entry.as_str(), None),
                },
                None => (entry.as_str(), None),
            };
            if entry_port.is_some_and(|p| p != port) {
                return false;
            }

            if pattern.starts_with('*') || pattern.starts_with('.') {
                // `*.example.com` and `.example.com` only match subdomains.
                let suffix = pattern.trim_start_matches('*');
                host.ends_with(suffix)
            } else {
                host == pattern
            }
        })
    }
}
