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

//! In-memory stand-ins for STS and the runner's OIDC token endpoint.

use async_trait::async_trait;
use awsauth_core::{Context, HttpSend, MemoryRunner, RecordingSleep, Result};
use awsauth_file_tokio::{TokioFileRead, TokioFileWrite};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TOKEN_URL: &str = "https://token.actions.githubusercontent.test/idtoken?api-version=2.0";
pub const OIDC_TOKEN: &str = "testoidctoken";
pub const ROLE_ARN: &str = "arn:aws:iam::111111111111:role/MY-ROLE";
pub const ROLE_ACCESS_KEY_ID: &str = "ASIAROLEEXAMPLE";
pub const ROLE_SECRET_ACCESS_KEY: &str = "rolesecretaccesskey";
pub const ROLE_SESSION_TOKEN: &str = "rolesessiontoken";
pub const ACCOUNT_ID: &str = "111111111111";

/// A request seen by [`MockAws`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub uri: String,
    pub form: HashMap<String, String>,
    pub signed: bool,
}

impl Recorded {
    pub fn action(&self) -> Option<&str> {
        self.form.get("Action").map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<Recorded>,
    sts_failures: Vec<&'static str>,
}

/// MockAws answers OIDC token requests and STS calls.
#[derive(Debug, Clone, Default)]
pub struct MockAws {
    state: Arc<Mutex<State>>,
}

impl MockAws {
    /// Fail the next AssumeRole* calls with these STS error codes.
    pub fn fail_assume_role_with(self, codes: Vec<&'static str>) -> Self {
        self.state.lock().expect("lock poisoned").sts_failures = codes;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().expect("lock poisoned").requests.clone()
    }

    pub fn sts_actions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.action().map(str::to_string))
            .collect()
    }

    fn respond(&self, recorded: &Recorded) -> (u16, String) {
        if recorded.uri.starts_with("https://token.actions.githubusercontent.test/") {
            return (200, format!(r#"{{"count":1,"value":"{OIDC_TOKEN}"}}"#));
        }

        let action = recorded.action().unwrap_or_default().to_string();
        if action.starts_with("AssumeRole") {
            let mut state = self.state.lock().expect("lock poisoned");
            if !state.sts_failures.is_empty() {
                let code = state.sts_failures.remove(0);
                return (
                    400,
                    format!(
                        "<ErrorResponse><Error><Type>Sender</Type><Code>{code}</Code><Message>mocked failure</Message></Error><RequestId>req-1</RequestId></ErrorResponse>"
                    ),
                );
            }
            return (
                200,
                format!(
                    r#"<{action}Response xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <{action}Result>
    <AssumedRoleUser>
      <Arn>arn:aws:sts::{ACCOUNT_ID}:assumed-role/MY-ROLE/GitHubActions</Arn>
      <AssumedRoleId>AROAEXAMPLE:GitHubActions</AssumedRoleId>
    </AssumedRoleUser>
    <Credentials>
      <AccessKeyId>{ROLE_ACCESS_KEY_ID}</AccessKeyId>
      <SecretAccessKey>{ROLE_SECRET_ACCESS_KEY}</SecretAccessKey>
      <SessionToken>{ROLE_SESSION_TOKEN}</SessionToken>
      <Expiration>2030-01-01T00:00:00Z</Expiration>
    </Credentials>
  </{action}Result>
</{action}Response>"#
                ),
            );
        }

        match action.as_str() {
            "GetCallerIdentity" => (
                200,
                format!(
                    r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetCallerIdentityResult>
    <Arn>arn:aws:sts::{ACCOUNT_ID}:assumed-role/MY-ROLE/GitHubActions</Arn>
    <UserId>AROAEXAMPLE:GitHubActions</UserId>
    <Account>{ACCOUNT_ID}</Account>
  </GetCallerIdentityResult>
</GetCallerIdentityResponse>"#
                ),
            ),
            _ => (404, "not found".to_string()),
        }
    }
}

#[async_trait]
impl HttpSend for MockAws {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let recorded = Recorded {
            uri: req.uri().to_string(),
            form: form_urlencoded::parse(req.body()).into_owned().collect(),
            signed: req
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("AWS4-HMAC-SHA256")),
        };
        let (status, body) = self.respond(&recorded);
        self.state
            .lock()
            .expect("lock poisoned")
            .requests
            .push(recorded);

        Ok(http::Response::builder()
            .status(status)
            .body(Bytes::from(body))?)
    }
}

/// Variables the runner always sets.
pub fn github_env() -> Vec<(&'static str, String)> {
    vec![
        ("GITHUB_REPOSITORY", "MY-REPOSITORY-NAME".to_string()),
        ("GITHUB_WORKFLOW", "MY-WORKFLOW-ID".to_string()),
        ("GITHUB_ACTION", "MY-ACTION-NAME".to_string()),
        ("GITHUB_ACTOR", "MY-USERNAME[bot]".to_string()),
        ("GITHUB_SHA", "MY-COMMIT-ID".to_string()),
        ("GITHUB_REF", "MY-BRANCH".to_string()),
        ("GITHUB_WORKSPACE", "/home/github".to_string()),
        ("GITHUB_ACTIONS", "true".to_string()),
    ]
}

/// A job environment for tests.
pub struct Job {
    pub ctx: Context,
    pub runner: MemoryRunner,
    pub aws: MockAws,
    pub sleep: RecordingSleep,
}

impl Job {
    pub fn new(aws: MockAws, envs: Vec<(&'static str, String)>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let runner = MemoryRunner::new(
            github_env()
                .into_iter()
                .chain(envs)
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        let sleep = RecordingSleep::new();
        let ctx = Context::new()
            .with_file_read(TokioFileRead)
            .with_file_write(TokioFileWrite)
            .with_http_send(aws.clone())
            .with_env(runner.clone())
            .with_runner(runner.clone())
            .with_sleep(sleep.clone());
        Self {
            ctx,
            runner,
            aws,
            sleep,
        }
    }

    pub fn output(&self, name: &str) -> Option<String> {
        self.runner.outputs().get(name).cloned()
    }
}
