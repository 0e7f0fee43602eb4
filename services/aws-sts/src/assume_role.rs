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

use crate::client::CredentialsClient;
use crate::constants::*;
use crate::sanitize::{sanitize_actor, sanitize_tag_value};
use crate::sts::{AssumeRoleOutput, AssumeRoleRequest, Tag};
use awsauth_core::{Context, Error, Result, Retry};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Where the credentials used to call STS come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// An OIDC token fetched from the runner.
    InlineWebIdentity(String),
    /// A file holding a web identity token.
    WebIdentityFile(PathBuf),
    /// Whatever long-term or session credentials the job already has.
    LongTermCredentials,
}

impl CredentialSource {
    /// Pick the source, the first match wins.
    pub fn resolve(web_identity_token: Option<&str>, web_identity_token_file: Option<&str>) -> Self {
        if let Some(token) = web_identity_token.filter(|v| !v.is_empty()) {
            return Self::InlineWebIdentity(token.to_string());
        }
        if let Some(path) = web_identity_token_file.filter(|v| !v.is_empty()) {
            return Self::WebIdentityFile(PathBuf::from(path));
        }
        Self::LongTermCredentials
    }
}

/// Everything needed to assume a role.
#[derive(Debug, Clone, Default)]
pub struct AssumeRoleParams {
    /// Role name or ARN.
    pub role_to_assume: String,
    /// Lifetime of the session.
    pub role_duration_seconds: u32,
    /// Session name.
    pub role_session_name: String,
    /// External id for AssumeRole.
    pub role_external_id: Option<String>,
    /// Don't attach GitHub session tags.
    pub role_skip_session_tagging: bool,
    /// Account used to expand a bare role name.
    pub source_account_id: Option<String>,
    /// OIDC token fetched from the runner.
    pub web_identity_token: Option<String>,
    /// Path to a web identity token file.
    pub web_identity_token_file: Option<String>,
    /// Inline session policy document.
    pub inline_session_policy: Option<String>,
    /// Managed session policy ARNs.
    pub managed_session_policies: Vec<String>,
}

/// Turn a role name into an ARN.
///
/// Values starting with `arn:aws` are taken as is.
pub fn normalize_role_arn(role: &str, source_account_id: Option<&str>) -> Result<String> {
    if role.starts_with("arn:aws") {
        return Ok(role.to_string());
    }

    match source_account_id.filter(|v| !v.is_empty()) {
        Some(account) => Ok(format!("arn:aws:iam::{account}:role/{role}")),
        None => Err(Error::ambiguous_role_reference(
            "Source Account ID is needed if the Role Name is provided and not the Role Arn.",
        )),
    }
}

/// Session tags describing the workflow run.
pub fn session_tags(ctx: &Context) -> Vec<Tag> {
    let var = |name: &str| ctx.env_var(name).unwrap_or_default();

    let mut tags = vec![
        Tag::new("GitHub", "Actions"),
        Tag::new("Repository", var(GITHUB_REPOSITORY)),
        Tag::new("Workflow", sanitize_tag_value(&var(GITHUB_WORKFLOW))),
        Tag::new("Action", var(GITHUB_ACTION)),
        Tag::new(
            "Actor",
            sanitize_tag_value(&sanitize_actor(&var(GITHUB_ACTOR))),
        ),
        Tag::new("Commit", var(GITHUB_SHA)),
    ];
    if let Some(git_ref) = ctx.env_var_non_empty(GITHUB_REF) {
        tags.push(Tag::new("Branch", sanitize_tag_value(&git_ref)));
    }
    tags
}

fn check_environment(ctx: &Context) -> Result<()> {
    for name in [
        GITHUB_REPOSITORY,
        GITHUB_WORKFLOW,
        GITHUB_ACTION,
        GITHUB_ACTOR,
        GITHUB_SHA,
        GITHUB_WORKSPACE,
    ] {
        if ctx.env_var_non_empty(name).is_none() {
            return Err(Error::missing_environment(format!(
                "Missing required environment variable. Are you running in GitHub Actions? {name} is not set"
            )));
        }
    }
    Ok(())
}

async fn read_token_file(ctx: &Context, path: &Path) -> Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(ctx.env_var(GITHUB_WORKSPACE).unwrap_or_default()).join(path)
    };
    let path = path.to_string_lossy().to_string();

    if !ctx.file_exists(&path).await.unwrap_or(false) {
        return Err(Error::token_file_not_found(format!(
            "Web identity token file does not exist: {path}"
        )));
    }

    let token = ctx.file_read_as_string(&path).await.map_err(|e| {
        Error::token_file_unreadable(format!("Web identity token file could not be read: {path}"))
            .with_source(e)
    })?;
    Ok(token.trim().to_string())
}

/// Assume `params.role_to_assume` and return the session credentials.
///
/// STS calls go through `retry`, and only errors STS flags as transient are
/// retried.
pub async fn assume_role(
    ctx: &Context,
    client: &CredentialsClient,
    params: &AssumeRoleParams,
    retry: &Retry,
) -> Result<AssumeRoleOutput> {
    check_environment(ctx)?;

    let role_arn = normalize_role_arn(
        &params.role_to_assume,
        params.source_account_id.as_deref(),
    )?;
    let mut req = AssumeRoleRequest {
        role_arn,
        role_session_name: params.role_session_name.clone(),
        duration_seconds: params.role_duration_seconds,
        external_id: params.role_external_id.clone().filter(|v| !v.is_empty()),
        tags: if params.role_skip_session_tagging {
            debug!("role session tagging has been skipped");
            Vec::new()
        } else {
            session_tags(ctx)
        },
        policy: params.inline_session_policy.clone().filter(|v| !v.is_empty()),
        policy_arns: params.managed_session_policies.clone(),
    };

    let source = CredentialSource::resolve(
        params.web_identity_token.as_deref(),
        params.web_identity_token_file.as_deref(),
    );
    if !matches!(source, CredentialSource::LongTermCredentials) {
        req.tags.clear();
        req.external_id = None;
    }

    let sts = client.sts();
    let output = match &source {
        CredentialSource::InlineWebIdentity(token) => {
            info!("Assuming role with OIDC");
            let (req, token) = (&req, token.as_str());
            retry
                .run(
                    ctx,
                    move || sts.assume_role_with_web_identity(ctx, req, token),
                    |e| e.is_retryable(),
                )
                .await
                .map_err(|e| {
                    Error::role_assumption_failed("Could not assume role with OIDC").with_source(e)
                })?
        }
        CredentialSource::WebIdentityFile(path) => {
            info!("Assuming role with web identity token file");
            let token = read_token_file(ctx, path).await?;
            let (req, token) = (&req, token.as_str());
            retry
                .run(
                    ctx,
                    move || sts.assume_role_with_web_identity(ctx, req, token),
                    |e| e.is_retryable(),
                )
                .await
                .map_err(|e| {
                    Error::role_assumption_failed(
                        "Could not assume role with web identity token file",
                    )
                    .with_source(e)
                })?
        }
        CredentialSource::LongTermCredentials => {
            info!("Assuming role with user credentials");
            let cred = client.load_credentials(ctx).await?;
            let (req, cred) = (&req, &cred);
            retry
                .run(
                    ctx,
                    move || sts.assume_role(ctx, cred, req),
                    |e| e.is_retryable(),
                )
                .await
                .map_err(|e| {
                    Error::role_assumption_failed("Could not assume role with user credentials")
                        .with_source(e)
                })?
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sts::StsClient;
    use crate::{AssumedRoleUser, CallerIdentity, Credential};
    use async_trait::async_trait;
    use awsauth_core::{ErrorKind, MemoryRunner, RecordingSleep};
    use awsauth_file_tokio::TokioFileRead;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use test_case::test_case;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        AssumeRole(String, AssumeRoleRequest),
        WebIdentity(String, AssumeRoleRequest),
    }

    /// Fails the first `failures` calls with `code`, then succeeds.
    #[derive(Debug, Default)]
    struct MockSts {
        calls: Mutex<Vec<Call>>,
        failures: Mutex<Vec<&'static str>>,
    }

    impl MockSts {
        fn failing(codes: Vec<&'static str>) -> Self {
            Self {
                failures: Mutex::new(codes),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("lock poisoned").clone()
        }

        fn respond(&self) -> Result<AssumeRoleOutput> {
            let mut failures = self.failures.lock().expect("lock poisoned");
            if !failures.is_empty() {
                let code = failures.remove(0);
                let body = format!(
                    "<ErrorResponse><Error><Type>Sender</Type><Code>{code}</Code><Message>mock</Message></Error></ErrorResponse>"
                );
                return Err(crate::sts::parse_sts_error(
                    "AssumeRole",
                    http::StatusCode::BAD_REQUEST,
                    &body,
                    None,
                ));
            }
            Ok(AssumeRoleOutput {
                credentials: Credential::new("ASIAROLE", "rolesecret").with_session_token("roletoken"),
                assumed_role_user: Some(AssumedRoleUser {
                    arn: "arn:aws:sts::111111111111:assumed-role/MY-ROLE/GitHubActions".to_string(),
                    assumed_role_id: "AROAEXAMPLE:GitHubActions".to_string(),
                }),
            })
        }
    }

    #[async_trait]
    impl StsClient for MockSts {
        async fn assume_role(
            &self,
            _: &Context,
            cred: &Credential,
            req: &AssumeRoleRequest,
        ) -> Result<AssumeRoleOutput> {
            self.calls
                .lock()
                .expect("lock poisoned")
                .push(Call::AssumeRole(cred.access_key_id.clone(), req.clone()));
            self.respond()
        }

        async fn assume_role_with_web_identity(
            &self,
            _: &Context,
            req: &AssumeRoleRequest,
            token: &str,
        ) -> Result<AssumeRoleOutput> {
            self.calls
                .lock()
                .expect("lock poisoned")
                .push(Call::WebIdentity(token.to_string(), req.clone()));
            self.respond()
        }

        async fn get_caller_identity(&self, _: &Context, _: &Credential) -> Result<CallerIdentity> {
            Err(Error::unexpected("not used"))
        }
    }

    fn github_env() -> HashMap<String, String> {
        [
            (GITHUB_REPOSITORY, "MY-REPOSITORY-NAME"),
            (GITHUB_WORKFLOW, "MY-WORKFLOW-ID"),
            (GITHUB_ACTION, "MY-ACTION-NAME"),
            (GITHUB_ACTOR, "MY-USERNAME[bot]"),
            (GITHUB_SHA, "MY-COMMIT-ID"),
            (GITHUB_REF, "MY-BRANCH"),
            (GITHUB_WORKSPACE, "/home/github"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn context_with(envs: HashMap<String, String>) -> (Context, RecordingSleep) {
        let runner = MemoryRunner::new(envs);
        let sleep = RecordingSleep::new();
        let ctx = Context::new()
            .with_file_read(TokioFileRead)
            .with_env(runner.clone())
            .with_runner(runner)
            .with_sleep(sleep.clone());
        (ctx, sleep)
    }

    fn params() -> AssumeRoleParams {
        AssumeRoleParams {
            role_to_assume: "arn:aws:iam::111111111111:role/MY-ROLE".to_string(),
            role_duration_seconds: DEFAULT_ROLE_DURATION_SECONDS,
            role_session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
            role_external_id: Some("abcdef".to_string()),
            ..Default::default()
        }
    }

    fn pinned_client(sts: std::sync::Arc<MockSts>) -> CredentialsClient {
        let mut client = CredentialsClient::new(sts);
        client.pin_credential(Credential::new("AKIDLONGTERM", "secret"));
        client
    }

    #[test_case("arn:aws:iam::111111111111:role/MY-ROLE", None, "arn:aws:iam::111111111111:role/MY-ROLE"; "full arn")]
    #[test_case("arn:aws-cn:iam::111111111111:role/MY-ROLE", None, "arn:aws-cn:iam::111111111111:role/MY-ROLE"; "partition arn")]
    #[test_case("MY-ROLE", Some("123456789012"), "arn:aws:iam::123456789012:role/MY-ROLE"; "bare name")]
    fn test_normalize_role_arn(role: &str, account: Option<&str>, expected: &str) {
        assert_eq!(
            normalize_role_arn(role, account).expect("role must normalize"),
            expected
        );
    }

    #[test]
    fn test_normalize_role_arn_without_account() {
        let err = normalize_role_arn("MY-ROLE", None).expect_err("must be ambiguous");
        assert_eq!(err.kind(), ErrorKind::AmbiguousRoleReference);
        let err = normalize_role_arn("MY-ROLE", Some("")).expect_err("must be ambiguous");
        assert_eq!(err.kind(), ErrorKind::AmbiguousRoleReference);
    }

    #[test]
    fn test_credential_source_precedence() {
        assert_eq!(
            CredentialSource::resolve(Some("token"), Some("file")),
            CredentialSource::InlineWebIdentity("token".to_string())
        );
        assert_eq!(
            CredentialSource::resolve(Some(""), Some("file")),
            CredentialSource::WebIdentityFile(PathBuf::from("file"))
        );
        assert_eq!(
            CredentialSource::resolve(None, None),
            CredentialSource::LongTermCredentials
        );
    }

    #[tokio::test]
    async fn test_assume_role_with_long_term_credentials() -> Result<()> {
        let (ctx, _) = context_with(github_env());
        let sts = std::sync::Arc::new(MockSts::default());
        let client = pinned_client(sts.clone());

        let output = assume_role(&ctx, &client, &params(), &Retry::new()).await?;
        assert_eq!(output.credentials.access_key_id, "ASIAROLE");

        let calls = sts.calls();
        assert_eq!(calls.len(), 1);
        let Call::AssumeRole(ak, req) = &calls[0] else {
            panic!("expected AssumeRole, got {:?}", calls[0]);
        };
        assert_eq!(ak, "AKIDLONGTERM");
        assert_eq!(req.external_id.as_deref(), Some("abcdef"));
        assert_eq!(
            req.tags,
            vec![
                Tag::new("GitHub", "Actions"),
                Tag::new("Repository", "MY-REPOSITORY-NAME"),
                Tag::new("Workflow", "MY-WORKFLOW-ID"),
                Tag::new("Action", "MY-ACTION-NAME"),
                Tag::new("Actor", "MY-USERNAME_bot_"),
                Tag::new("Commit", "MY-COMMIT-ID"),
                Tag::new("Branch", "MY-BRANCH"),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_assume_role_with_oidc_drops_tags() -> Result<()> {
        let (ctx, _) = context_with(github_env());
        let sts = std::sync::Arc::new(MockSts::default());
        let client = CredentialsClient::new(sts.clone());

        let mut params = params();
        params.web_identity_token = Some("testoidctoken".to_string());
        params.inline_session_policy = Some(r#"{"Version":"2012-10-17"}"#.to_string());
        assume_role(&ctx, &client, &params, &Retry::new()).await?;

        let calls = sts.calls();
        let Call::WebIdentity(token, req) = &calls[0] else {
            panic!("expected AssumeRoleWithWebIdentity, got {:?}", calls[0]);
        };
        assert_eq!(token, "testoidctoken");
        assert!(req.tags.is_empty());
        assert_eq!(req.external_id, None);
        assert_eq!(req.policy.as_deref(), Some(r#"{"Version":"2012-10-17"}"#));
        Ok(())
    }

    #[tokio::test]
    async fn test_assume_role_skip_session_tagging() -> Result<()> {
        let (ctx, _) = context_with(github_env());
        let sts = std::sync::Arc::new(MockSts::default());
        let client = pinned_client(sts.clone());

        let mut params = params();
        params.role_skip_session_tagging = true;
        assume_role(&ctx, &client, &params, &Retry::new()).await?;

        let Call::AssumeRole(_, req) = &sts.calls()[0] else {
            panic!("expected AssumeRole");
        };
        assert!(req.tags.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_assume_role_with_token_file() -> anyhow::Result<()> {
        let workspace = tempfile::tempdir()?;
        std::fs::write(workspace.path().join("token"), "filetoken\n")?;

        let mut envs = github_env();
        envs.insert(
            GITHUB_WORKSPACE.to_string(),
            workspace.path().to_string_lossy().to_string(),
        );
        let (ctx, _) = context_with(envs);
        let sts = std::sync::Arc::new(MockSts::default());
        let client = CredentialsClient::new(sts.clone());

        let mut params = params();
        params.web_identity_token_file = Some("token".to_string());
        assume_role(&ctx, &client, &params, &Retry::new()).await?;

        let Call::WebIdentity(token, req) = &sts.calls()[0] else {
            panic!("expected AssumeRoleWithWebIdentity");
        };
        assert_eq!(token, "filetoken");
        assert!(req.tags.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_assume_role_with_missing_token_file() {
        let (ctx, _) = context_with(github_env());
        let sts = std::sync::Arc::new(MockSts::default());
        let client = CredentialsClient::new(sts.clone());

        let mut params = params();
        params.web_identity_token_file = Some("/non/existent/token".to_string());
        let err = assume_role(&ctx, &client, &params, &Retry::new())
            .await
            .expect_err("token file must be missing");
        assert_eq!(err.kind(), ErrorKind::TokenFileNotFound);
        assert!(sts.calls().is_empty());
    }

    #[tokio::test]
    async fn test_assume_role_missing_environment() {
        let mut envs = github_env();
        envs.remove(GITHUB_SHA);
        let (ctx, _) = context_with(envs);
        let client = pinned_client(std::sync::Arc::new(MockSts::default()));

        let err = assume_role(&ctx, &client, &params(), &Retry::new())
            .await
            .expect_err("environment must be incomplete");
        assert_eq!(err.kind(), ErrorKind::MissingEnvironment);
        assert!(err.to_string().contains(GITHUB_SHA));
    }

    #[tokio::test]
    async fn test_assume_role_retries_idp_errors() -> Result<()> {
        let (ctx, sleep) = context_with(github_env());
        let sts = std::sync::Arc::new(MockSts::failing(vec![
            "IDPCommunicationError",
            "InvalidIdentityToken",
        ]));
        let client = pinned_client(sts.clone());

        assume_role(&ctx, &client, &params(), &Retry::new()).await?;
        assert_eq!(sts.calls().len(), 3);
        assert_eq!(sleep.calls().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_assume_role_does_not_retry_access_denied() {
        let (ctx, sleep) = context_with(github_env());
        let sts = std::sync::Arc::new(MockSts::failing(vec!["AccessDenied"]));
        let client = pinned_client(sts.clone());

        let err = assume_role(&ctx, &client, &params(), &Retry::new())
            .await
            .expect_err("AccessDenied must fail");
        assert_eq!(err.kind(), ErrorKind::RoleAssumptionFailed);
        assert!(err.to_string().contains("AccessDenied"));
        assert_eq!(sts.calls().len(), 1);
        assert!(sleep.calls().is_empty());
    }
}
