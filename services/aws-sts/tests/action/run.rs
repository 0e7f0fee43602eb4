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

use super::run_action;
use crate::mock::*;
use anyhow::Result;
use awsauth_core::ErrorKind;
use ini::Ini;
use pretty_assertions::assert_eq;

fn oidc_env() -> Vec<(&'static str, String)> {
    vec![
        ("ACTIONS_ID_TOKEN_REQUEST_TOKEN", "requesttoken".to_string()),
        ("ACTIONS_ID_TOKEN_REQUEST_URL", TOKEN_URL.to_string()),
        ("INPUT_ROLE-TO-ASSUME", ROLE_ARN.to_string()),
        ("INPUT_AWS-REGION", "us-east-1".to_string()),
    ]
}

fn static_key_env() -> Vec<(&'static str, String)> {
    vec![
        ("INPUT_AWS-ACCESS-KEY-ID", "MYAWSACCESSKEYID".to_string()),
        ("INPUT_AWS-SECRET-ACCESS-KEY", "MYAWSSECRETACCESSKEY".to_string()),
        ("INPUT_AWS-REGION", "eu-west-1".to_string()),
    ]
}

#[tokio::test]
async fn test_oidc_role_assumption() -> Result<()> {
    let job = Job::new(MockAws::default(), oidc_env());

    run_action(&job).await?;

    let requests = job.aws.requests();
    assert_eq!(
        requests[0].uri,
        format!("{TOKEN_URL}&audience=sts.amazonaws.com")
    );
    assert_eq!(
        job.aws.sts_actions(),
        vec!["AssumeRoleWithWebIdentity", "GetCallerIdentity"]
    );

    let assume = &requests[1];
    assert!(!assume.signed);
    assert_eq!(assume.form["WebIdentityToken"], OIDC_TOKEN);
    assert_eq!(assume.form["RoleArn"], ROLE_ARN);
    assert_eq!(assume.form["RoleSessionName"], "GitHubActions");
    assert_eq!(assume.form["DurationSeconds"], "3600");
    assert!(!assume.form.contains_key("Tags.member.1.Key"));
    assert!(!assume.form.contains_key("ExternalId"));
    assert!(requests[2].signed);

    let runner = &job.runner;
    assert_eq!(runner.exported_var("AWS_ACCESS_KEY_ID").as_deref(), Some(ROLE_ACCESS_KEY_ID));
    assert_eq!(
        runner.exported_var("AWS_SECRET_ACCESS_KEY").as_deref(),
        Some(ROLE_SECRET_ACCESS_KEY)
    );
    assert_eq!(runner.exported_var("AWS_SESSION_TOKEN").as_deref(), Some(ROLE_SESSION_TOKEN));
    assert_eq!(runner.exported_var("AWS_REGION").as_deref(), Some("us-east-1"));
    assert_eq!(runner.exported_var("AWS_DEFAULT_REGION").as_deref(), Some("us-east-1"));
    assert_eq!(runner.exported_var("AWS_ACCOUNT_ID").as_deref(), Some(ACCOUNT_ID));

    let secrets = runner.secrets();
    for secret in [OIDC_TOKEN, ROLE_ACCESS_KEY_ID, ROLE_SECRET_ACCESS_KEY, ROLE_SESSION_TOKEN] {
        assert!(secrets.iter().any(|s| s == secret), "{secret} must be masked");
    }

    assert_eq!(job.output("aws-account-id").as_deref(), Some(ACCOUNT_ID));
    assert_eq!(job.output("aws-region").as_deref(), Some("us-east-1"));
    assert_eq!(job.output("aws-access-key-id"), None);
    Ok(())
}

#[tokio::test]
async fn test_static_keys_without_role() -> Result<()> {
    let job = Job::new(MockAws::default(), static_key_env());

    run_action(&job).await?;

    assert_eq!(job.aws.sts_actions(), vec!["GetCallerIdentity"]);
    assert!(job.aws.requests()[0].signed);

    let runner = &job.runner;
    assert_eq!(
        runner.exported_var("AWS_ACCESS_KEY_ID").as_deref(),
        Some("MYAWSACCESSKEYID")
    );
    assert_eq!(
        runner.exported_var("AWS_SECRET_ACCESS_KEY").as_deref(),
        Some("MYAWSSECRETACCESSKEY")
    );
    assert_eq!(runner.exported_var("AWS_SESSION_TOKEN"), None);
    assert_eq!(runner.exported_var("AWS_REGION").as_deref(), Some("eu-west-1"));
    assert!(runner.secrets().iter().any(|s| s == "MYAWSSECRETACCESSKEY"));
    assert_eq!(job.output("aws-account-id").as_deref(), Some(ACCOUNT_ID));
    Ok(())
}

#[tokio::test]
async fn test_static_keys_assume_role() -> Result<()> {
    let mut envs = static_key_env();
    envs.push(("INPUT_ROLE-TO-ASSUME", "MY-ROLE".to_string()));
    envs.push(("INPUT_ROLE-EXTERNAL-ID", "abcdef".to_string()));
    envs.push(("INPUT_OUTPUT-CREDENTIALS", "true".to_string()));
    let job = Job::new(MockAws::default(), envs);

    run_action(&job).await?;

    assert_eq!(
        job.aws.sts_actions(),
        vec!["GetCallerIdentity", "AssumeRole", "GetCallerIdentity"]
    );
    let assume = &job.aws.requests()[1];
    assert!(assume.signed);
    // The bare role name is expanded with the caller's account.
    assert_eq!(assume.form["RoleArn"], ROLE_ARN);
    assert_eq!(assume.form["ExternalId"], "abcdef");
    assert_eq!(assume.form["Tags.member.1.Key"], "GitHub");
    assert_eq!(assume.form["Tags.member.1.Value"], "Actions");
    assert_eq!(assume.form["Tags.member.5.Key"], "Actor");
    assert_eq!(assume.form["Tags.member.5.Value"], "MY-USERNAME_bot_");
    assert_eq!(assume.form["Tags.member.7.Key"], "Branch");

    assert_eq!(
        job.runner.exported_var("AWS_ACCESS_KEY_ID").as_deref(),
        Some(ROLE_ACCESS_KEY_ID)
    );
    assert_eq!(job.output("aws-access-key-id").as_deref(), Some(ROLE_ACCESS_KEY_ID));
    assert_eq!(job.output("aws-session-token").as_deref(), Some(ROLE_SESSION_TOKEN));
    assert_eq!(
        job.output("aws-expiration").as_deref(),
        Some("2030-01-01T00:00:00.000Z")
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_token_file() {
    let job = Job::new(
        MockAws::default(),
        vec![
            ("INPUT_ROLE-TO-ASSUME", ROLE_ARN.to_string()),
            ("INPUT_WEB-IDENTITY-TOKEN-FILE", "/non/existent/token".to_string()),
            ("INPUT_AWS-REGION", "us-east-1".to_string()),
        ],
    );

    let err = run_action(&job).await.expect_err("token file is missing");
    assert_eq!(err.kind(), ErrorKind::TokenFileNotFound);
    assert!(job.aws.requests().is_empty());
    assert_eq!(job.runner.exported_var("AWS_ACCESS_KEY_ID"), None);
}

#[tokio::test]
async fn test_relative_token_file() -> Result<()> {
    let workspace = tempfile::tempdir()?;
    std::fs::create_dir(workspace.path().join("tokens"))?;
    std::fs::write(workspace.path().join("tokens/web-identity"), "filetoken\n")?;

    let job = Job::new(
        MockAws::default(),
        vec![
            ("GITHUB_WORKSPACE", workspace.path().to_string_lossy().to_string()),
            ("INPUT_ROLE-TO-ASSUME", ROLE_ARN.to_string()),
            ("INPUT_WEB-IDENTITY-TOKEN-FILE", "tokens/web-identity".to_string()),
            ("INPUT_AWS-REGION", "us-east-1".to_string()),
        ],
    );

    run_action(&job).await?;

    let requests = job.aws.requests();
    assert_eq!(requests[0].action(), Some("AssumeRoleWithWebIdentity"));
    assert_eq!(requests[0].form["WebIdentityToken"], "filetoken");
    Ok(())
}

#[tokio::test]
async fn test_retry_transient_sts_errors() -> Result<()> {
    let aws = MockAws::default().fail_assume_role_with(vec!["IDPCommunicationError"]);
    let job = Job::new(aws, oidc_env());

    run_action(&job).await?;

    assert_eq!(
        job.aws.sts_actions(),
        vec![
            "AssumeRoleWithWebIdentity",
            "AssumeRoleWithWebIdentity",
            "GetCallerIdentity"
        ]
    );
    assert_eq!(job.sleep.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_disable_retry() {
    let aws = MockAws::default().fail_assume_role_with(vec!["IDPCommunicationError"]);
    let mut envs = oidc_env();
    envs.push(("INPUT_DISABLE-RETRY", "true".to_string()));
    let job = Job::new(aws, envs);

    let err = run_action(&job).await.expect_err("first failure is final");
    assert_eq!(err.kind(), ErrorKind::RoleAssumptionFailed);
    assert!(err.to_string().contains("IDPCommunicationError"));
    assert_eq!(job.aws.sts_actions(), vec!["AssumeRoleWithWebIdentity"]);
    assert!(job.sleep.calls().is_empty());
}

#[tokio::test]
async fn test_allowed_account_ids() {
    let mut envs = static_key_env();
    envs.push(("INPUT_ALLOWED-ACCOUNT-IDS", "222222222222,333333333333".to_string()));
    let job = Job::new(MockAws::default(), envs);

    let err = run_action(&job).await.expect_err("account is not allowed");
    assert_eq!(err.kind(), ErrorKind::AccountMismatch);
}

#[tokio::test]
async fn test_output_config_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("aws/config").to_string_lossy().to_string();
    let credentials = dir.path().join("aws/credentials").to_string_lossy().to_string();

    let mut envs = oidc_env();
    envs.push(("INPUT_OUTPUT-CONFIG-FILES", "true".to_string()));
    envs.push(("INPUT_AWS-PROFILE", "ci".to_string()));
    envs.push(("INPUT_AWS-CONFIG-FILE", config.clone()));
    envs.push(("INPUT_AWS-SHARED-CREDENTIALS-FILE", credentials.clone()));
    let job = Job::new(MockAws::default(), envs);

    run_action(&job).await?;

    let conf = Ini::load_from_file(&config)?;
    assert_eq!(conf.get_from(Some("profile ci"), "region"), Some("us-east-1"));
    let creds = Ini::load_from_file(&credentials)?;
    assert_eq!(
        creds.get_from(Some("ci"), "aws_access_key_id"),
        Some(ROLE_ACCESS_KEY_ID)
    );
    assert_eq!(
        creds.get_from(Some("ci"), "aws_session_token"),
        Some(ROLE_SESSION_TOKEN)
    );

    let states = job.runner.states();
    assert_eq!(states.get("created-config-file"), Some(&config));
    assert_eq!(states.get("created-credentials-file"), Some(&credentials));
    assert_eq!(job.runner.exported_var("AWS_PROFILE").as_deref(), Some("ci"));
    assert_eq!(job.runner.exported_var("AWS_CONFIG_FILE"), Some(config));
    Ok(())
}
