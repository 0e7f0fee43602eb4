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
use awsauth_core::retry::DEFAULT_MAX_ATTEMPTS;
use awsauth_core::utils::Redact;
use awsauth_core::{Context, Error, Result};
use std::fmt::{Debug, Formatter};
use std::str::FromStr;

/// InputReader reads action inputs from `INPUT_*` variables.
///
/// Values are trimmed and an empty value counts as not set.
#[derive(Clone, Copy)]
pub struct InputReader<'a> {
    ctx: &'a Context,
}

impl<'a> InputReader<'a> {
    /// Create a reader over `ctx`.
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Environment variable carrying input `name`.
    pub fn env_name(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }

    /// Read a string input.
    pub fn get(&self, name: &str) -> Option<String> {
        self.ctx
            .env_var(&Self::env_name(name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Read a boolean input, which must follow the YAML 1.2 core schema.
    pub fn get_bool(&self, name: &str, default: bool) -> Result<bool> {
        let Some(v) = self.get(name) else {
            return Ok(default);
        };
        match v.as_str() {
            "true" | "True" | "TRUE" => Ok(true),
            "false" | "False" | "FALSE" => Ok(false),
            _ => Err(Error::config_invalid(format!(
                "Input does not meet YAML 1.2 \"Core Schema\" specification: {name}"
            ))
            .with_context("supported values: true | True | TRUE | false | False | FALSE")),
        }
    }

    /// Read a numeric input.
    pub fn get_number<T: FromStr>(&self, name: &str, default: T) -> Result<T> {
        let Some(v) = self.get(name) else {
            return Ok(default);
        };
        v.parse::<T>()
            .map_err(|_| Error::config_invalid(format!("Input {name} must be a number, got {v:?}")))
    }

    /// Read a comma separated list.
    pub fn get_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read a list with one item per line.
    pub fn get_multiline(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|v| {
                v.lines()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Inputs of the action, with defaults applied.
#[derive(Clone, Default)]
pub struct ActionInputs {
    /// Static access key id.
    pub aws_access_key_id: Option<String>,
    /// Static secret access key.
    pub aws_secret_access_key: Option<String>,
    /// Session token going with the static keys.
    pub aws_session_token: Option<String>,
    /// Region, falling back to `AWS_REGION` and `AWS_DEFAULT_REGION`.
    pub region: String,
    /// Role name or ARN to assume.
    pub role_to_assume: Option<String>,
    /// Audience requested for the OIDC token.
    pub audience: String,
    /// Lifetime of the role session.
    pub role_duration_seconds: u32,
    /// Session name.
    pub role_session_name: String,
    /// External id for AssumeRole.
    pub role_external_id: Option<String>,
    /// Don't attach session tags.
    pub role_skip_session_tagging: bool,
    /// Web identity token file, absolute or relative to the workspace.
    pub web_identity_token_file: Option<String>,
    /// Proxy for both http and https.
    pub http_proxy: Option<String>,
    /// Hosts bypassing the proxy.
    pub no_proxy: Option<String>,
    /// Mask the account id in logs.
    pub mask_aws_account_id: bool,
    /// Set credentials as step outputs.
    pub output_credentials: bool,
    /// Export credentials as env variables.
    pub output_env_credentials: bool,
    /// Write shared config and credentials files.
    pub output_config_files: bool,
    /// Attempts for each retried call.
    pub retry_max_attempts: u32,
    /// Try every call only once.
    pub disable_retry: bool,
    /// Accounts the resulting credentials may belong to.
    pub allowed_account_ids: Vec<String>,
    /// Profile written by `output_config_files`.
    pub aws_profile: String,
    /// Custom config file path.
    pub aws_config_file: Option<String>,
    /// Custom credentials file path.
    pub aws_shared_credentials_file: Option<String>,
    /// Assume the role with the credentials already in the environment.
    pub role_chaining: bool,
    /// Inline session policy document.
    pub inline_session_policy: Option<String>,
    /// Managed session policy ARNs.
    pub managed_session_policies: Vec<String>,
    /// Clear credentials exported by earlier steps first.
    pub unset_current_credentials: bool,
    /// Re-assume until the keys contain no special characters.
    pub special_characters_workaround: bool,
    /// Stop if the ambient credentials already validate.
    pub use_existing_credentials: bool,
    /// Never use the runner's OIDC token.
    pub force_skip_oidc: bool,
    /// Global timeout in seconds.
    pub action_timeout_s: Option<u64>,
}

impl Debug for ActionInputs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInputs")
            .field("aws_access_key_id", &Redact::from(&self.aws_access_key_id))
            .field(
                "aws_secret_access_key",
                &Redact::from(&self.aws_secret_access_key),
            )
            .field("aws_session_token", &Redact::from(&self.aws_session_token))
            .field("region", &self.region)
            .field("role_to_assume", &self.role_to_assume)
            .field("audience", &self.audience)
            .field("role_duration_seconds", &self.role_duration_seconds)
            .field("role_session_name", &self.role_session_name)
            .field("role_external_id", &Redact::from(&self.role_external_id))
            .field("role_skip_session_tagging", &self.role_skip_session_tagging)
            .field("web_identity_token_file", &self.web_identity_token_file)
            .field("http_proxy", &self.http_proxy)
            .field("no_proxy", &self.no_proxy)
            .field("output_credentials", &self.output_credentials)
            .field("output_env_credentials", &self.output_env_credentials)
            .field("output_config_files", &self.output_config_files)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("disable_retry", &self.disable_retry)
            .field("allowed_account_ids", &self.allowed_account_ids)
            .field("aws_profile", &self.aws_profile)
            .field("role_chaining", &self.role_chaining)
            .field("force_skip_oidc", &self.force_skip_oidc)
            .field("action_timeout_s", &self.action_timeout_s)
            .finish_non_exhaustive()
    }
}

impl ActionInputs {
    /// Load inputs from `INPUT_*` variables.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let input = InputReader::new(ctx);

        let region = input
            .get("aws-region")
            .or_else(|| ctx.env_var_non_empty(AWS_REGION))
            .or_else(|| ctx.env_var_non_empty(AWS_DEFAULT_REGION))
            .ok_or_else(|| Error::config_invalid("Input required and not supplied: aws-region"))?;

        Ok(Self {
            aws_access_key_id: input.get("aws-access-key-id"),
            aws_secret_access_key: input.get("aws-secret-access-key"),
            aws_session_token: input.get("aws-session-token"),
            region,
            role_to_assume: input.get("role-to-assume"),
            audience: input
                .get("audience")
                .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            role_duration_seconds: input
                .get_number("role-duration-seconds", DEFAULT_ROLE_DURATION_SECONDS)?,
            role_session_name: input
                .get("role-session-name")
                .unwrap_or_else(|| DEFAULT_ROLE_SESSION_NAME.to_string()),
            role_external_id: input.get("role-external-id"),
            role_skip_session_tagging: input.get_bool("role-skip-session-tagging", false)?,
            web_identity_token_file: input.get("web-identity-token-file"),
            http_proxy: input.get("http-proxy"),
            no_proxy: input.get("no-proxy"),
            mask_aws_account_id: input.get_bool("mask-aws-account-id", false)?,
            output_credentials: input.get_bool("output-credentials", false)?,
            output_env_credentials: input.get_bool("output-env-credentials", true)?,
            output_config_files: input.get_bool("output-config-files", false)?,
            retry_max_attempts: input.get_number("retry-max-attempts", DEFAULT_MAX_ATTEMPTS)?,
            disable_retry: input.get_bool("disable-retry", false)?,
            allowed_account_ids: input.get_list("allowed-account-ids"),
            aws_profile: input
                .get("aws-profile")
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            aws_config_file: input.get("aws-config-file"),
            aws_shared_credentials_file: input.get("aws-shared-credentials-file"),
            role_chaining: input.get_bool("role-chaining", false)?,
            inline_session_policy: input.get("inline-session-policy"),
            managed_session_policies: input.get_multiline("managed-session-policies"),
            unset_current_credentials: input.get_bool("unset-current-credentials", false)?,
            special_characters_workaround: input
                .get_bool("special-characters-workaround", false)?,
            use_existing_credentials: input.get_bool("use-existing-credentials", false)?,
            force_skip_oidc: input.get_bool("force-skip-oidc", false)?,
            action_timeout_s: Some(input.get_number("action-timeout-s", 0u64)?)
                .filter(|v| *v > 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::{ErrorKind, StaticEnv};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use test_case::test_case;

    fn context_with(inputs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: inputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[test]
    fn test_env_name() {
        assert_eq!(InputReader::env_name("aws-region"), "INPUT_AWS-REGION");
        assert_eq!(InputReader::env_name("my input"), "INPUT_MY_INPUT");
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let ctx = context_with(&[("INPUT_AWS-REGION", " us-east-1 ")]);
        let inputs = ActionInputs::from_env(&ctx)?;

        assert_eq!(inputs.region, "us-east-1");
        assert_eq!(inputs.audience, "sts.amazonaws.com");
        assert_eq!(inputs.role_duration_seconds, 3600);
        assert_eq!(inputs.role_session_name, "GitHubActions");
        assert_eq!(inputs.retry_max_attempts, 12);
        assert_eq!(inputs.aws_profile, "default");
        assert!(inputs.output_env_credentials);
        assert!(!inputs.output_credentials);
        assert!(!inputs.role_chaining);
        assert_eq!(inputs.action_timeout_s, None);
        assert!(inputs.allowed_account_ids.is_empty());
        Ok(())
    }

    #[test]
    fn test_region_fallback() -> Result<()> {
        let ctx = context_with(&[(AWS_DEFAULT_REGION, "eu-west-1")]);
        assert_eq!(ActionInputs::from_env(&ctx)?.region, "eu-west-1");

        let ctx = context_with(&[(AWS_DEFAULT_REGION, "eu-west-1"), (AWS_REGION, "eu-west-2")]);
        assert_eq!(ActionInputs::from_env(&ctx)?.region, "eu-west-2");

        let err = ActionInputs::from_env(&context_with(&[])).expect_err("region is required");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        Ok(())
    }

    #[test]
    fn test_lists() -> Result<()> {
        let ctx = context_with(&[
            ("INPUT_AWS-REGION", "us-east-1"),
            ("INPUT_ALLOWED-ACCOUNT-IDS", "111111111111, 222222222222,"),
            (
                "INPUT_MANAGED-SESSION-POLICIES",
                "arn:aws:iam::aws:policy/ReadOnlyAccess\n\n  arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess\n",
            ),
            ("INPUT_ACTION-TIMEOUT-S", "30"),
        ]);
        let inputs = ActionInputs::from_env(&ctx)?;

        assert_eq!(inputs.allowed_account_ids, vec!["111111111111", "222222222222"]);
        assert_eq!(
            inputs.managed_session_policies,
            vec![
                "arn:aws:iam::aws:policy/ReadOnlyAccess",
                "arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess"
            ]
        );
        assert_eq!(inputs.action_timeout_s, Some(30));
        Ok(())
    }

    #[test_case("true", Some(true))]
    #[test_case("True", Some(true))]
    #[test_case("TRUE", Some(true))]
    #[test_case("false", Some(false))]
    #[test_case("FALSE", Some(false))]
    #[test_case("yes", None)]
    #[test_case("1", None)]
    fn test_get_bool(value: &str, expected: Option<bool>) {
        let ctx = context_with(&[("INPUT_DISABLE-RETRY", value)]);
        let got = InputReader::new(&ctx).get_bool("disable-retry", false).ok();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_invalid_number() {
        let ctx = context_with(&[
            ("INPUT_AWS-REGION", "us-east-1"),
            ("INPUT_ROLE-DURATION-SECONDS", "one hour"),
        ]);
        let err = ActionInputs::from_env(&ctx).expect_err("duration must be numeric");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_debug_redacts_keys() -> Result<()> {
        let ctx = context_with(&[
            ("INPUT_AWS-REGION", "us-east-1"),
            ("INPUT_AWS-SECRET-ACCESS-KEY", "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY"),
        ]);
        let out = format!("{:?}", ActionInputs::from_env(&ctx)?);
        assert!(!out.contains("bPxRfiCYEXAMPLEKEY"));
        Ok(())
    }
}
