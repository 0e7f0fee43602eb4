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

//! The `run` and `cleanup` steps of the action.

use crate::assume_role::{assume_role, AssumeRoleParams};
use crate::client::CredentialsClient;
use crate::config::{ActionInputs, InputReader};
use crate::constants::*;
use crate::export::{export_credentials, export_region, unset_credentials};
use crate::oidc::fetch_id_token;
use crate::profile_files::{cleanup_profile_files, write_profile_files};
use crate::sts::AssumeRoleOutput;
use crate::Credential;
use awsauth_core::{Context, Error, Result, Retry};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static REGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("region regex must be valid"));

static SPECIAL_CHARS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]+"#)
        .expect("special characters regex must be valid")
});

/// Returns true if the keys can be used by tools that choke on special characters.
pub fn keys_are_plain(cred: &Credential) -> bool {
    !SPECIAL_CHARS_REGEX.is_match(&cred.access_key_id)
        && !SPECIAL_CHARS_REGEX.is_match(&cred.secret_access_key)
}

/// Retry policy for this run.
///
/// The special characters workaround relies on retries, so it turns them on
/// with the default budget.
pub fn retry_policy(inputs: &ActionInputs) -> Retry {
    if inputs.special_characters_workaround {
        Retry::new()
    } else if inputs.disable_retry {
        Retry::disabled()
    } else {
        Retry::new().with_max_attempts(inputs.retry_max_attempts)
    }
}

fn use_github_oidc(ctx: &Context, inputs: &ActionInputs) -> bool {
    if inputs.force_skip_oidc {
        return false;
    }
    inputs.role_to_assume.is_some()
        && ctx.env_var_non_empty(ACTIONS_ID_TOKEN_REQUEST_TOKEN).is_some()
        && inputs.aws_access_key_id.is_none()
        && inputs.web_identity_token_file.is_none()
        && !inputs.role_chaining
}

/// Resolve credentials and publish them for the rest of the job.
pub async fn run(ctx: &Context, inputs: &ActionInputs, client: &mut CredentialsClient) -> Result<()> {
    let retry = retry_policy(inputs);

    if inputs.role_chaining && inputs.role_to_assume.is_none() {
        return Err(Error::config_invalid(
            "Role chaining requires role-to-assume to be set",
        ));
    }
    if inputs.unset_current_credentials {
        unset_credentials(ctx)?;
    }

    if !REGION_REGEX.is_match(&inputs.region) {
        return Err(Error::invalid_region(format!(
            "Region is not valid: {}",
            inputs.region
        )));
    }
    export_region(ctx, &inputs.region, inputs.output_env_credentials)?;

    if inputs.use_existing_credentials {
        match client
            .validate_credentials(ctx, None, inputs.role_chaining, &inputs.allowed_account_ids)
            .await
        {
            Ok(_) => {
                info!("Pre-existing credentials are valid. No need to generate new ones.");
                return Ok(());
            }
            Err(err) => {
                info!("No valid credentials exist. Running as normal.");
                debug!("validation of existing credentials failed: {err}");
            }
        }
    }

    let mut web_identity_token = None;
    let mut source_account_id = None;
    if use_github_oidc(ctx, inputs) {
        let audience = inputs.audience.as_str();
        let token = retry
            .run(ctx, move || fetch_id_token(ctx, audience), |_| true)
            .await?;
        web_identity_token = Some(token);
    } else if let Some(access_key_id) = &inputs.aws_access_key_id {
        let Some(secret_access_key) = &inputs.aws_secret_access_key else {
            return Err(Error::config_invalid(
                "'aws-secret-access-key' must be provided if 'aws-access-key-id' is provided",
            ));
        };
        let mut cred = Credential::new(access_key_id, secret_access_key);
        cred.session_token = inputs.aws_session_token.clone();
        export_credentials(
            ctx,
            &cred,
            inputs.output_credentials,
            inputs.output_env_credentials,
        )?;
        if !inputs.output_env_credentials {
            client.pin_credential(cred);
        }
    } else if inputs.web_identity_token_file.is_none() && !inputs.role_chaining {
        // Proceed with the credentials already in the environment.
        client
            .validate_credentials(ctx, None, false, &inputs.allowed_account_ids)
            .await?;
        let identity = client
            .export_account_id(ctx, inputs.mask_aws_account_id, inputs.output_env_credentials)
            .await?;
        source_account_id = Some(identity.account);
    }

    if inputs.aws_access_key_id.is_some() || inputs.role_chaining {
        client
            .validate_credentials(
                ctx,
                inputs.aws_access_key_id.as_deref(),
                inputs.role_chaining,
                &inputs.allowed_account_ids,
            )
            .await?;
        let identity = client
            .export_account_id(ctx, inputs.mask_aws_account_id, inputs.output_env_credentials)
            .await?;
        source_account_id = Some(identity.account);
    }

    let final_credential = match &inputs.role_to_assume {
        Some(role_to_assume) => {
            let params = AssumeRoleParams {
                role_to_assume: role_to_assume.clone(),
                role_duration_seconds: inputs.role_duration_seconds,
                role_session_name: inputs.role_session_name.clone(),
                role_external_id: inputs.role_external_id.clone(),
                role_skip_session_tagging: inputs.role_skip_session_tagging,
                source_account_id,
                web_identity_token,
                web_identity_token_file: inputs.web_identity_token_file.clone(),
                inline_session_policy: inputs.inline_session_policy.clone(),
                managed_session_policies: inputs.managed_session_policies.clone(),
            };
            let output = assume_role_with_plain_keys(ctx, client, inputs, &params, &retry).await?;
            if let Some(user) = &output.assumed_role_user {
                info!("Authenticated as assumedRoleId {}", user.assumed_role_id);
            }

            let mut cred = output.credentials;
            if cred.account_id.is_none() {
                cred.account_id = output
                    .assumed_role_user
                    .as_ref()
                    .and_then(|u| u.account_id())
                    .map(str::to_string);
            }
            export_credentials(
                ctx,
                &cred,
                inputs.output_credentials,
                inputs.output_env_credentials,
            )?;
            if !inputs.output_env_credentials {
                client.pin_credential(cred.clone());
            }

            if ctx.env_var_non_empty(GITHUB_ACTIONS).is_none()
                || inputs.aws_access_key_id.is_some()
                || !inputs.allowed_account_ids.is_empty()
            {
                client
                    .validate_credentials(
                        ctx,
                        Some(&cred.access_key_id),
                        false,
                        &inputs.allowed_account_ids,
                    )
                    .await?;
            }
            if inputs.output_env_credentials {
                client
                    .export_account_id(ctx, inputs.mask_aws_account_id, true)
                    .await?;
            }
            Some(cred)
        }
        None => {
            info!("Proceeding with IAM user credentials");
            None
        }
    };

    if inputs.output_config_files {
        let cred = match final_credential {
            Some(cred) => cred,
            None => client.load_credentials(ctx).await?,
        };
        write_profile_files(
            ctx,
            &inputs.aws_profile,
            inputs.aws_config_file.as_deref(),
            inputs.aws_shared_credentials_file.as_deref(),
            &cred,
            Some(&inputs.region),
        )
        .await?;
    }

    Ok(())
}

/// Assume the role, again and again if the special characters workaround
/// asks for plain keys, within the retry budget.
async fn assume_role_with_plain_keys(
    ctx: &Context,
    client: &CredentialsClient,
    inputs: &ActionInputs,
    params: &AssumeRoleParams,
    retry: &Retry,
) -> Result<AssumeRoleOutput> {
    let mut attempts = 0;
    loop {
        let output = assume_role(ctx, client, params, retry).await?;
        attempts += 1;
        if !inputs.special_characters_workaround || keys_are_plain(&output.credentials) {
            return Ok(output);
        }
        if attempts >= retry.max_attempts() {
            return Err(Error::role_assumption_failed(format!(
                "Could not get credentials without special characters after {attempts} attempts"
            )));
        }
        debug!("assumed role credentials contain special characters, assuming again");
    }
}

/// Undo what `run` published. Nothing here fails the job.
pub async fn cleanup(ctx: &Context) {
    let output_env = InputReader::new(ctx)
        .get_bool("output-env-credentials", true)
        .unwrap_or_else(|err| {
            warn!("{err}, unsetting credentials anyway");
            true
        });

    if output_env {
        if let Err(err) = unset_credentials(ctx) {
            warn!("failed to unset credentials: {err}");
        }
    }
    cleanup_profile_files(ctx).await;
}
