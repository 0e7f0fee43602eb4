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
use crate::provide_credential::DefaultCredentialProvider;
use crate::sts::StsClient;
use crate::{CallerIdentity, Credential};
use awsauth_core::{Context, Error, ProvideCredential, Result};
use log::debug;
use std::sync::Arc;

/// CredentialsClient checks which identity the job currently runs as.
///
/// Credentials come from the default provider chain, so validation sees what
/// later steps will see. When the action keeps credentials out of the
/// environment, pin them with [`CredentialsClient::pin_credential`] instead.
#[derive(Debug)]
pub struct CredentialsClient {
    sts: Arc<dyn StsClient>,
    provider: Arc<dyn ProvideCredential<Credential = Credential>>,
    pinned: Option<Credential>,
}

impl CredentialsClient {
    /// Create a client over `sts` using the default provider chain.
    pub fn new(sts: Arc<dyn StsClient>) -> Self {
        Self {
            sts,
            provider: Arc::new(DefaultCredentialProvider::new()),
            pinned: None,
        }
    }

    /// Replace the provider used to load ambient credentials.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// The STS client.
    pub fn sts(&self) -> &dyn StsClient {
        self.sts.as_ref()
    }

    /// Use `cred` for every later call instead of the provider chain.
    ///
    /// Only for credentials that were not exported to the environment.
    pub fn pin_credential(&mut self, cred: Credential) {
        self.pinned = Some(cred);
    }

    /// Load the credentials the job currently runs with.
    pub async fn load_credentials(&self, ctx: &Context) -> Result<Credential> {
        if let Some(cred) = &self.pinned {
            return Ok(cred.clone());
        }

        let cred = self.provider.provide_credential(ctx).await.map_err(|e| {
            Error::credentials_unavailable(
                "Credentials could not be loaded, please check your action inputs",
            )
            .with_source(e)
        })?;
        match cred {
            Some(cred) if !cred.access_key_id.is_empty() => Ok(cred),
            _ => Err(Error::credentials_unavailable(
                "Credentials could not be loaded, please check your action inputs",
            )),
        }
    }

    /// Check that the ambient credentials are the ones we expect.
    ///
    /// Account ids are only checked when `expected_account_ids` is not empty.
    /// The access key check is skipped when chaining roles, since the loaded
    /// key then belongs to the previous role session.
    pub async fn validate_credentials(
        &self,
        ctx: &Context,
        expected_access_key_id: Option<&str>,
        role_chaining: bool,
        expected_account_ids: &[String],
    ) -> Result<Credential> {
        let cred = self.load_credentials(ctx).await?;

        if !expected_account_ids.is_empty() {
            let identity = self.sts.get_caller_identity(ctx, &cred).await?;
            if !expected_account_ids.iter().any(|id| id == &identity.account) {
                return Err(Error::account_mismatch(format!(
                    "The account ID of the provided credentials ({}) does not match any of the expected account IDs: {}",
                    identity.account,
                    expected_account_ids.join(", ")
                )));
            }
        }

        if !role_chaining {
            if let Some(expected) = expected_access_key_id {
                if expected != cred.access_key_id {
                    return Err(Error::access_key_mismatch(
                        "Credentials loaded by the SDK do not match the expected access key ID configured by the action",
                    ));
                }
            }
        }

        debug!("credentials validated");
        Ok(cred)
    }

    /// Look up the caller and publish its account id and ARN.
    pub async fn export_account_id(
        &self,
        ctx: &Context,
        mask_account_id: bool,
        output_env: bool,
    ) -> Result<CallerIdentity> {
        let cred = self.load_credentials(ctx).await?;
        let identity = self.sts.get_caller_identity(ctx, &cred).await?;
        if identity.account.is_empty() || identity.arn.is_empty() {
            return Err(Error::credentials_unavailable(
                "Could not get Account ID or ARN from STS. Did you set credentials?",
            ));
        }

        if mask_account_id {
            ctx.set_secret(&identity.account);
        }
        ctx.set_output(OUTPUT_ACCOUNT_ID, &identity.account)?;
        ctx.set_output(OUTPUT_AUTHENTICATED_ARN, &identity.arn)?;
        if output_env {
            ctx.export_variable(AWS_ACCOUNT_ID, &identity.account)?;
        }
        Ok(identity)
    }
}
