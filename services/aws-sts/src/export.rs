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

//! Publishing credentials to later steps.

use crate::constants::*;
use crate::Credential;
use awsauth_core::time::format_iso_string;
use awsauth_core::{Context, Result};
use log::debug;

/// Mask `cred` and publish it as env variables and/or step outputs.
///
/// A session token left over from earlier credentials is cleared when `cred`
/// doesn't carry one, otherwise AWS tooling would pair it with the new keys.
pub fn export_credentials(
    ctx: &Context,
    cred: &Credential,
    output_credentials: bool,
    output_env_credentials: bool,
) -> Result<()> {
    ctx.set_secret(&cred.access_key_id);
    ctx.set_secret(&cred.secret_access_key);
    if let Some(token) = &cred.session_token {
        ctx.set_secret(token);
    }

    if output_env_credentials {
        ctx.export_variable(AWS_ACCESS_KEY_ID, &cred.access_key_id)?;
        ctx.export_variable(AWS_SECRET_ACCESS_KEY, &cred.secret_access_key)?;
        match &cred.session_token {
            Some(token) => ctx.export_variable(AWS_SESSION_TOKEN, token)?,
            None if ctx.env_var_non_empty(AWS_SESSION_TOKEN).is_some() => {
                debug!("clearing stale session token");
                ctx.export_variable(AWS_SESSION_TOKEN, "")?
            }
            None => {}
        }
    }

    if output_credentials {
        ctx.set_output(OUTPUT_ACCESS_KEY_ID, &cred.access_key_id)?;
        ctx.set_output(OUTPUT_SECRET_ACCESS_KEY, &cred.secret_access_key)?;
        if let Some(token) = &cred.session_token {
            ctx.set_output(OUTPUT_SESSION_TOKEN, token)?;
        }
        if let Some(expiration) = cred.expiration {
            ctx.set_output(OUTPUT_EXPIRATION, &format_iso_string(expiration))?;
        }
    }
    Ok(())
}

/// Publish the region as env variables and step outputs.
pub fn export_region(ctx: &Context, region: &str, output_env: bool) -> Result<()> {
    if output_env {
        ctx.export_variable(AWS_DEFAULT_REGION, region)?;
        ctx.export_variable(AWS_REGION, region)?;
    }
    ctx.set_output(OUTPUT_REGION, region)?;
    ctx.set_output(OUTPUT_DEFAULT_REGION, region)?;
    Ok(())
}

/// Clear every credential variable this action may have exported.
pub fn unset_credentials(ctx: &Context) -> Result<()> {
    for name in [
        AWS_ACCESS_KEY_ID,
        AWS_SECRET_ACCESS_KEY,
        AWS_SESSION_TOKEN,
        AWS_DEFAULT_REGION,
        AWS_REGION,
    ] {
        ctx.export_variable(name, "")?;
    }
    Ok(())
}
