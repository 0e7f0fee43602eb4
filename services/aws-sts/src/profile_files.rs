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

//! Writing credentials into AWS shared config and credentials files.

use crate::constants::*;
use crate::Credential;
use awsauth_core::{Context, Error, Result};
use ini::Ini;
use log::{debug, info, warn};
use std::path::Path;

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// Check that `profile` can be used as an INI section name.
pub fn validate_profile_name(profile: &str) -> Result<()> {
    if profile.is_empty() {
        return Err(Error::profile_write_failed("Profile name must not be empty"));
    }
    if profile
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '/' | '\\'))
    {
        return Err(Error::profile_write_failed(format!(
            "Invalid profile name {profile:?}: must not contain whitespace, brackets or slashes"
        )));
    }
    Ok(())
}

/// Section holding `profile` in the config file.
pub fn config_section(profile: &str) -> String {
    if profile == DEFAULT_PROFILE {
        DEFAULT_PROFILE.to_string()
    } else {
        format!("profile {profile}")
    }
}

/// Resolve `custom` or `default`, expanding `~`.
fn resolve_path(ctx: &Context, custom: Option<&str>, default: &str) -> Result<String> {
    let path = custom.filter(|v| !v.is_empty()).unwrap_or(default);
    ctx.expand_home_dir(path).ok_or_else(|| {
        Error::profile_write_failed("Could not resolve home directory")
            .with_context(format!("path: {path}"))
    })
}

/// A shared profile file, edited as text.
///
/// Only the lines of the section being written change; everything else keeps
/// its exact bytes, comments and spacing included.
#[derive(Debug, Default)]
struct ProfileFile {
    content: String,
    parsed: Ini,
    existed: bool,
}

fn section_header(line: &str) -> Option<&str> {
    let line = line.trim();
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

fn entry_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') || line.starts_with(';') {
        return None;
    }
    line.split_once('=').map(|(key, _)| key.trim())
}

impl ProfileFile {
    async fn load(ctx: &Context, path: &str) -> Result<Self> {
        if !ctx.file_exists(path).await.unwrap_or(false) {
            return Ok(Self::default());
        }

        let content = ctx.file_read_as_string(path).await.map_err(|e| {
            Error::profile_write_failed("Could not read existing profile file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })?;
        let parsed = Ini::load_from_str(&content).map_err(|e| {
            Error::profile_write_failed("Could not parse existing profile file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })?;
        Ok(Self {
            content,
            parsed,
            existed: true,
        })
    }

    /// Set or remove keys of `section`, creating it at the end if missing.
    ///
    /// A `None` value removes the key.
    fn upsert_section(&mut self, section: &str, entries: &[(&str, Option<&str>)]) {
        let lines: Vec<&str> = self.content.split_inclusive('\n').collect();
        let start = self
            .parsed
            .section(Some(section))
            .and_then(|_| lines.iter().position(|l| section_header(l) == Some(section)));
        let Some(start) = start else {
            self.append_section(section, entries);
            return;
        };
        let end = lines[start + 1..]
            .iter()
            .position(|l| section_header(l).is_some())
            .map_or(lines.len(), |i| start + 1 + i);

        let mut pending: Vec<(&str, &str)> = entries
            .iter()
            .filter_map(|(key, value)| value.map(|v| (*key, v)))
            .collect();
        let mut body: Vec<String> = Vec::with_capacity(end - start);
        for line in &lines[start + 1..end] {
            match entry_key(line).and_then(|key| entries.iter().find(|(k, _)| *k == key)) {
                Some((key, Some(value))) => {
                    // Later duplicates of a key are dropped.
                    if pending.iter().any(|(k, _)| k == key) {
                        body.push(format!("{key} = {value}\n"));
                        pending.retain(|(k, _)| k != key);
                    }
                }
                Some((_, None)) => {}
                None => body.push(line.to_string()),
            }
        }

        let insert_at = body
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);
        if let Some(last) = insert_at.checked_sub(1).map(|i| &mut body[i]) {
            if !last.ends_with('\n') && !pending.is_empty() {
                last.push('\n');
            }
        }
        for (key, value) in pending.into_iter().rev() {
            body.insert(insert_at, format!("{key} = {value}\n"));
        }

        let mut content = lines[..start].concat();
        content.push_str(lines[start]);
        if !content.ends_with('\n') && !body.is_empty() {
            content.push('\n');
        }
        content.push_str(&body.concat());
        content.push_str(&lines[end..].concat());
        self.content = content;
    }

    fn append_section(&mut self, section: &str, entries: &[(&str, Option<&str>)]) {
        if !self.content.is_empty() {
            if !self.content.ends_with('\n') {
                self.content.push('\n');
            }
            self.content.push('\n');
        }
        self.content.push_str(&format!("[{section}]\n"));
        for (key, value) in entries {
            if let Some(value) = value {
                self.content.push_str(&format!("{key} = {value}\n"));
            }
        }
    }

    async fn save(&self, ctx: &Context, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            ctx.create_dir_all(&parent.to_string_lossy(), DIR_MODE)
                .await
                .map_err(|e| {
                    Error::profile_write_failed("Could not create profile directory")
                        .with_source(e)
                })?;
        }

        ctx.file_write(path, self.content.as_bytes(), FILE_MODE)
            .await
            .map_err(|e| {
                Error::profile_write_failed("Could not write profile file")
                    .with_source(e)
                    .with_context(format!("path: {path}"))
            })
    }
}

/// Merge `cred` and `region` into the shared files under `profile`.
///
/// Other profiles already present are kept. Files created at custom paths are
/// recorded in the action state so the post step can delete them, and are
/// exported through `AWS_CONFIG_FILE` / `AWS_SHARED_CREDENTIALS_FILE`.
pub async fn write_profile_files(
    ctx: &Context,
    profile: &str,
    config_file: Option<&str>,
    credentials_file: Option<&str>,
    cred: &Credential,
    region: Option<&str>,
) -> Result<()> {
    validate_profile_name(profile)?;

    let config_custom = config_file.is_some_and(|v| !v.is_empty());
    let config_path = resolve_path(ctx, config_file, "~/.aws/config")?;
    let mut config = ProfileFile::load(ctx, &config_path).await?;
    if let Some(region) = region.filter(|v| !v.is_empty()) {
        config.upsert_section(&config_section(profile), &[("region", Some(region))]);
    }
    config.save(ctx, &config_path).await?;
    debug!("wrote profile {profile} to {config_path}");

    let credentials_custom = credentials_file.is_some_and(|v| !v.is_empty());
    let credentials_path = resolve_path(ctx, credentials_file, "~/.aws/credentials")?;
    let mut credentials = ProfileFile::load(ctx, &credentials_path).await?;
    credentials.upsert_section(
        profile,
        &[
            ("aws_access_key_id", Some(cred.access_key_id.as_str())),
            ("aws_secret_access_key", Some(cred.secret_access_key.as_str())),
            ("aws_session_token", cred.session_token.as_deref()),
        ],
    );
    credentials.save(ctx, &credentials_path).await?;
    debug!("wrote profile {profile} to {credentials_path}");

    if config_custom {
        if !config.existed {
            ctx.save_state(STATE_CREATED_CONFIG_FILE, &config_path)?;
        }
        ctx.export_variable(AWS_CONFIG_FILE, &config_path)?;
    }
    if credentials_custom {
        if !credentials.existed {
            ctx.save_state(STATE_CREATED_CREDENTIALS_FILE, &credentials_path)?;
        }
        ctx.export_variable(AWS_SHARED_CREDENTIALS_FILE, &credentials_path)?;
    }
    if profile != DEFAULT_PROFILE {
        ctx.export_variable(AWS_PROFILE, profile)?;
    }

    info!("AWS credentials written to profile {profile}");
    Ok(())
}

/// Delete the profile files the main step created.
///
/// Failures are logged and never returned.
pub async fn cleanup_profile_files(ctx: &Context) {
    for name in [STATE_CREATED_CONFIG_FILE, STATE_CREATED_CREDENTIALS_FILE] {
        let Some(path) = ctx.state(name) else {
            continue;
        };

        match ctx.remove_file(&path).await {
            Ok(()) => info!("removed {path}"),
            Err(err) => {
                warn!("failed to remove {path}: {err}");
                continue;
            }
        }

        if let Some(parent) = Path::new(&path).parent().filter(|p| !p.as_os_str().is_empty()) {
            // Only succeeds when nothing else lives there.
            if let Err(err) = ctx.remove_dir(&parent.to_string_lossy()).await {
                debug!("kept {}: {err}", parent.display());
            }
        }
    }
}
