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

use crate::mock::*;
use anyhow::Result;
use awsauth_aws_sts::action;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_cleanup_unsets_credentials_and_removes_created_files() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("aws");
    std::fs::create_dir(&dir)?;
    let config = dir.join("config");
    let credentials = dir.join("credentials");
    std::fs::write(&config, "[profile ci]\nregion = us-east-1\n")?;
    std::fs::write(&credentials, "[ci]\naws_access_key_id = ASIAROLEEXAMPLE\n")?;

    let job = Job::new(
        MockAws::default(),
        vec![
            ("AWS_ACCESS_KEY_ID", "ASIAROLEEXAMPLE".to_string()),
            ("STATE_created-config-file", config.to_string_lossy().to_string()),
            (
                "STATE_created-credentials-file",
                credentials.to_string_lossy().to_string(),
            ),
        ],
    );

    action::cleanup(&job.ctx).await;

    let exported = job.runner.exported();
    let mut names: Vec<&str> = exported.iter().map(|(k, _)| k.as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "AWS_ACCESS_KEY_ID",
            "AWS_DEFAULT_REGION",
            "AWS_REGION",
            "AWS_SECRET_ACCESS_KEY",
            "AWS_SESSION_TOKEN"
        ]
    );
    assert!(exported.iter().all(|(_, v)| v.is_empty()));

    assert!(!config.exists());
    assert!(!credentials.exists());
    assert!(!dir.exists());
    assert!(job.aws.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cleanup_without_created_files() {
    let job = Job::new(MockAws::default(), vec![]);

    action::cleanup(&job.ctx).await;

    assert_eq!(job.runner.exported().len(), 5);
}

#[tokio::test]
async fn test_cleanup_tolerates_missing_files() {
    let job = Job::new(
        MockAws::default(),
        vec![(
            "STATE_created-config-file",
            "/non/existent/config".to_string(),
        )],
    );

    // Failing to remove a file only warns.
    action::cleanup(&job.ctx).await;

    assert_eq!(job.runner.exported().len(), 5);
}
