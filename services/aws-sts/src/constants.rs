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

// Headers used by the STS query protocol.
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

pub const STS_API_VERSION: &str = "2011-06-15";
pub const STS_SERVICE: &str = "sts";
pub const USER_AGENT: &str = "configure-aws-credentials-for-github-actions";

// Env values used in aws services.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const AWS_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const AWS_PROFILE: &str = "AWS_PROFILE";
pub const AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

// Env values provided by the GitHub Actions runner.
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const GITHUB_WORKFLOW: &str = "GITHUB_WORKFLOW";
pub const GITHUB_ACTION: &str = "GITHUB_ACTION";
pub const GITHUB_ACTOR: &str = "GITHUB_ACTOR";
pub const GITHUB_SHA: &str = "GITHUB_SHA";
pub const GITHUB_WORKSPACE: &str = "GITHUB_WORKSPACE";
pub const GITHUB_REF: &str = "GITHUB_REF";
pub const GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";
pub const ACTIONS_ID_TOKEN_REQUEST_TOKEN: &str = "ACTIONS_ID_TOKEN_REQUEST_TOKEN";
pub const ACTIONS_ID_TOKEN_REQUEST_URL: &str = "ACTIONS_ID_TOKEN_REQUEST_URL";
pub const SHOW_STACK_TRACE: &str = "SHOW_STACK_TRACE";

// Step outputs.
pub const OUTPUT_ACCOUNT_ID: &str = "aws-account-id";
pub const OUTPUT_AUTHENTICATED_ARN: &str = "authenticated-arn";
pub const OUTPUT_ACCESS_KEY_ID: &str = "aws-access-key-id";
pub const OUTPUT_SECRET_ACCESS_KEY: &str = "aws-secret-access-key";
pub const OUTPUT_SESSION_TOKEN: &str = "aws-session-token";
pub const OUTPUT_EXPIRATION: &str = "aws-expiration";
pub const OUTPUT_REGION: &str = "aws-region";
pub const OUTPUT_DEFAULT_REGION: &str = "aws-default-region";

// State shared with the post step.
pub const STATE_CREATED_CONFIG_FILE: &str = "created-config-file";
pub const STATE_CREATED_CREDENTIALS_FILE: &str = "created-credentials-file";

pub const DEFAULT_ROLE_DURATION_SECONDS: u32 = 3600;
pub const DEFAULT_ROLE_SESSION_NAME: &str = "GitHubActions";
pub const DEFAULT_AUDIENCE: &str = "sts.amazonaws.com";
pub const DEFAULT_PROFILE: &str = "default";
pub const MAX_TAG_VALUE_LENGTH: usize = 256;
