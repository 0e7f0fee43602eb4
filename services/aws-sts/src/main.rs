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

use awsauth_aws_sts::constants::SHOW_STACK_TRACE;
use awsauth_aws_sts::{
    action, logger, ActionInputs, CredentialsClient, HttpStsClient, ProxyResolver,
};
use awsauth_core::{Context, Error, OsEnv, Result};
use awsauth_file_tokio::{TokioFileRead, TokioFileWrite};
use awsauth_http_send_reqwest::ReqwestHttpSend;
use awsauth_runner_github::GithubRunner;
use awsauth_sleep_tokio::TokioSleep;
use clap::{Parser, Subcommand};
use log::{debug, error};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Configure AWS credentials for the steps of a GitHub Actions job.
#[derive(Debug, Parser)]
#[command(name = "configure-aws-credentials", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Resolve credentials and export them (default).
    Run,
    /// Clear exported credentials and remove created profile files.
    Cleanup,
}

fn http_client(resolver: ProxyResolver) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if resolver.is_empty() {
        builder = builder.no_proxy();
    } else {
        builder = builder.proxy(reqwest::Proxy::custom(move |url| {
            resolver.proxy_for_url(url.as_str())
        }));
    }
    builder
        .build()
        .map_err(|e| Error::unexpected("failed to build http client").with_source(e))
}

async fn run(ctx: Context) -> Result<()> {
    let inputs = ActionInputs::from_env(&ctx)?;
    debug!("action inputs: {inputs:?}");

    let resolver = ProxyResolver::from_env(
        &ctx,
        inputs.http_proxy.as_deref(),
        inputs.no_proxy.as_deref(),
    );
    let ctx = ctx.with_http_send(ReqwestHttpSend::new(http_client(resolver)?));

    let mut client = CredentialsClient::new(Arc::new(HttpStsClient::new(&inputs.region)));
    match inputs.action_timeout_s {
        Some(secs) => {
            tokio::time::timeout(
                Duration::from_secs(secs),
                action::run(&ctx, &inputs, &mut client),
            )
            .await
            .map_err(|_| Error::unexpected(format!("Action timed out after {secs} seconds")))?
        }
        None => action::run(&ctx, &inputs, &mut client).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = logger::init() {
        eprintln!("failed to install workflow logger: {err}");
    }
    let cli = Cli::parse();

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_file_write(TokioFileWrite)
        .with_env(OsEnv)
        .with_sleep(TokioSleep)
        .with_runner(GithubRunner::from_env(&OsEnv));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => match run(ctx.clone()).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                if ctx.env_var(SHOW_STACK_TRACE).as_deref() == Some("true") {
                    eprintln!("{err:?}");
                }
                ExitCode::FAILURE
            }
        },
        Command::Cleanup => {
            action::cleanup(&ctx).await;
            ExitCode::SUCCESS
        }
    }
}
