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

//! A [`log::Log`] rendering records as workflow commands.

use awsauth_runner_github::format_command;
use log::{Level, LevelFilter, Log, Metadata, Record};

const TARGETS: &[&str] = &["awsauth", "configure_aws_credentials"];

/// Logger printing records from this workspace to stdout.
///
/// The runner folds `::debug::` lines away unless step debug logging is on.
#[derive(Debug, Default)]
pub struct WorkflowLogger;

/// Install [`WorkflowLogger`] as the global logger.
pub fn init() -> Result<(), log::SetLoggerError> {
    static LOGGER: WorkflowLogger = WorkflowLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}

/// Render one message at `level`.
pub fn render(level: Level, message: &str) -> String {
    match level {
        Level::Error => format_command("error", &[], message),
        Level::Warn => format_command("warning", &[], message),
        Level::Info => message.to_string(),
        Level::Debug | Level::Trace => format_command("debug", &[], message),
    }
}

impl Log for WorkflowLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
            && TARGETS.iter().any(|t| metadata.target().starts_with(t))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        println!("{}", render(record.level(), &record.args().to_string()));
    }

    fn flush(&self) {}
}
