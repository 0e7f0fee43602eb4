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

//! Make GitHub-sourced strings acceptable as STS session tag values.

use crate::constants::MAX_TAG_VALUE_LENGTH;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_VALUE_INVALID_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{Z}\p{N}_.:/=+\-@]").expect("tag value regex must be valid")
});

/// Replace `[` and `]`, which show up in bot names like `dependabot[bot]`.
pub fn sanitize_actor(name: &str) -> String {
    name.replace(['[', ']'], "_")
}

/// Replace every character STS rejects in a tag value with `_` and truncate
/// the result to 256 characters.
pub fn sanitize_tag_value(value: &str) -> String {
    let sanitized = TAG_VALUE_INVALID_CHARS.replace_all(value, "_");
    sanitized.chars().take(MAX_TAG_VALUE_LENGTH).collect()
}
