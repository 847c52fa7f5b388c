// Copyright (c) The goldcheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::test_case::TestCaseBuilder;
use serde::{Deserialize, de::Error};
use std::fmt;

/// The external programs a run invokes, as read from the `[tools]` section.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ToolsConfig {
    #[serde(deserialize_with = "deserialize_command")]
    launcher: (String, Vec<String>),
    #[serde(deserialize_with = "deserialize_program")]
    solver: String,
    #[serde(deserialize_with = "deserialize_program")]
    merge: String,
    #[serde(deserialize_with = "deserialize_program")]
    diff: String,
}

impl ToolsConfig {
    /// Returns the launcher program and the arguments that precede the partition count.
    pub fn launcher(&self) -> (&str, &[String]) {
        (&self.launcher.0, &self.launcher.1)
    }

    /// Returns the solver program.
    pub fn solver(&self) -> &str {
        &self.solver
    }

    /// Returns the output-merge program.
    pub fn merge(&self) -> &str {
        &self.merge
    }

    /// Returns the numeric-diff program.
    pub fn diff(&self) -> &str {
        &self.diff
    }

    pub(super) fn apply_to(&self, builder: &mut TestCaseBuilder) {
        let (launcher, launcher_args) = &self.launcher;
        builder
            .launcher(launcher, launcher_args)
            .solver(&self.solver)
            .merge(&self.merge)
            .diff(&self.diff);
    }
}

fn deserialize_command<'de, D>(deserializer: D) -> Result<(String, Vec<String>), D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct CommandVisitor;

    impl<'de> serde::de::Visitor<'de> for CommandVisitor {
        type Value = (String, Vec<String>);

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a Unix shell command or a list of arguments")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let mut args = shell_words::split(value).map_err(E::custom)?;
            if args.is_empty() {
                return Err(E::invalid_value(serde::de::Unexpected::Str(value), &self));
            }
            let program = args.remove(0);
            Ok((program, args))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let Some(program) = seq.next_element::<String>()? else {
                return Err(A::Error::invalid_length(0, &self));
            };
            let mut args = Vec::new();
            while let Some(value) = seq.next_element::<String>()? {
                args.push(value);
            }
            Ok((program, args))
        }
    }

    deserializer.deserialize_any(CommandVisitor)
}

fn deserialize_program<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let program = String::deserialize(deserializer)?;
    if program.is_empty() {
        return Err(D::Error::invalid_value(
            serde::de::Unexpected::Str(&program),
            &"a non-empty program name or path",
        ));
    }
    Ok(program)
}
