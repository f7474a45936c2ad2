// Copyright ⓒ 2024-2025 Peter Morgan <peter.james.morgan@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{collections::HashMap, env::vars, fmt, result, str::FromStr};

mod cli;

pub use cli::Cli;
use regex::{Regex, Replacer};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    Broker(Box<reap_broker::Error>),
    DotEnv(#[from] dotenv::Error),
    Json(#[from] serde_json::Error),
    Regex(#[from] regex::Error),
    SansIo(#[from] reap_sans_io::Error),
    Storage(#[from] reap_storage::Error),
    Url(#[from] url::ParseError),
}

impl From<reap_broker::Error> for Error {
    fn from(value: reap_broker::Error) -> Self {
        Self::Broker(Box::new(value))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

/// Replaces `${VAR}` with the value of the environment variable `VAR`.
#[derive(Clone, Debug)]
pub struct VarRep(HashMap<String, String>);

impl From<HashMap<String, String>> for VarRep {
    fn from(value: HashMap<String, String>) -> Self {
        Self(value)
    }
}

impl VarRep {
    fn replace(&self, haystack: &str) -> Result<String> {
        Regex::new(r"\$\{(?<var>[^\}]+)\}")
            .map(|re| re.replace_all(haystack, self).into_owned())
            .map_err(Into::into)
    }
}

impl Replacer for &VarRep {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        if let Some(variable) = caps.name("var")
            && let Some(value) = self.0.get(variable.as_str())
        {
            dst.push_str(value);
        }
    }
}

/// A command line argument that may refer to environment variables.
#[derive(Clone, Debug)]
pub struct EnvVarExp<T>(T);

impl<T> EnvVarExp<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromStr for EnvVarExp<T>
where
    T: FromStr,
    Error: From<<T as FromStr>::Err>,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VarRep::from(vars().collect::<HashMap<_, _>>())
            .replace(s)
            .and_then(|s| T::from_str(&s).map_err(Into::into))
            .map(|t| Self(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn var_rep() -> VarRep {
        VarRep::from(HashMap::from([
            ("CLUSTER".into(), "reap".into()),
            ("HOST".into(), "localhost".into()),
        ]))
    }

    #[test]
    fn replace_variables() -> Result<()> {
        assert_eq!(
            "memory://reap/localhost",
            var_rep().replace("memory://${CLUSTER}/${HOST}")?
        );

        Ok(())
    }

    #[test]
    fn unknown_variable_is_empty() -> Result<()> {
        assert_eq!("memory:///", var_rep().replace("memory://${UNKNOWN}/")?);
        Ok(())
    }

    #[test]
    fn expanded_url() -> Result<()> {
        assert_eq!(
            Url::parse("memory://reap/")?,
            EnvVarExp::<Url>::from_str("memory://reap/")?.into_inner()
        );

        Ok(())
    }
}
