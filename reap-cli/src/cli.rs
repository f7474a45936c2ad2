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

use std::process;

use crate::{EnvVarExp, Result};
use clap::{Parser, Subcommand};
use reap_broker::{TracingFormat, otel};
use reap_sans_io::ErrorCode;
use tracing::{debug, error};
use url::Url;

mod delete;

#[derive(Clone, Debug, Parser)]
#[command(name = "reap", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log format: text or json
    #[arg(long, env = "TRACING_FORMAT", default_value = "text", global = true)]
    tracing_format: TracingFormat,

    /// OTEL Exporter OTLP endpoint
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    otlp_endpoint_url: Option<EnvVarExp<Url>>,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Delete topics from an in-process cluster, reporting the outcome as JSON
    Delete(Box<delete::Arg>),
}

impl Cli {
    pub async fn main() -> Result<ErrorCode> {
        let cli = Cli::parse();

        let _guard = otel::init(
            cli.tracing_format,
            cli.otlp_endpoint_url.map(EnvVarExp::into_inner),
        )?;

        debug!(pid = process::id());

        let outcome = match cli.command {
            Command::Delete(arg) => arg.main().await,
        };

        outcome
            .inspect(|error_code| debug!(%error_code))
            .inspect_err(|err| error!(%err))
    }
}
