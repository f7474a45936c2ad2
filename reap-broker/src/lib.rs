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

//! Topic deletion running on the cluster controller.
//!
//! A [`Controller`] accepts a batch of topics to delete, hands each one to
//! [`Storage`](reap_storage::Storage) in the background and waits at most
//! the caller's timeout for every deletion to finish. Work that is still in
//! flight when the timeout elapses carries on, eventually removing the
//! topic from the metadata view.

use std::{
    fmt, result,
    str::FromStr,
    sync::{LazyLock, PoisonError},
};

use opentelemetry::{InstrumentationScope, global, metrics::Meter};
use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_semantic_conventions::SCHEMA_URL;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;

mod controller;
pub mod leadership;
pub mod otel;
mod registry;
pub mod service;
pub mod tracker;
mod waiter;

pub use controller::{Builder, Controller, Deleted, PhantomBuilder};
pub use leadership::{Admitted, Leadership, NotController};
pub use registry::{Entry, Registry};
pub use service::{DeleteTopicsService, MetadataService};
pub use tracker::{Phase, Tracker};
pub use waiter::{Outcome, wait};

pub const NODE_ID: i32 = 111;

pub(crate) static METER: LazyLock<Meter> = LazyLock::new(|| {
    global::meter_with_scope(
        InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
});

#[derive(Error, Debug)]
pub enum Error {
    ExporterBuild(#[from] ExporterBuildError),
    IllegalTransition { topic: String, from: Phase, to: Phase },
    Message(String),
    ParseFilter(#[from] ParseError),
    Poison,
    SansIo(#[from] reap_sans_io::Error),
    Storage(#[from] reap_storage::Error),
    UnsupportedTracingFormat(String),
    Url(#[from] url::ParseError),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_value: PoisonError<T>) -> Self {
        Self::Poison
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => write!(f, "{msg}"),
            error => write!(f, "{error:?}"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

#[derive(Copy, Clone, Debug, Default)]
pub enum TracingFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for TracingFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            otherwise => Err(Error::UnsupportedTracingFormat(otherwise.to_owned())),
        }
    }
}
