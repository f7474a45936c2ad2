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

#![allow(dead_code)]

use std::time::Duration;

use rand::{distr::Alphanumeric, prelude::*, rng};
use reap_broker::{Controller, Leadership};
use reap_storage::{Storage as _, StorageContainer};
use tokio::time::{Instant, sleep};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, filter::ParseError};
use url::Url;

pub(crate) const NODE_ID: i32 = 111;

#[derive(Debug)]
pub(crate) enum Error {
    Broker(reap_broker::Error),
    Message(String),
    ParseFilter(ParseError),
    SansIo(reap_sans_io::Error),
    Storage(reap_storage::Error),
    Url(url::ParseError),
}

impl From<reap_broker::Error> for Error {
    fn from(value: reap_broker::Error) -> Self {
        Self::Broker(value)
    }
}

impl From<ParseError> for Error {
    fn from(value: ParseError) -> Self {
        Self::ParseFilter(value)
    }
}

impl From<reap_sans_io::Error> for Error {
    fn from(value: reap_sans_io::Error) -> Self {
        Self::SansIo(value)
    }
}

impl From<reap_storage::Error> for Error {
    fn from(value: reap_storage::Error) -> Self {
        Self::Storage(value)
    }
}

impl From<url::ParseError> for Error {
    fn from(value: url::ParseError) -> Self {
        Self::Url(value)
    }
}

pub(crate) fn init_tracing() -> Result<DefaultGuard, Error> {
    Ok(tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_level(true)
            .with_line_number(true)
            .with_thread_names(false)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(format!("{}=debug", env!("CARGO_CRATE_NAME")).parse()?)
                    .add_directive("reap_broker=debug".parse()?),
            )
            .with_test_writer()
            .finish(),
    ))
}

pub(crate) fn alphanumeric_string(length: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// An in-memory cluster of three nodes, where `failing` nodes never remove
/// their replica.
pub(crate) async fn memory(
    latency: Duration,
    failing: &[i32],
) -> Result<StorageContainer, Error> {
    StorageContainer::builder()
        .cluster_id("reap")
        .node_id(NODE_ID)
        .storage(Url::parse("memory://reap/")?)
        .nodes(Some(3))
        .removal_latency(Some(latency))
        .failing_nodes(failing.iter().copied())
        .build()
        .await
        .map_err(Into::into)
}

pub(crate) fn controller(storage: StorageContainer) -> Controller<StorageContainer> {
    Controller::builder()
        .node_id(NODE_ID)
        .storage(storage)
        .build()
}

pub(crate) fn follower(storage: StorageContainer) -> Controller<StorageContainer> {
    Controller::builder()
        .node_id(NODE_ID)
        .storage(storage)
        .leadership(Leadership::follower(NODE_ID, Some(NODE_ID + 1)))
        .build()
}

/// Topics created with random names.
pub(crate) async fn topics(storage: &StorageContainer, count: usize) -> Result<Vec<String>, Error> {
    let mut names = Vec::with_capacity(count);

    for _ in 0..count {
        let name = alphanumeric_string(15);
        _ = storage.create_topic(&name, None).await?;
        names.push(name);
    }

    Ok(names)
}

/// The number of removals dispatched for a topic.
pub(crate) fn dispatches(storage: &StorageContainer, name: &str) -> Result<u32, Error> {
    match storage {
        StorageContainer::Memory(engine) => engine.dispatches(name).map_err(Into::into),
        otherwise => Err(Error::Message(format!("{otherwise:?} does not dispatch"))),
    }
}

/// Poll the metadata view until the topic has gone.
pub(crate) async fn absent_within(
    controller: &Controller<StorageContainer>,
    name: &str,
    deadline: Duration,
) -> Result<bool, Error> {
    let started = Instant::now();

    while started.elapsed() < deadline {
        if !controller.exists(name).await? {
            return Ok(true);
        }

        sleep(Duration::from_millis(10)).await;
    }

    Ok(false)
}
