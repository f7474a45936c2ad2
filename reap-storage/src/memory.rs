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

//! A simulated cluster held in memory.
//!
//! Every node removes a topic in its own task, reporting through the
//! [`Completion`] after the configured latency. Nodes configured as
//! failing report a failure instead.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use reap_sans_io::ErrorCode;
use tokio::time::sleep;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{Completion, Error, Result, Storage, TopicDetail, TopicId, TopicState};

pub const DEFAULT_NODES: i32 = 3;

#[derive(Clone, Debug)]
pub struct Engine {
    cluster: String,
    node: i32,
    nodes: BTreeSet<i32>,
    latency: Duration,
    failing: BTreeSet<i32>,

    topics: Arc<Mutex<BTreeMap<String, TopicDetail>>>,
    dispatches: Arc<Mutex<BTreeMap<String, u32>>>,
}

impl Engine {
    pub fn new(cluster: &str, node: i32) -> Self {
        Self {
            cluster: cluster.into(),
            node,
            nodes: (0..DEFAULT_NODES).collect(),
            latency: Duration::ZERO,
            failing: BTreeSet::new(),
            topics: Arc::new(Mutex::new(BTreeMap::new())),
            dispatches: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn nodes(self, nodes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            ..self
        }
    }

    pub fn latency(self, latency: Duration) -> Self {
        Self { latency, ..self }
    }

    pub fn failing(self, failing: impl IntoIterator<Item = i32>) -> Self {
        Self {
            failing: failing.into_iter().collect(),
            ..self
        }
    }

    /// The number of times removal of the topic has been dispatched
    pub fn dispatches(&self, name: &str) -> Result<u32> {
        self.dispatches
            .lock()
            .map(|dispatches| dispatches.get(name).copied().unwrap_or_default())
            .map_err(Into::into)
    }

    fn update<F>(&self, name: &str, f: F) -> Result<Option<TopicDetail>>
    where
        F: FnOnce(TopicDetail) -> Option<TopicDetail>,
    {
        let mut topics = self.topics.lock()?;

        let Some(detail) = topics.remove(name) else {
            return Ok(None);
        };

        Ok(f(detail).inspect(|updated| {
            _ = topics.insert(name.to_owned(), updated.clone());
        }))
    }
}

#[async_trait]
impl Storage for Engine {
    #[instrument(skip(self))]
    async fn create_topic(&self, name: &str, replicas: Option<BTreeSet<i32>>) -> Result<Uuid> {
        let replicas = replicas.unwrap_or_else(|| self.nodes.clone());

        if let Some(unknown) = replicas.difference(&self.nodes).next() {
            return Err(Error::Message(format!("unknown replica node: {unknown}")));
        }

        let mut topics = self.topics.lock()?;

        if topics.contains_key(name) {
            return Err(Error::Api(ErrorCode::TopicAlreadyExists));
        }

        let detail = TopicDetail::new(name, replicas);
        let id = detail.id();
        _ = topics.insert(name.to_owned(), detail);

        debug!(name, %id);
        Ok(id)
    }

    async fn topic_detail(&self, topic: &TopicId) -> Result<Option<TopicDetail>> {
        let topics = self.topics.lock()?;

        Ok(match topic {
            TopicId::Name(name) => topics.get(name).cloned(),
            TopicId::Id(id) => topics.values().find(|detail| detail.id() == *id).cloned(),
        })
    }

    async fn topics(&self) -> Result<Vec<TopicDetail>> {
        self.topics
            .lock()
            .map(|topics| topics.values().cloned().collect())
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn mark_in_progress(&self, name: &str) -> Result<ErrorCode> {
        self.update(name, |detail| {
            Some(detail.with_state(TopicState::DeletionInProgress))
        })
        .map(|updated| {
            updated.map_or(ErrorCode::UnknownTopicOrPartition, |_| ErrorCode::None)
        })
    }

    #[instrument(skip(self))]
    async fn mark_present(&self, name: &str) -> Result<()> {
        self.update(name, |detail| Some(detail.with_state(TopicState::Present)))
            .map(|updated| debug!(?updated))
    }

    #[instrument(skip(self))]
    async fn mark_absent(&self, name: &str) -> Result<()> {
        self.update(name, |_| None).map(|_| ())
    }

    async fn replicas(&self, name: &str) -> Result<BTreeSet<i32>> {
        self.topics
            .lock()?
            .get(name)
            .map(|detail| detail.replicas().clone())
            .ok_or_else(|| Error::UnknownTopic(name.to_owned()))
    }

    #[instrument(skip(self, completion), fields(node = self.node))]
    async fn remove_topic(&self, name: &str, completion: Completion) -> Result<()> {
        let replicas = self.replicas(name).await?;

        *self
            .dispatches
            .lock()?
            .entry(name.to_owned())
            .or_default() += 1;

        for node in replicas {
            let completion = completion.clone();
            let latency = self.latency;
            let failing = self.failing.contains(&node);

            _ = tokio::spawn(async move {
                sleep(latency).await;

                if failing {
                    completion.failed(node, format!("node {node} unable to remove topic"));
                } else {
                    completion.completed(node);
                }
            });
        }

        Ok(())
    }

    async fn cluster_id(&self) -> Result<String> {
        Ok(self.cluster.clone())
    }
}
