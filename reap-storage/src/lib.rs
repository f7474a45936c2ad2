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
//
//! Reap Storage Abstraction
//!
//! [`Storage`] is the controller's view of the cluster: the metadata
//! recording which topics exist (and which are being deleted) together with
//! the removal service that physically deletes a topic's replicas on each node.
//!
//! [`StorageContainer`] is configured from a URL, using either memory
//! (a simulated multi-node cluster) or null (no topics at all).
//!
//! ## Memory
//!
//! ```
//! # use reap_storage::{Error, Storage, StorageContainer};
//! # use url::Url;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let storage = StorageContainer::builder()
//!     .cluster_id("reap")
//!     .node_id(111)
//!     .storage(Url::parse("memory://reap/")?)
//!     .nodes(Some(3))
//!     .build()
//!     .await?;
//!
//! let id = storage.create_topic("abc", None).await?;
//! assert!(storage.exists("abc").await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Removal
//!
//! Removal is fire and forget: [`Storage::remove_topic`] returns once the
//! work has been handed to every replica, each of which later reports
//! through the supplied [`Completion`].

use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Display, Formatter},
    marker::PhantomData,
    result,
    str::FromStr,
    sync::{LazyLock, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use opentelemetry::{
    InstrumentationScope, KeyValue, global,
    metrics::{Counter, Meter},
};
use opentelemetry_semantic_conventions::SCHEMA_URL;
use reap_sans_io::{
    ErrorCode, NULL_TOPIC_ID, delete_topics_request::DeleteTopicState,
    metadata_request::MetadataRequestTopic,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

pub mod memory;
pub mod null;

/// Storage Errors
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    Api(ErrorCode),
    Message(String),
    Poison,
    SansIo(#[from] reap_sans_io::Error),
    UnknownTopic(String),
    UnsupportedStorageUrl(Url),
    Url(#[from] url::ParseError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_value: PoisonError<T>) -> Self {
        Self::Poison
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

/// Topic Id
///
/// An enumeration of either the name or UUID of a topic.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TopicId {
    Name(String),
    Id(Uuid),
}

/// Text that parses as a UUID is a topic id, anything else is a name.
impl FromStr for TopicId {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        Ok(Uuid::parse_str(s).map_or_else(|_| Self::Name(s.into()), Self::Id))
    }
}

impl Display for TopicId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for TopicId {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for TopicId {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<Uuid> for TopicId {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl From<[u8; 16]> for TopicId {
    fn from(value: [u8; 16]) -> Self {
        Self::Id(Uuid::from_bytes(value))
    }
}

impl From<&TopicId> for [u8; 16] {
    fn from(value: &TopicId) -> Self {
        match value {
            TopicId::Id(id) => id.into_bytes(),
            TopicId::Name(_) => NULL_TOPIC_ID,
        }
    }
}

impl From<DeleteTopicState> for TopicId {
    fn from(value: DeleteTopicState) -> Self {
        if value.is_by_name()
            && let Some(name) = value.name
        {
            name.into()
        } else {
            value.topic_id.into()
        }
    }
}

impl From<&MetadataRequestTopic> for TopicId {
    fn from(value: &MetadataRequestTopic) -> Self {
        if let Some(ref name) = value.name {
            Self::Name(name.into())
        } else {
            value.topic_id.unwrap_or(NULL_TOPIC_ID).into()
        }
    }
}

/// Cluster visible state of a topic, absence is represented by [`None`].
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum TopicState {
    #[default]
    Present,
    DeletionInProgress,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TopicDetail {
    id: Uuid,
    name: String,
    state: TopicState,
    replicas: BTreeSet<i32>,
}

impl TopicDetail {
    pub fn new(name: impl Into<String>, replicas: BTreeSet<i32>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            state: TopicState::Present,
            replicas,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TopicState {
        self.state
    }

    pub fn replicas(&self) -> &BTreeSet<i32> {
        &self.replicas
    }

    pub fn is_deleting(&self) -> bool {
        self.state == TopicState::DeletionInProgress
    }

    pub(crate) fn with_state(self, state: TopicState) -> Self {
        Self { state, ..self }
    }
}

/// The result of removing a topic from one node
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum NodeOutcome {
    Completed(i32),
    Failed { node: i32, reason: String },
}

impl NodeOutcome {
    pub fn node(&self) -> i32 {
        match self {
            Self::Completed(node) | Self::Failed { node, .. } => *node,
        }
    }
}

/// Completion callback handed to [`Storage::remove_topic`].
///
/// Each replica reports exactly once. Reports made after the receiving
/// side has gone are dropped.
#[derive(Clone, Debug)]
pub struct Completion {
    topic: String,
    sender: mpsc::UnboundedSender<NodeOutcome>,
}

impl Completion {
    pub fn channel(topic: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<NodeOutcome>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (
            Self {
                topic: topic.into(),
                sender,
            },
            receiver,
        )
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn completed(&self, node: i32) {
        self.report(NodeOutcome::Completed(node))
    }

    pub fn failed(&self, node: i32, reason: impl Into<String>) {
        self.report(NodeOutcome::Failed {
            node,
            reason: reason.into(),
        })
    }

    fn report(&self, outcome: NodeOutcome) {
        debug!(topic = self.topic, ?outcome);

        _ = self
            .sender
            .send(outcome)
            .inspect_err(|err| debug!(topic = self.topic, ?err));
    }
}

/// Storage is the metadata view and removal service used by the controller
#[async_trait]
pub trait Storage: Clone + Debug + Send + Sync + 'static {
    /// Create a topic, replicated on every node when replicas is none
    async fn create_topic(&self, name: &str, replicas: Option<BTreeSet<i32>>) -> Result<Uuid>;

    /// The detail of a topic that is present or being deleted
    async fn topic_detail(&self, topic: &TopicId) -> Result<Option<TopicDetail>>;

    /// All topics that are present or being deleted
    async fn topics(&self) -> Result<Vec<TopicDetail>>;

    /// True while the topic is visible anywhere in the cluster
    async fn exists(&self, name: &str) -> Result<bool> {
        self.topic_detail(&TopicId::from(name))
            .await
            .map(|detail| detail.is_some())
    }

    /// Mark a topic as being deleted, an absent topic is unknown
    async fn mark_in_progress(&self, name: &str) -> Result<ErrorCode>;

    /// Restore a topic to present after its removal failed
    async fn mark_present(&self, name: &str) -> Result<()>;

    /// Remove a topic from the metadata view
    async fn mark_absent(&self, name: &str) -> Result<()>;

    /// The nodes hosting a replica of the topic
    async fn replicas(&self, name: &str) -> Result<BTreeSet<i32>>;

    /// Dispatch removal of the topic on every replica without waiting for it
    async fn remove_topic(&self, name: &str, completion: Completion) -> Result<()>;

    async fn cluster_id(&self) -> Result<String>;
}

#[derive(Clone)]
pub enum StorageContainer {
    Null(null::Engine),
    Memory(memory::Engine),
}

impl Debug for StorageContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(_) => f.debug_tuple(stringify!(StorageContainer::Null)).finish(),
            Self::Memory(_) => f.debug_tuple(stringify!(StorageContainer::Memory)).finish(),
        }
    }
}

impl StorageContainer {
    pub fn builder() -> PhantomBuilder {
        PhantomBuilder::default()
    }
}

/// A [`StorageContainer`] builder
#[derive(Clone, Debug, Default)]
pub struct Builder<N, C, S> {
    node_id: N,
    cluster_id: C,
    storage: S,
    nodes: Option<i32>,
    removal_latency: Option<Duration>,
    failing_nodes: BTreeSet<i32>,
}

type PhantomBuilder = Builder<PhantomData<i32>, PhantomData<String>, PhantomData<Url>>;

impl<N, C, S> Builder<N, C, S> {
    pub fn node_id(self, node_id: i32) -> Builder<i32, C, S> {
        Builder {
            node_id,
            cluster_id: self.cluster_id,
            storage: self.storage,
            nodes: self.nodes,
            removal_latency: self.removal_latency,
            failing_nodes: self.failing_nodes,
        }
    }

    pub fn cluster_id(self, cluster_id: impl Into<String>) -> Builder<N, String, S> {
        Builder {
            node_id: self.node_id,
            cluster_id: cluster_id.into(),
            storage: self.storage,
            nodes: self.nodes,
            removal_latency: self.removal_latency,
            failing_nodes: self.failing_nodes,
        }
    }

    pub fn storage(self, storage: Url) -> Builder<N, C, Url> {
        debug!(%storage);

        Builder {
            node_id: self.node_id,
            cluster_id: self.cluster_id,
            storage,
            nodes: self.nodes,
            removal_latency: self.removal_latency,
            failing_nodes: self.failing_nodes,
        }
    }

    /// The number of nodes in a memory cluster
    pub fn nodes(self, nodes: Option<i32>) -> Self {
        Self { nodes, ..self }
    }

    /// How long each node of a memory cluster takes to remove a topic
    pub fn removal_latency(self, removal_latency: Option<Duration>) -> Self {
        _ = removal_latency
            .as_ref()
            .inspect(|removal_latency| debug!(?removal_latency));

        Self {
            removal_latency,
            ..self
        }
    }

    /// Nodes of a memory cluster that fail every removal
    pub fn failing_nodes(self, failing_nodes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            failing_nodes: failing_nodes.into_iter().collect(),
            ..self
        }
    }
}

impl Builder<i32, String, Url> {
    pub async fn build(self) -> Result<StorageContainer> {
        match self.storage.scheme() {
            "memory" => Ok(StorageContainer::Memory(
                memory::Engine::new(self.cluster_id.as_str(), self.node_id)
                    .nodes(0..self.nodes.map_or(memory::DEFAULT_NODES, |nodes| nodes.max(1)))
                    .latency(self.removal_latency.unwrap_or_default())
                    .failing(self.failing_nodes),
            )),

            "null" => Ok(StorageContainer::Null(null::Engine::new(
                self.cluster_id.clone(),
                self.node_id,
            ))),

            _unsupported => Err(Error::UnsupportedStorageUrl(self.storage.clone())),
        }
    }
}

pub(crate) static METER: LazyLock<Meter> = LazyLock::new(|| {
    global::meter_with_scope(
        InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
});

static STORAGE_CONTAINER_REQUESTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("reap_storage_container_requests")
        .with_description("reap storage container requests")
        .build()
});

static STORAGE_CONTAINER_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("reap_storage_container_errors")
        .with_description("reap storage container errors")
        .build()
});

#[async_trait]
impl Storage for StorageContainer {
    #[instrument(skip_all)]
    async fn create_topic(&self, name: &str, replicas: Option<BTreeSet<i32>>) -> Result<Uuid> {
        let attributes = [KeyValue::new("method", "create_topic")];

        match self {
            Self::Memory(engine) => engine.create_topic(name, replicas),
            Self::Null(engine) => engine.create_topic(name, replicas),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn topic_detail(&self, topic: &TopicId) -> Result<Option<TopicDetail>> {
        let attributes = [KeyValue::new("method", "topic_detail")];

        match self {
            Self::Memory(engine) => engine.topic_detail(topic),
            Self::Null(engine) => engine.topic_detail(topic),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn topics(&self) -> Result<Vec<TopicDetail>> {
        let attributes = [KeyValue::new("method", "topics")];

        match self {
            Self::Memory(engine) => engine.topics(),
            Self::Null(engine) => engine.topics(),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn exists(&self, name: &str) -> Result<bool> {
        let attributes = [KeyValue::new("method", "exists")];

        match self {
            Self::Memory(engine) => engine.exists(name),
            Self::Null(engine) => engine.exists(name),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn mark_in_progress(&self, name: &str) -> Result<ErrorCode> {
        let attributes = [KeyValue::new("method", "mark_in_progress")];

        match self {
            Self::Memory(engine) => engine.mark_in_progress(name),
            Self::Null(engine) => engine.mark_in_progress(name),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn mark_present(&self, name: &str) -> Result<()> {
        let attributes = [KeyValue::new("method", "mark_present")];

        match self {
            Self::Memory(engine) => engine.mark_present(name),
            Self::Null(engine) => engine.mark_present(name),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn mark_absent(&self, name: &str) -> Result<()> {
        let attributes = [KeyValue::new("method", "mark_absent")];

        match self {
            Self::Memory(engine) => engine.mark_absent(name),
            Self::Null(engine) => engine.mark_absent(name),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn replicas(&self, name: &str) -> Result<BTreeSet<i32>> {
        let attributes = [KeyValue::new("method", "replicas")];

        match self {
            Self::Memory(engine) => engine.replicas(name),
            Self::Null(engine) => engine.replicas(name),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    #[instrument(skip_all)]
    async fn remove_topic(&self, name: &str, completion: Completion) -> Result<()> {
        let attributes = [KeyValue::new("method", "remove_topic")];

        match self {
            Self::Memory(engine) => engine.remove_topic(name, completion),
            Self::Null(engine) => engine.remove_topic(name, completion),
        }
        .await
        .inspect(|_| {
            STORAGE_CONTAINER_REQUESTS.add(1, &attributes);
        })
        .inspect_err(|_| {
            STORAGE_CONTAINER_ERRORS.add(1, &attributes);
        })
    }

    async fn cluster_id(&self) -> Result<String> {
        match self {
            Self::Memory(engine) => engine.cluster_id().await,
            Self::Null(engine) => engine.cluster_id().await,
        }
    }
}
