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

use std::{
    collections::{BTreeMap, BTreeSet},
    marker::PhantomData,
    sync::LazyLock,
    time::Duration,
};

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram},
};
use reap_sans_io::ErrorCode;
use reap_storage::{Completion, NodeOutcome, Storage, TopicDetail, TopicId};
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    Error, METER, Result,
    leadership::{Leadership, NotController},
    registry::Registry,
    tracker::{Phase, Tracker},
    waiter::{self, Outcome},
};

const MAX_TOPIC_NAME_LENGTH: usize = 249;

static DELETE_TOPICS_REQUESTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("reap_delete_topics_requests")
        .with_description("The number of delete topics requests")
        .build()
});

static DELETE_TOPIC_OUTCOMES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("reap_delete_topic_outcomes")
        .with_description("The per topic outcome of delete topics requests")
        .build()
});

static TOPIC_DELETION_DURATION: LazyLock<Histogram<u64>> = LazyLock::new(|| {
    METER
        .u64_histogram("reap_topic_deletion_duration")
        .with_unit("ms")
        .with_description("The time from dispatch to a terminal phase in milliseconds")
        .build()
});

/// The outcome of deleting one topic.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Deleted {
    pub error_code: ErrorCode,
    pub error_message: Option<String>,
    pub topic_id: Option<Uuid>,
}

impl From<ErrorCode> for Deleted {
    fn from(error_code: ErrorCode) -> Self {
        Self {
            error_code,
            ..Default::default()
        }
    }
}

impl Deleted {
    pub fn error_message(self, error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..self
        }
    }

    pub fn topic_id(self, topic_id: Option<Uuid>) -> Self {
        Self { topic_id, ..self }
    }
}

enum Target {
    Resolved(Deleted),
    Tracking { tracker: Tracker, id: Uuid },
}

/// Deletes topics on behalf of the cluster controller.
///
/// Every deletion runs as a background task owned by the controller.
/// Callers only wait for those tasks up to their own timeout.
#[derive(Clone, Debug)]
pub struct Controller<S> {
    node_id: i32,
    storage: S,
    leadership: Leadership,
    registry: Registry,
    background: TaskTracker,
    deletion_enabled: bool,
}

impl<S> Controller<S>
where
    S: Storage,
{
    pub fn builder() -> PhantomBuilder<S> {
        Builder::default()
    }

    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn leadership(&self) -> &Leadership {
        &self.leadership
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Delete a batch of topics, waiting at most `timeout` for them to be
    /// removed.
    ///
    /// The result has exactly one entry for every distinct topic requested.
    #[instrument(skip(self, topics), fields(node_id = self.node_id))]
    pub async fn delete_topics(
        &self,
        topics: impl IntoIterator<Item = TopicId>,
        timeout: Duration,
    ) -> Result<BTreeMap<TopicId, Deleted>> {
        let topics = topics.into_iter().collect::<BTreeSet<_>>();
        debug!(?topics, ?timeout);

        DELETE_TOPICS_REQUESTS.add(1, &[KeyValue::new("node_id", i64::from(self.node_id))]);

        if let Err(NotController { controller }) = self.leadership.admit() {
            debug!(?controller, "not the controller");

            let results = topics
                .into_iter()
                .map(|topic| (topic, Deleted::from(ErrorCode::NotController)))
                .collect::<BTreeMap<_, _>>();

            record_outcomes(&results);
            return Ok(results);
        }

        let mut results = BTreeMap::new();
        let mut waiting = Vec::new();

        for topic in topics {
            match self.target(&topic).await {
                Ok(Target::Resolved(deleted)) => {
                    _ = results.insert(topic, deleted);
                }

                Ok(Target::Tracking { tracker, id }) => waiting.push((topic, tracker, id)),

                Err(err) => {
                    warn!(%topic, ?err);

                    _ = results.insert(
                        topic,
                        Deleted::from(ErrorCode::UnknownServerError)
                            .error_message(Some(err.to_string())),
                    );
                }
            }
        }

        let trackers = waiting
            .iter()
            .map(|(_, tracker, _)| tracker.clone())
            .collect::<Vec<_>>();

        let outcome = waiter::wait(&trackers, timeout).await;
        debug!(?outcome, in_flight = trackers.len());

        for (topic, tracker, id) in waiting {
            let deleted = match tracker.phase() {
                Phase::Converged => Deleted::default(),

                Phase::Failed => {
                    Deleted::from(ErrorCode::RequestTimedOut).error_message(tracker.error()?)
                }

                Phase::Pending | Phase::InProgress => {
                    debug_assert_eq!(Outcome::Elapsed, outcome);
                    Deleted::from(ErrorCode::RequestTimedOut)
                }
            };

            _ = results.insert(topic, deleted.topic_id(Some(id)));
        }

        record_outcomes(&results);
        Ok(results)
    }

    async fn target(&self, topic: &TopicId) -> Result<Target> {
        if !self.deletion_enabled {
            return Ok(Target::Resolved(ErrorCode::TopicDeletionDisabled.into()));
        }

        if let TopicId::Name(name) = topic
            && !is_valid_topic_name(name)
        {
            debug!(%name, "invalid topic name");
            return Ok(Target::Resolved(ErrorCode::UnknownTopicOrPartition.into()));
        }

        let name = match topic {
            TopicId::Name(name) => name.to_owned(),

            TopicId::Id(_) => match self.storage.topic_detail(topic).await? {
                Some(detail) => detail.name().to_owned(),
                None => return Ok(Target::Resolved(ErrorCode::UnknownTopicId.into())),
            },
        };

        let mut entry = self.registry.entry(&name).await?;

        let detail = self
            .storage
            .topic_detail(&TopicId::Name(name.clone()))
            .await?
            .filter(|detail| match topic {
                TopicId::Id(id) => detail.id() == *id,
                TopicId::Name(_) => true,
            });

        let Some(id) = detail.map(|detail| detail.id()) else {
            return Ok(Target::Resolved(
                match topic {
                    TopicId::Name(_) => ErrorCode::UnknownTopicOrPartition,
                    TopicId::Id(_) => ErrorCode::UnknownTopicId,
                }
                .into(),
            ));
        };

        if let Some(tracker) = entry.in_flight() {
            return Ok(Target::Tracking { tracker, id });
        }

        match self.storage.mark_in_progress(&name).await? {
            ErrorCode::None => {
                let tracker = entry.create();

                let controller = self.clone();
                let dispatching = tracker.clone();

                _ = self
                    .background
                    .spawn(async move { controller.deletion(dispatching).await });

                Ok(Target::Tracking { tracker, id })
            }

            error_code => {
                debug!(%name, ?error_code);
                Ok(Target::Resolved(Deleted::from(error_code).topic_id(Some(id))))
            }
        }
    }

    #[instrument(skip(self, tracker), fields(topic = tracker.topic(), id = %tracker.id()))]
    async fn deletion(self, tracker: Tracker) {
        debug!(requested_at = ?tracker.requested_at());

        let removal = self.remove(&tracker).await;

        if let Err(err) = self.settle(&tracker, removal).await {
            warn!(?err);

            if !tracker.phase().is_terminal() {
                _ = tracker
                    .failed(err.to_string())
                    .inspect_err(|err| warn!(?err));
            }
        }

        let phase = tracker.phase();
        let elapsed = u64::try_from(tracker.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(?phase, elapsed);

        TOPIC_DELETION_DURATION.record(elapsed, &[KeyValue::new("phase", format!("{phase:?}"))]);
    }

    /// Wait for every replica to finish removing the topic.
    async fn remove(&self, tracker: &Tracker) -> Result<()> {
        let topic = tracker.topic();
        let replicas = self.storage.replicas(topic).await?;

        let (completion, mut outcomes) = Completion::channel(topic);
        self.storage.remove_topic(topic, completion).await?;

        if tracker.dispatched(replicas)? {
            return Ok(());
        }

        loop {
            match outcomes.recv().await {
                Some(NodeOutcome::Completed(node)) => {
                    if tracker.node_completed(node)? {
                        return Ok(());
                    }
                }

                Some(NodeOutcome::Failed { node, reason }) => {
                    debug!(node, %reason);
                    return Err(Error::Message(reason));
                }

                None => {
                    return Err(Error::Message(format!(
                        "{topic}: removal abandoned with outstanding nodes: {:?}",
                        tracker.nodes()?
                    )));
                }
            }
        }
    }

    /// Apply the removal to the metadata view and move the tracker to a
    /// terminal phase, holding the topic entry so that no request observes
    /// one without the other.
    async fn settle(&self, tracker: &Tracker, removal: Result<()>) -> Result<()> {
        let topic = tracker.topic();
        let mut entry = self.registry.entry(topic).await?;

        let settled = match removal {
            Ok(()) => self
                .storage
                .mark_absent(topic)
                .await
                .map_err(Error::from)
                .and_then(|()| tracker.converged()),

            Err(err) => {
                debug!(?err);

                self.storage
                    .mark_present(topic)
                    .await
                    .map_err(Error::from)
                    .and_then(|()| tracker.failed(err.to_string()))
            }
        };

        if let Err(ref err) = settled
            && !tracker.phase().is_terminal()
        {
            _ = tracker
                .failed(err.to_string())
                .inspect_err(|err| warn!(?err));
        }

        _ = entry.release(tracker);
        settled
    }

    /// Whether the topic is visible in the metadata view, including topics
    /// that are being deleted. Any node may answer.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.storage.exists(name).await.map_err(Into::into)
    }

    /// The metadata view of the requested topics, or of every topic when
    /// none are requested. Absent topics map to `None`.
    pub async fn metadata(
        &self,
        topics: Option<Vec<TopicId>>,
    ) -> Result<BTreeMap<TopicId, Option<TopicDetail>>> {
        match topics {
            Some(topics) => {
                let mut details = BTreeMap::new();

                for topic in topics {
                    let detail = self.storage.topic_detail(&topic).await?;
                    _ = details.insert(topic, detail);
                }

                Ok(details)
            }

            None => self
                .storage
                .topics()
                .await
                .map(|topics| {
                    topics
                        .into_iter()
                        .map(|detail| (TopicId::from(detail.name()), Some(detail)))
                        .collect()
                })
                .map_err(Into::into),
        }
    }

    /// Stop accepting background work and wait for every deletion in
    /// flight to reach a terminal phase.
    pub async fn shutdown(&self) {
        _ = self.background.close();
        debug!(in_flight = self.background.len());
        self.background.wait().await
    }
}

fn record_outcomes(results: &BTreeMap<TopicId, Deleted>) {
    for deleted in results.values() {
        DELETE_TOPIC_OUTCOMES.add(
            1,
            &[KeyValue::new(
                "error_code",
                format!("{:?}", deleted.error_code),
            )],
        );
    }
}

/// Topic names that could never have been created.
fn is_valid_topic_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.len() <= MAX_TOPIC_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[derive(Clone, Debug)]
pub struct Builder<N, S> {
    node_id: N,
    storage: S,
    leadership: Option<Leadership>,
    deletion_enabled: bool,
}

pub type PhantomBuilder<S> = Builder<PhantomData<i32>, PhantomData<S>>;

impl<S> Default for PhantomBuilder<S> {
    fn default() -> Self {
        Self {
            node_id: PhantomData,
            storage: PhantomData,
            leadership: None,
            deletion_enabled: true,
        }
    }
}

impl<N, S> Builder<N, S> {
    pub fn node_id(self, node_id: i32) -> Builder<i32, S> {
        Builder {
            node_id,
            storage: self.storage,
            leadership: self.leadership,
            deletion_enabled: self.deletion_enabled,
        }
    }

    pub fn leadership(self, leadership: Leadership) -> Self {
        Self {
            leadership: Some(leadership),
            ..self
        }
    }

    pub fn deletion_enabled(self, deletion_enabled: bool) -> Self {
        Self {
            deletion_enabled,
            ..self
        }
    }
}

impl<N, S> Builder<N, PhantomData<S>> {
    pub fn storage(self, storage: S) -> Builder<N, S> {
        Builder {
            node_id: self.node_id,
            storage,
            leadership: self.leadership,
            deletion_enabled: self.deletion_enabled,
        }
    }
}

impl<S> Builder<i32, S>
where
    S: Storage,
{
    pub fn build(self) -> Controller<S> {
        Controller {
            node_id: self.node_id,
            storage: self.storage,
            leadership: self
                .leadership
                .unwrap_or_else(|| Leadership::leader(self.node_id)),
            registry: Registry::new(),
            background: TaskTracker::new(),
            deletion_enabled: self.deletion_enabled,
        }
    }
}
