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

//! Per topic deletion state.
//!
//! A [`Tracker`] follows one topic through `Pending → InProgress →
//! Converged`, or to `Failed`. Every replica node is a sub-task; the
//! tracker only converges once every sub-task has completed. Phase changes
//! are published on a [`watch`] channel so any number of waiters observe
//! the terminal transition directly.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
    time::{Duration, Instant, SystemTime},
};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Phase {
    #[default]
    Pending,
    InProgress,
    Converged,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Failed)
    }

    fn can_advance_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Failed)
                | (Self::InProgress, Self::Converged)
                | (Self::InProgress, Self::Failed)
        )
    }
}

#[derive(Debug, Default)]
struct Detail {
    nodes: BTreeMap<i32, bool>,
    error: Option<String>,
}

#[derive(Debug)]
struct Inner {
    id: Uuid,
    topic: String,
    requested_at: SystemTime,
    started: Instant,
    phase: watch::Sender<Phase>,
    detail: Mutex<Detail>,
}

#[derive(Clone, Debug)]
pub struct Tracker {
    inner: Arc<Inner>,
}

impl Tracker {
    pub fn new(topic: impl Into<String>) -> Self {
        let (phase, _) = watch::channel(Phase::Pending);

        Self {
            inner: Arc::new(Inner {
                id: Uuid::now_v7(),
                topic: topic.into(),
                requested_at: SystemTime::now(),
                started: Instant::now(),
                phase,
                detail: Mutex::new(Detail::default()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    pub fn requested_at(&self) -> SystemTime {
        self.inner.requested_at
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started.elapsed()
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    pub fn error(&self) -> Result<Option<String>> {
        self.inner
            .detail
            .lock()
            .map(|detail| detail.error.clone())
            .map_err(Into::into)
    }

    /// Replica nodes and whether each has completed removal
    pub fn nodes(&self) -> Result<BTreeMap<i32, bool>> {
        self.inner
            .detail
            .lock()
            .map(|detail| detail.nodes.clone())
            .map_err(Into::into)
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.inner.phase.subscribe()
    }

    /// Resolves once this tracker reaches a terminal phase.
    pub async fn terminal(&self) -> Phase {
        let mut phase = self.subscribe();

        match phase.wait_for(Phase::is_terminal).await {
            Ok(terminal) => *terminal,
            Err(_) => self.phase(),
        }
    }

    /// Removal has been handed to every replica node, returning true when
    /// there is nothing left to wait for.
    pub fn dispatched(&self, nodes: BTreeSet<i32>) -> Result<bool> {
        {
            let mut detail = self.inner.detail.lock()?;
            detail.nodes = nodes.into_iter().map(|node| (node, false)).collect();
        }

        self.advance(Phase::InProgress)?;
        self.is_complete()
    }

    /// A replica node has removed the topic, returning true when every
    /// node has completed.
    pub fn node_completed(&self, node: i32) -> Result<bool> {
        let current = self.phase();

        if current != Phase::InProgress {
            return Err(Error::IllegalTransition {
                topic: self.topic().to_owned(),
                from: current,
                to: Phase::InProgress,
            });
        }

        let mut detail = self.inner.detail.lock()?;

        if let Some(completed) = detail.nodes.get_mut(&node) {
            *completed = true;
        } else {
            warn!(topic = self.topic(), node, "completion from unexpected node");
        }

        Ok(detail.nodes.values().all(|completed| *completed))
    }

    pub fn converged(&self) -> Result<()> {
        if !self.is_complete()? {
            return Err(Error::Message(format!(
                "{}: converging with outstanding nodes: {:?}",
                self.topic(),
                self.nodes()?
            )));
        }

        self.advance(Phase::Converged)
    }

    pub fn failed(&self, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        warn!(topic = self.topic(), %reason);

        if self.phase().can_advance_to(Phase::Failed) {
            _ = self.inner.detail.lock()?.error.replace(reason);
        }

        self.advance(Phase::Failed)
    }

    fn is_complete(&self) -> Result<bool> {
        self.inner
            .detail
            .lock()
            .map(|detail| detail.nodes.values().all(|completed| *completed))
            .map_err(Into::into)
    }

    fn advance(&self, next: Phase) -> Result<()> {
        let mut from = None;

        let modified = self.inner.phase.send_if_modified(|phase| {
            if phase.can_advance_to(next) {
                *phase = next;
                true
            } else {
                from = Some(*phase);
                false
            }
        });

        if modified {
            debug!(topic = self.topic(), id = %self.id(), phase = ?next, elapsed = ?self.elapsed());
            Ok(())
        } else {
            Err(Error::IllegalTransition {
                topic: self.topic().to_owned(),
                from: from.unwrap_or(next),
                to: next,
            })
        }
    }
}
