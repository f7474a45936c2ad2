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

//! In flight deletions, keyed by topic name.
//!
//! At most one non-terminal [`Tracker`] exists per topic. Every topic has its
//! own lock, taken through [`Registry::entry`]. Admission holds it while the
//! topic is looked up and marked as being deleted, and the deletion holds it
//! while the topic is marked absent and its tracker settles. A request for a
//! topic therefore either attaches to the deletion in flight or observes its
//! outcome in the metadata view. Requests for unrelated topics never wait
//! on each other.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as TopicLock, OwnedMutexGuard};
use tracing::debug;

use crate::{Result, tracker::Tracker};

type Slot = Arc<TopicLock<Option<Tracker>>>;

#[derive(Clone, Debug, Default)]
pub struct Registry {
    slots: Arc<Mutex<BTreeMap<String, Slot>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the deletion state of `topic`, waiting while
    /// another holder has it.
    pub async fn entry(&self, topic: &str) -> Result<Entry> {
        let slot = self
            .slots
            .lock()?
            .entry(topic.to_owned())
            .or_default()
            .clone();

        let guard = slot.lock_owned().await;

        Ok(Entry {
            topic: topic.to_owned(),
            guard: Some(guard),
            registry: self.clone(),
        })
    }

    pub async fn get(&self, topic: &str) -> Result<Option<Tracker>> {
        let slot = self.slots.lock()?.get(topic).cloned();

        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(None),
        }
    }

    pub async fn in_flight(&self) -> Result<usize> {
        let slots = self.slots.lock()?.values().cloned().collect::<Vec<_>>();

        let mut in_flight = 0;

        for slot in slots {
            if slot
                .lock()
                .await
                .as_ref()
                .is_some_and(|tracker| !tracker.phase().is_terminal())
            {
                in_flight += 1;
            }
        }

        Ok(in_flight)
    }

    // a slot is only cloned with the map locked, so a count of one means
    // nobody else holds or waits on it
    fn prune(&self, topic: &str) {
        if let Ok(mut slots) = self.slots.lock()
            && slots.get(topic).is_some_and(|slot| {
                Arc::strong_count(slot) == 1
                    && slot
                        .try_lock()
                        .is_ok_and(|registered| registered.is_none())
            })
        {
            _ = slots.remove(topic);
        }
    }
}

/// The locked deletion state of one topic, released on drop.
#[derive(Debug)]
pub struct Entry {
    topic: String,
    guard: Option<OwnedMutexGuard<Option<Tracker>>>,
    registry: Registry,
}

impl Entry {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn registered(&self) -> Option<&Tracker> {
        self.guard.as_deref().and_then(Option::as_ref)
    }

    /// The deletion in flight for this topic, if any.
    pub fn in_flight(&self) -> Option<Tracker> {
        self.registered()
            .filter(|tracker| !tracker.phase().is_terminal())
            .inspect(|tracker| debug!(topic = %self.topic, id = %tracker.id(), "attached"))
            .cloned()
    }

    /// Register a new deletion, replacing any terminal tracker.
    pub fn create(&mut self) -> Tracker {
        let tracker = Tracker::new(self.topic.as_str());
        debug!(topic = %self.topic, id = %tracker.id(), "created");

        if let Some(registered) = self.guard.as_deref_mut() {
            _ = registered.replace(tracker.clone());
        }

        tracker
    }

    /// Forget a tracker, leaving any newer tracker for the same topic alone.
    pub fn release(&mut self, tracker: &Tracker) -> bool {
        self.guard.as_deref_mut().is_some_and(|registered| {
            registered
                .take_if(|current| current.id() == tracker.id())
                .is_some()
        })
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        let vacant = self.registered().is_none();
        drop(self.guard.take());

        if vacant {
            self.registry.prune(&self.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Phase;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn second_admission_attaches() -> Result<()> {
        let registry = Registry::new();

        let created = {
            let mut entry = registry.entry("abc").await?;
            assert!(entry.in_flight().is_none());
            entry.create()
        };

        let attached = registry.entry("abc").await?.in_flight();
        assert_eq!(Some(created.id()), attached.map(|tracker| tracker.id()));
        assert_eq!(1, registry.in_flight().await?);

        Ok(())
    }

    #[tokio::test]
    async fn vacant_entry_is_pruned() -> Result<()> {
        let registry = Registry::new();

        {
            let entry = registry.entry("abc").await?;
            assert!(entry.in_flight().is_none());
        }

        assert!(registry.get("abc").await?.is_none());
        assert!(registry.slots.lock()?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn terminal_tracker_is_replaced() -> Result<()> {
        let registry = Registry::new();

        let first = registry.entry("abc").await?.create();
        first.failed("node 3 unable to remove topic")?;
        assert_eq!(Phase::Failed, first.phase());

        let mut entry = registry.entry("abc").await?;
        assert!(entry.in_flight().is_none());

        let second = entry.create();
        assert_ne!(first.id(), second.id());

        assert!(!entry.release(&first));
        assert!(entry.release(&second));
        drop(entry);

        assert!(registry.get("abc").await?.is_none());
        assert_eq!(0, registry.in_flight().await?);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn same_topic_waits_for_holder() -> Result<()> {
        let registry = Registry::new();
        let mut held = registry.entry("abc").await?;

        assert!(
            timeout(Duration::from_millis(50), registry.entry("abc"))
                .await
                .is_err()
        );

        let waiting = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.entry("abc").await.map(|entry| entry.in_flight()) })
        };

        sleep(Duration::from_millis(5)).await;
        let tracker = held.create();
        drop(held);

        let attached = waiting
            .await
            .map_err(|err| crate::Error::Message(err.to_string()))??;
        assert_eq!(Some(tracker.id()), attached.map(|tracker| tracker.id()));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_topics_do_not_wait() -> Result<()> {
        let registry = Registry::new();
        let _held = registry.entry("abc").await?;

        let mut other = timeout(Duration::from_millis(50), registry.entry("pqr"))
            .await
            .map_err(|err| crate::Error::Message(err.to_string()))??;
        assert_eq!("pqr", other.topic());

        let tracker = other.create();
        assert_eq!("pqr", tracker.topic());

        Ok(())
    }
}
