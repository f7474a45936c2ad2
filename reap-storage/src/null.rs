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

use std::collections::BTreeSet;

use async_trait::async_trait;
use reap_sans_io::ErrorCode;
use tracing::instrument;
use uuid::Uuid;

use crate::{Completion, Error, Result, Storage, TopicDetail, TopicId};

/// A cluster without topics, every deletion is of an unknown topic.
#[derive(Clone, Debug)]
pub struct Engine {
    cluster: String,
    node: i32,
}

impl Engine {
    pub fn new(cluster: String, node: i32) -> Self {
        Self { cluster, node }
    }
}

const FEATURE: &str = "storage";

#[async_trait]
impl Storage for Engine {
    #[instrument(skip(self), fields(node = self.node))]
    async fn create_topic(&self, name: &str, _replicas: Option<BTreeSet<i32>>) -> Result<Uuid> {
        Err(Error::Message(format!("{FEATURE}: null engine cannot create: {name}")))
    }

    async fn topic_detail(&self, _topic: &TopicId) -> Result<Option<TopicDetail>> {
        Ok(None)
    }

    async fn topics(&self) -> Result<Vec<TopicDetail>> {
        Ok(vec![])
    }

    async fn mark_in_progress(&self, _name: &str) -> Result<ErrorCode> {
        Ok(ErrorCode::UnknownTopicOrPartition)
    }

    async fn mark_present(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn mark_absent(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn replicas(&self, _name: &str) -> Result<BTreeSet<i32>> {
        Ok(BTreeSet::new())
    }

    async fn remove_topic(&self, name: &str, _completion: Completion) -> Result<()> {
        Err(Error::UnknownTopic(name.to_owned()))
    }

    async fn cluster_id(&self) -> Result<String> {
        Ok(self.cluster.clone())
    }
}
