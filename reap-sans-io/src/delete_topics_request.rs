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

use serde::{Deserialize, Serialize};

use crate::{ApiKey, NULL_TOPIC_ID};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct DeleteTopicsRequest {
    /// The name or topic id of the topics to delete
    pub topics: Option<Vec<DeleteTopicState>>,

    /// The names of the topics to delete
    pub topic_names: Option<Vec<String>>,

    /// The length of time in milliseconds to wait for the deletions to complete
    pub timeout_ms: i32,
}

impl ApiKey for DeleteTopicsRequest {
    const KEY: i16 = 20;
}

impl DeleteTopicsRequest {
    pub fn topics(self, topics: Option<Vec<DeleteTopicState>>) -> Self {
        Self { topics, ..self }
    }

    pub fn topic_names(self, topic_names: Option<Vec<String>>) -> Self {
        Self {
            topic_names,
            ..self
        }
    }

    pub fn timeout_ms(self, timeout_ms: i32) -> Self {
        Self { timeout_ms, ..self }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct DeleteTopicState {
    /// The topic name, used when the topic id is null
    pub name: Option<String>,

    /// The unique topic id, [`NULL_TOPIC_ID`] when deleting by name
    pub topic_id: [u8; 16],
}

impl DeleteTopicState {
    pub fn name(self, name: Option<String>) -> Self {
        Self { name, ..self }
    }

    pub fn topic_id(self, topic_id: [u8; 16]) -> Self {
        Self { topic_id, ..self }
    }

    pub fn is_by_name(&self) -> bool {
        self.topic_id == NULL_TOPIC_ID
    }
}
