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

use crate::{ApiKey, ErrorCode, Result};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetadataResponse {
    pub throttle_time_ms: Option<i32>,
    pub cluster_id: Option<String>,

    /// The id of the controller node, -1 when there is no controller
    pub controller_id: Option<i32>,

    pub topics: Option<Vec<MetadataResponseTopic>>,
}

impl ApiKey for MetadataResponse {
    const KEY: i16 = 3;
}

impl MetadataResponse {
    pub fn throttle_time_ms(self, throttle_time_ms: Option<i32>) -> Self {
        Self {
            throttle_time_ms,
            ..self
        }
    }

    pub fn cluster_id(self, cluster_id: Option<String>) -> Self {
        Self { cluster_id, ..self }
    }

    pub fn controller_id(self, controller_id: Option<i32>) -> Self {
        Self {
            controller_id,
            ..self
        }
    }

    pub fn topics(self, topics: Option<Vec<MetadataResponseTopic>>) -> Self {
        Self { topics, ..self }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetadataResponseTopic {
    pub error_code: i16,
    pub name: Option<String>,
    pub topic_id: Option<[u8; 16]>,

    /// True while a deletion of this topic is in flight
    pub is_deleting: Option<bool>,

    /// The nodes hosting a replica of this topic
    pub replica_nodes: Option<Vec<i32>>,
}

impl MetadataResponseTopic {
    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn name(self, name: Option<String>) -> Self {
        Self { name, ..self }
    }

    pub fn topic_id(self, topic_id: Option<[u8; 16]>) -> Self {
        Self { topic_id, ..self }
    }

    pub fn is_deleting(self, is_deleting: Option<bool>) -> Self {
        Self {
            is_deleting,
            ..self
        }
    }

    pub fn replica_nodes(self, replica_nodes: Option<Vec<i32>>) -> Self {
        Self {
            replica_nodes,
            ..self
        }
    }

    pub fn code(&self) -> Result<ErrorCode> {
        ErrorCode::try_from(self.error_code)
    }
}
