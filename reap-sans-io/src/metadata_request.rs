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

use crate::ApiKey;

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetadataRequest {
    /// The topics to fetch metadata for, all topics when none
    pub topics: Option<Vec<MetadataRequestTopic>>,
}

impl ApiKey for MetadataRequest {
    const KEY: i16 = 3;
}

impl MetadataRequest {
    pub fn topics(self, topics: Option<Vec<MetadataRequestTopic>>) -> Self {
        Self { topics }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetadataRequestTopic {
    pub topic_id: Option<[u8; 16]>,
    pub name: Option<String>,
}

impl MetadataRequestTopic {
    pub fn topic_id(self, topic_id: Option<[u8; 16]>) -> Self {
        Self { topic_id, ..self }
    }

    pub fn name(self, name: Option<String>) -> Self {
        Self { name, ..self }
    }
}
