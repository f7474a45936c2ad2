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
pub struct DeleteTopicsResponse {
    pub throttle_time_ms: Option<i32>,

    /// The results for each topic we tried to delete
    pub responses: Option<Vec<DeletableTopicResult>>,
}

impl ApiKey for DeleteTopicsResponse {
    const KEY: i16 = 20;
}

impl DeleteTopicsResponse {
    pub fn throttle_time_ms(self, throttle_time_ms: Option<i32>) -> Self {
        Self {
            throttle_time_ms,
            ..self
        }
    }

    pub fn responses(self, responses: Option<Vec<DeletableTopicResult>>) -> Self {
        Self { responses, ..self }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct DeletableTopicResult {
    pub name: Option<String>,
    pub topic_id: Option<[u8; 16]>,
    pub error_code: i16,
    pub error_message: Option<String>,
}

impl DeletableTopicResult {
    pub fn name(self, name: Option<String>) -> Self {
        Self { name, ..self }
    }

    pub fn topic_id(self, topic_id: Option<[u8; 16]>) -> Self {
        Self { topic_id, ..self }
    }

    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn error_message(self, error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..self
        }
    }

    pub fn code(&self) -> Result<ErrorCode> {
        ErrorCode::try_from(self.error_code)
    }
}
