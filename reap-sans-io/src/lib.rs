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
//! Delete topics and metadata messages that perform no I/O
//!
//! The messages mirror the Apache Kafka `DeleteTopics` (API key 20) and
//! `Metadata` (API key 3) shapes used by the controller. Every field is
//! public and every message has a chaining setter per field, so a message
//! is built from its [`Default`]:
//!
//! ```
//! use reap_sans_io::{DeleteTopicsRequest, delete_topics_request::DeleteTopicState};
//!
//! let request = DeleteTopicsRequest::default()
//!     .topics(Some(vec![DeleteTopicState::default().name(Some("abc".into()))]))
//!     .timeout_ms(30_000);
//!
//! assert_eq!(30_000, request.timeout_ms);
//! ```

use std::{
    fmt::{self, Display, Formatter},
    process::{ExitCode, Termination},
    result,
};

use serde::{Deserialize, Serialize};

pub mod delete_topics_request;
pub mod delete_topics_response;
pub mod metadata_request;
pub mod metadata_response;

pub use delete_topics_request::DeleteTopicsRequest;
pub use delete_topics_response::DeletableTopicResult;
pub use delete_topics_response::DeleteTopicsResponse;
pub use metadata_request::MetadataRequest;
pub use metadata_response::MetadataResponse;

/// A topic id with every byte zero, used when a topic is identified by name
pub const NULL_TOPIC_ID: [u8; 16] = [0; 16];

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    Message(String),
    UnknownApiErrorCode(i16),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message(e) => f.write_str(e),
            e => write!(f, "{e:?}"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

/// Associates a message with its Kafka API key.
pub trait ApiKey {
    const KEY: i16;
}

#[non_exhaustive]
#[derive(
    Clone, Copy, Default, Deserialize, Eq, Hash, Debug, Ord, PartialEq, PartialOrd, Serialize,
)]
/// Kafka API response error codes used on the topic deletion path.
pub enum ErrorCode {
    UnknownServerError,
    #[default]
    None,
    UnknownTopicOrPartition,
    RequestTimedOut,
    InvalidTopicException,
    TopicAlreadyExists,
    NotController,
    InvalidRequest,
    KafkaStorageError,
    TopicDeletionDisabled,
    UnknownTopicId,
}

impl ErrorCode {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl Termination for ErrorCode {
    fn report(self) -> ExitCode {
        if let Self::None = self {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl TryFrom<i16> for ErrorCode {
    type Error = Error;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::try_from(&value)
    }
}

impl TryFrom<&i16> for ErrorCode {
    type Error = Error;

    fn try_from(value: &i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::UnknownServerError),
            0 => Ok(Self::None),
            3 => Ok(Self::UnknownTopicOrPartition),
            7 => Ok(Self::RequestTimedOut),
            17 => Ok(Self::InvalidTopicException),
            36 => Ok(Self::TopicAlreadyExists),
            41 => Ok(Self::NotController),
            42 => Ok(Self::InvalidRequest),
            56 => Ok(Self::KafkaStorageError),
            73 => Ok(Self::TopicDeletionDisabled),
            100 => Ok(Self::UnknownTopicId),
            otherwise => Err(Error::UnknownApiErrorCode(*otherwise)),
        }
    }
}

impl From<ErrorCode> for i16 {
    fn from(value: ErrorCode) -> Self {
        Self::from(&value)
    }
}

impl From<&ErrorCode> for i16 {
    fn from(value: &ErrorCode) -> Self {
        match value {
            ErrorCode::UnknownServerError => -1,
            ErrorCode::None => 0,
            ErrorCode::UnknownTopicOrPartition => 3,
            ErrorCode::RequestTimedOut => 7,
            ErrorCode::InvalidTopicException => 17,
            ErrorCode::TopicAlreadyExists => 36,
            ErrorCode::NotController => 41,
            ErrorCode::InvalidRequest => 42,
            ErrorCode::KafkaStorageError => 56,
            ErrorCode::TopicDeletionDisabled => 73,
            ErrorCode::UnknownTopicId => 100,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::UnknownServerError => f.write_str(
                "The server experienced an unexpected error when processing the request.",
            ),
            ErrorCode::None => f.write_str("No error."),
            ErrorCode::UnknownTopicOrPartition => {
                f.write_str("This server does not host this topic-partition.")
            }
            ErrorCode::RequestTimedOut => f.write_str("The request timed out."),
            ErrorCode::InvalidTopicException => {
                f.write_str("The request attempted to perform an operation on an invalid topic.")
            }
            ErrorCode::TopicAlreadyExists => f.write_str("Topic with this name already exists."),
            ErrorCode::NotController => {
                f.write_str("This is not the correct controller for this cluster.")
            }
            ErrorCode::InvalidRequest => f.write_str(
                "This most likely occurs because of a request being malformed by the client \
                 library or the message was sent to an incompatible broker. See the broker logs \
                 for more details.",
            ),
            ErrorCode::KafkaStorageError => {
                f.write_str("Disk error when trying to access log file on the disk.")
            }
            ErrorCode::TopicDeletionDisabled => f.write_str("Topic deletion is disabled."),
            ErrorCode::UnknownTopicId => f.write_str("This server does not host this topic ID."),
        }
    }
}
