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

use pretty_assertions::assert_eq;
use reap_sans_io::{
    DeletableTopicResult, DeleteTopicsRequest, DeleteTopicsResponse, Error, ErrorCode,
    NULL_TOPIC_ID, delete_topics_request::DeleteTopicState,
};

#[test]
fn kafka_error_codes() -> Result<(), Error> {
    for (code, error_code) in [
        (-1, ErrorCode::UnknownServerError),
        (0, ErrorCode::None),
        (3, ErrorCode::UnknownTopicOrPartition),
        (7, ErrorCode::RequestTimedOut),
        (41, ErrorCode::NotController),
        (56, ErrorCode::KafkaStorageError),
        (73, ErrorCode::TopicDeletionDisabled),
        (100, ErrorCode::UnknownTopicId),
    ] {
        assert_eq!(error_code, ErrorCode::try_from(code)?);
        assert_eq!(code, i16::from(error_code));
    }

    Ok(())
}

#[test]
fn unknown_error_code() {
    assert!(matches!(
        ErrorCode::try_from(32_000),
        Err(Error::UnknownApiErrorCode(32_000))
    ));
}

#[test]
fn error_code_display() {
    assert_eq!("No error.", ErrorCode::None.to_string());
    assert_eq!("The request timed out.", ErrorCode::RequestTimedOut.to_string());
    assert_eq!(
        "This is not the correct controller for this cluster.",
        ErrorCode::NotController.to_string()
    );
}

#[test]
fn delete_by_name_or_id() {
    let by_name = DeleteTopicState::default().name(Some("pqr".into()));
    assert!(by_name.is_by_name());
    assert_eq!(NULL_TOPIC_ID, by_name.topic_id);

    let by_id = DeleteTopicState::default().topic_id([1; 16]);
    assert!(!by_id.is_by_name());
}

#[test]
fn response_json() -> Result<(), serde_json::Error> {
    let response = DeleteTopicsResponse::default()
        .throttle_time_ms(Some(0))
        .responses(Some(vec![
            DeletableTopicResult::default()
                .name(Some("abc".into()))
                .error_code(ErrorCode::RequestTimedOut.into())
                .error_message(Some(ErrorCode::RequestTimedOut.to_string())),
        ]));

    let encoded = serde_json::to_string(&response)?;
    assert_eq!(response, serde_json::from_str::<DeleteTopicsResponse>(&encoded)?);

    let request = DeleteTopicsRequest::default()
        .topic_names(Some(vec!["abc".into(), "pqr".into()]))
        .timeout_ms(1);

    assert_eq!(
        Some(vec![String::from("abc"), String::from("pqr")]),
        request.topic_names
    );

    Ok(())
}
