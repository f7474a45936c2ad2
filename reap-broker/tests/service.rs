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

use std::time::Duration;

use common::{Error, alphanumeric_string, controller, init_tracing, memory, topics};
use pretty_assertions::assert_eq;
use rama::{Context, Layer as _, Service as _, layer::MapStateLayer};
use reap_broker::{DeleteTopicsService, MetadataService};
use reap_sans_io::{
    DeleteTopicsRequest, DeleteTopicsResponse, ErrorCode, MetadataRequest,
    delete_topics_request::DeleteTopicState, delete_topics_response::DeletableTopicResult,
    metadata_request::MetadataRequestTopic,
};
use reap_storage::Storage as _;

mod common;

#[tokio::test]
async fn delete_by_name_and_id() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let storage = memory(Duration::ZERO, &[]).await?;
    let by_name = alphanumeric_string(15);
    let name_id = storage.create_topic(&by_name, None).await?;
    let by_id = alphanumeric_string(15);
    let id = storage.create_topic(&by_id, None).await?;

    let service = MapStateLayer::new(|_| controller(storage)).into_layer(DeleteTopicsService);

    let response = service
        .serve(
            Context::default(),
            DeleteTopicsRequest::default()
                .topics(Some(vec![
                    DeleteTopicState::default().topic_id(id.into_bytes()),
                ]))
                .topic_names(Some(vec![by_name.clone()]))
                .timeout_ms(10_000),
        )
        .await?;

    let none = Some(ErrorCode::None.to_string());

    assert_eq!(
        DeleteTopicsResponse::default()
            .throttle_time_ms(Some(0))
            .responses(Some(vec![
                DeletableTopicResult::default()
                    .name(Some(by_name))
                    .topic_id(Some(name_id.into_bytes()))
                    .error_code(ErrorCode::None.into())
                    .error_message(none.clone()),
                DeletableTopicResult::default()
                    .topic_id(Some(id.into_bytes()))
                    .error_code(ErrorCode::None.into())
                    .error_message(none),
            ])),
        response
    );

    Ok(())
}

#[tokio::test]
async fn negative_timeout_does_not_wait() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let storage = memory(Duration::from_millis(100), &[]).await?;
    let name = topics(&storage, 1).await?.remove(0);
    let controller = controller(storage);

    let service = MapStateLayer::new({
        let controller = controller.clone();
        |_| controller
    })
    .into_layer(DeleteTopicsService);

    let response = service
        .serve(
            Context::default(),
            DeleteTopicsRequest::default()
                .topic_names(Some(vec![name.clone()]))
                .timeout_ms(-1),
        )
        .await?;

    let results = response.responses.unwrap_or_default();
    assert_eq!(1, results.len());
    assert_eq!(ErrorCode::RequestTimedOut, results[0].code()?);

    controller.shutdown().await;
    assert!(!controller.exists(&name).await?);

    Ok(())
}

#[tokio::test]
async fn metadata_while_deleting() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let storage = memory(Duration::from_millis(200), &[]).await?;
    let name = topics(&storage, 1).await?.remove(0);
    let controller = controller(storage);

    let deleting = MapStateLayer::new({
        let controller = controller.clone();
        |_| controller
    })
    .into_layer(DeleteTopicsService);

    let metadata = MapStateLayer::new({
        let controller = controller.clone();
        |_| controller
    })
    .into_layer(MetadataService);

    _ = deleting
        .serve(
            Context::default(),
            DeleteTopicsRequest::default()
                .topic_names(Some(vec![name.clone()]))
                .timeout_ms(1),
        )
        .await?;

    let request =
        MetadataRequest::default().topics(Some(vec![
            MetadataRequestTopic::default().name(Some(name.clone())),
        ]));

    let response = metadata.serve(Context::default(), request.clone()).await?;
    let topics = response.topics.unwrap_or_default();
    assert_eq!(ErrorCode::None, topics[0].code()?);
    assert_eq!(Some(true), topics[0].is_deleting);

    controller.shutdown().await;

    let response = metadata.serve(Context::default(), request).await?;
    let topics = response.topics.unwrap_or_default();
    assert_eq!(ErrorCode::UnknownTopicOrPartition, topics[0].code()?);
    assert_eq!(Some(name.as_str()), topics[0].name.as_deref());

    Ok(())
}
