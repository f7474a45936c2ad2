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

use rama::{Context, Service};
use reap_sans_io::{
    ApiKey, DeleteTopicsRequest, DeleteTopicsResponse, delete_topics_response::DeletableTopicResult,
};
use reap_storage::{Storage, TopicId};
use tracing::instrument;

use crate::{Controller, Error, Result};

/// A [`Service`] using a [`Controller`] as [`Context`] taking [`DeleteTopicsRequest`] returning [`DeleteTopicsResponse`].
/// ```
/// use rama::{Context, Layer, Service as _, layer::MapStateLayer};
/// use reap_broker::{Controller, DeleteTopicsService, Error};
/// use reap_sans_io::{DeleteTopicsRequest, DeleteTopicsResponse,
///     delete_topics_response::DeletableTopicResult, ErrorCode};
/// use reap_storage::StorageContainer;
/// use url::Url;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Error> {
/// let storage = StorageContainer::builder()
///     .cluster_id("reap")
///     .node_id(111)
///     .storage(Url::parse("memory://reap/")?)
///     .build()
///     .await?;
///
/// let controller = Controller::builder()
///     .node_id(111)
///     .storage(storage)
///     .build();
///
/// let service = MapStateLayer::new(|_| controller).into_layer(DeleteTopicsService);
///
/// let topic = "pqr";
///
/// let error_code = ErrorCode::UnknownTopicOrPartition;
///
/// assert_eq!(
///     DeleteTopicsResponse::default()
///         .throttle_time_ms(Some(0))
///         .responses(Some(vec![
///             DeletableTopicResult::default()
///                 .error_code(error_code.into())
///                 .error_message(Some(error_code.to_string()))
///                 .name(Some(topic.into())),
///         ])),
///     service
///         .serve(
///             Context::default(),
///             DeleteTopicsRequest::default()
///                 .topic_names(Some(vec![topic.into()]))
///                 .timeout_ms(5_000)
///         )
///         .await?
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeleteTopicsService;

impl ApiKey for DeleteTopicsService {
    const KEY: i16 = DeleteTopicsRequest::KEY;
}

impl<S> Service<Controller<S>, DeleteTopicsRequest> for DeleteTopicsService
where
    S: Storage,
{
    type Response = DeleteTopicsResponse;
    type Error = Error;

    #[instrument(skip(ctx), ret)]
    async fn serve(
        &self,
        ctx: Context<Controller<S>>,
        req: DeleteTopicsRequest,
    ) -> Result<Self::Response, Self::Error> {
        let timeout =
            Duration::from_millis(u64::try_from(req.timeout_ms.max(0)).unwrap_or_default());

        let topics = req
            .topics
            .unwrap_or_default()
            .into_iter()
            .map(TopicId::from)
            .chain(
                req.topic_names
                    .unwrap_or_default()
                    .into_iter()
                    .map(TopicId::from),
            );

        let responses = ctx
            .state()
            .delete_topics(topics, timeout)
            .await?
            .into_iter()
            .map(|(topic, deleted)| {
                let (name, topic_id) = match topic {
                    TopicId::Name(name) => (Some(name), deleted.topic_id.map(|id| id.into_bytes())),
                    id @ TopicId::Id(_) => (None, Some(<[u8; 16]>::from(&id))),
                };

                DeletableTopicResult::default()
                    .name(name)
                    .topic_id(topic_id)
                    .error_code(deleted.error_code.into())
                    .error_message(
                        deleted
                            .error_message
                            .or_else(|| Some(deleted.error_code.to_string())),
                    )
            })
            .collect();

        Ok(DeleteTopicsResponse::default()
            .throttle_time_ms(Some(0))
            .responses(Some(responses)))
    }
}
