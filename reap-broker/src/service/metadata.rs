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

use rama::{Context, Service};
use reap_sans_io::{
    ApiKey, ErrorCode, MetadataRequest, MetadataResponse, metadata_response::MetadataResponseTopic,
};
use reap_storage::{Storage, TopicId};
use tracing::instrument;

use crate::{Controller, Error, Result};

/// A [`Service`] using a [`Controller`] as [`Context`] taking [`MetadataRequest`] returning [`MetadataResponse`].
///
/// Answers from the metadata view on any node: a topic that is still being
/// deleted is visible with `is_deleting` set, a removed topic is unknown.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MetadataService;

impl ApiKey for MetadataService {
    const KEY: i16 = MetadataRequest::KEY;
}

impl<S> Service<Controller<S>, MetadataRequest> for MetadataService
where
    S: Storage,
{
    type Response = MetadataResponse;
    type Error = Error;

    #[instrument(skip(ctx), ret)]
    async fn serve(
        &self,
        ctx: Context<Controller<S>>,
        req: MetadataRequest,
    ) -> Result<Self::Response, Self::Error> {
        let controller = ctx.state();

        let requested = req
            .topics
            .filter(|topics| !topics.is_empty())
            .map(|topics| topics.iter().map(TopicId::from).collect::<Vec<_>>());

        let topics = controller
            .metadata(requested)
            .await?
            .into_iter()
            .map(|(topic, detail)| match detail {
                Some(detail) => MetadataResponseTopic::default()
                    .error_code(ErrorCode::None.into())
                    .name(Some(detail.name().into()))
                    .topic_id(Some(detail.id().into_bytes()))
                    .is_deleting(Some(detail.is_deleting()))
                    .replica_nodes(Some(detail.replicas().iter().copied().collect())),

                None => match topic {
                    TopicId::Name(name) => MetadataResponseTopic::default()
                        .error_code(ErrorCode::UnknownTopicOrPartition.into())
                        .name(Some(name)),

                    id @ TopicId::Id(_) => MetadataResponseTopic::default()
                        .error_code(ErrorCode::UnknownTopicId.into())
                        .topic_id(Some(<[u8; 16]>::from(&id))),
                },
            })
            .collect();

        Ok(MetadataResponse::default()
            .throttle_time_ms(Some(0))
            .cluster_id(Some(controller.storage().cluster_id().await?))
            .controller_id(controller.leadership().controller())
            .topics(Some(topics)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rama::{Layer as _, layer::MapStateLayer};
    use reap_storage::StorageContainer;
    use url::Url;

    async fn controller() -> Result<Controller<StorageContainer>> {
        let storage = StorageContainer::builder()
            .cluster_id("reap")
            .node_id(111)
            .storage(Url::parse("memory://reap/")?)
            .build()
            .await?;

        Ok(Controller::builder().node_id(111).storage(storage).build())
    }

    #[tokio::test]
    async fn unknown_topic() -> Result<()> {
        let controller = controller().await?;
        let service = MapStateLayer::new(|_| controller).into_layer(MetadataService);

        let response = service
            .serve(
                Context::default(),
                MetadataRequest::default().topics(Some(vec![
                    reap_sans_io::metadata_request::MetadataRequestTopic::default()
                        .name(Some("abc".into())),
                ])),
            )
            .await?;

        assert_eq!(Some("reap"), response.cluster_id.as_deref());
        assert_eq!(Some(111), response.controller_id);

        let topics = response.topics.unwrap_or_default();
        assert_eq!(1, topics.len());
        assert_eq!(ErrorCode::UnknownTopicOrPartition, topics[0].code()?);
        assert_eq!(Some("abc"), topics[0].name.as_deref());

        Ok(())
    }

    #[tokio::test]
    async fn every_topic_when_none_requested() -> Result<()> {
        let controller = controller().await?;

        for name in ["abc", "pqr"] {
            _ = controller.storage().create_topic(name, None).await?;
        }

        let service = MapStateLayer::new(|_| controller).into_layer(MetadataService);

        let response = service
            .serve(Context::default(), MetadataRequest::default())
            .await?;

        let topics = response.topics.unwrap_or_default();

        assert_eq!(
            vec![Some("abc"), Some("pqr")],
            topics
                .iter()
                .map(|topic| topic.name.as_deref())
                .collect::<Vec<_>>()
        );

        assert!(topics.iter().all(|topic| topic.is_deleting == Some(false)));
        assert!(
            topics
                .iter()
                .all(|topic| topic.replica_nodes == Some(vec![0, 1, 2]))
        );

        Ok(())
    }
}
