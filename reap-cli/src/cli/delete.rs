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

use crate::{EnvVarExp, Result};
use clap::Parser;
use rama::{Context, Layer as _, Service as _, layer::MapStateLayer};
use reap_broker::{Controller, DeleteTopicsService, Leadership, NODE_ID};
use reap_sans_io::{
    DeleteTopicsRequest, DeleteTopicsResponse, ErrorCode, delete_topics_request::DeleteTopicState,
};
use reap_storage::{Storage as _, StorageContainer, TopicId};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

#[derive(Clone, Debug, Parser)]
pub(super) struct Arg {
    /// All members of the same cluster should use the same id
    #[arg(long, env = "CLUSTER_ID", default_value = "reap")]
    cluster_id: String,

    /// The id of the node receiving the request
    #[arg(long, env = "NODE_ID", default_value_t = NODE_ID)]
    node_id: i32,

    /// Storage engine, either memory://reap/ or null://reap/
    #[arg(long, env = "STORAGE_ENGINE", default_value = "memory://reap/")]
    storage_engine: EnvVarExp<Url>,

    /// The number of nodes in the cluster, each holding a replica of every topic
    #[arg(long, default_value_t = 3)]
    nodes: i32,

    /// Create this topic before deleting
    #[arg(long)]
    topic: Vec<String>,

    /// Delete this topic, either by name or topic id
    #[arg(long, required = true)]
    delete: Vec<TopicId>,

    /// How long to wait for every deletion to complete
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// How long each node takes to remove a topic
    #[arg(long, default_value = "0s", value_parser = humantime::parse_duration)]
    removal_latency: Duration,

    /// This node fails to remove any topic
    #[arg(long)]
    failing_node: Vec<i32>,

    /// The receiving node is not the controller
    #[arg(long)]
    not_controller: bool,

    /// Topic deletion is disabled on the controller
    #[arg(long)]
    deletion_disabled: bool,

    /// Wait this long for background deletions to finish after responding
    #[arg(long, value_parser = humantime::parse_duration)]
    poll: Option<Duration>,
}

#[derive(Clone, Debug, Serialize)]
struct Report {
    response: DeleteTopicsResponse,

    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<Vec<String>>,
}

impl Arg {
    pub(super) async fn main(self) -> Result<ErrorCode> {
        let storage = StorageContainer::builder()
            .cluster_id(self.cluster_id.as_str())
            .node_id(self.node_id)
            .storage(self.storage_engine.into_inner())
            .nodes(Some(self.nodes))
            .removal_latency(Some(self.removal_latency))
            .failing_nodes(self.failing_node.iter().copied())
            .build()
            .await?;

        for name in &self.topic {
            let id = storage.create_topic(name, None).await?;
            debug!(%name, %id);
        }

        let controller = Controller::builder()
            .node_id(self.node_id)
            .storage(storage)
            .leadership(if self.not_controller {
                Leadership::follower(self.node_id, None)
            } else {
                Leadership::leader(self.node_id)
            })
            .deletion_enabled(!self.deletion_disabled)
            .build();

        let service = MapStateLayer::new({
            let controller = controller.clone();
            |_| controller
        })
        .into_layer(DeleteTopicsService);

        let response = service
            .serve(Context::default(), request(self.delete, self.timeout))
            .await?;

        let remaining = if let Some(poll) = self.poll {
            if timeout(poll, controller.shutdown()).await.is_err() {
                let in_flight = controller.registry().in_flight().await?;
                warn!(?poll, in_flight);
            }

            Some(
                controller
                    .storage()
                    .topics()
                    .await?
                    .into_iter()
                    .map(|detail| detail.name().to_owned())
                    .collect(),
            )
        } else {
            None
        };

        let error_code = response
            .responses
            .iter()
            .flatten()
            .map(|result| result.code())
            .find(|code| !matches!(code, Ok(ErrorCode::None)))
            .transpose()
            .map(Option::unwrap_or_default)?;

        println!(
            "{}",
            serde_json::to_string_pretty(&Report {
                response,
                remaining
            })?
        );

        Ok(error_code)
    }
}

fn request(topics: Vec<TopicId>, timeout: Duration) -> DeleteTopicsRequest {
    let (names, ids) = topics
        .into_iter()
        .partition::<Vec<_>, _>(|topic| matches!(topic, TopicId::Name(_)));

    DeleteTopicsRequest::default()
        .topic_names(Some(names.iter().map(ToString::to_string).collect()))
        .topics(Some(
            ids.iter()
                .map(|id| DeleteTopicState::default().topic_id(id.into()))
                .collect(),
        ))
        .timeout_ms(i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX))
}
