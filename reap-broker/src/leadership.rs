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

use std::sync::{
    Arc,
    atomic::{AtomicI32, Ordering},
};

use tracing::debug;

const NO_CONTROLLER: i32 = -1;

/// Which node currently holds the cluster controller role.
///
/// Cloned handles share the same view, so an election observed by one clone
/// is visible to every request admitted afterwards.
#[derive(Clone, Debug)]
pub struct Leadership {
    node_id: i32,
    controller: Arc<AtomicI32>,
}

/// Proof that the local node was the controller when a request arrived.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Admitted {
    pub node_id: i32,
}

/// Rejection carrying the controller known at the time, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NotController {
    pub controller: Option<i32>,
}

impl Leadership {
    pub fn leader(node_id: i32) -> Self {
        Self::follower(node_id, Some(node_id))
    }

    pub fn follower(node_id: i32, controller: Option<i32>) -> Self {
        Self {
            node_id,
            controller: Arc::new(AtomicI32::new(controller.unwrap_or(NO_CONTROLLER))),
        }
    }

    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    pub fn controller(&self) -> Option<i32> {
        match self.controller.load(Ordering::Acquire) {
            NO_CONTROLLER => None,
            controller => Some(controller),
        }
    }

    pub fn elected(&self, controller: i32) {
        debug!(node_id = self.node_id, controller);
        self.controller.store(controller, Ordering::Release);
    }

    pub fn vacated(&self) {
        debug!(node_id = self.node_id);
        self.controller.store(NO_CONTROLLER, Ordering::Release);
    }

    pub fn is_controller(&self) -> bool {
        self.controller() == Some(self.node_id)
    }

    pub fn admit(&self) -> Result<Admitted, NotController> {
        let controller = self.controller();

        if controller == Some(self.node_id) {
            Ok(Admitted {
                node_id: self.node_id,
            })
        } else {
            Err(NotController { controller })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_admits() {
        let leadership = Leadership::leader(111);
        assert!(leadership.is_controller());
        assert_eq!(Ok(Admitted { node_id: 111 }), leadership.admit());
    }

    #[test]
    fn follower_rejects() {
        let leadership = Leadership::follower(111, Some(112));
        assert_eq!(
            Err(NotController {
                controller: Some(112)
            }),
            leadership.admit()
        );
    }

    #[test]
    fn election_visible_to_clones() {
        let leadership = Leadership::follower(111, None);
        let observer = leadership.clone();
        assert_eq!(None, observer.controller());

        leadership.elected(111);
        assert!(observer.is_controller());

        leadership.vacated();
        assert_eq!(Err(NotController { controller: None }), observer.admit());
    }
}
