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

use futures::future::join_all;
use tokio::time::timeout;
use tracing::debug;

use crate::tracker::Tracker;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Completed,
    Elapsed,
}

/// Wait until every tracker is terminal or the deadline passes.
///
/// A zero deadline returns immediately unless every tracker is already
/// terminal. Dropping the returned future leaves the trackers untouched.
pub async fn wait(trackers: &[Tracker], deadline: Duration) -> Outcome {
    if trackers.iter().all(|tracker| tracker.phase().is_terminal()) {
        return Outcome::Completed;
    }

    if deadline.is_zero() {
        return Outcome::Elapsed;
    }

    match timeout(deadline, join_all(trackers.iter().map(Tracker::terminal))).await {
        Ok(phases) => {
            debug!(?phases);
            Outcome::Completed
        }

        Err(_) => Outcome::Elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn empty_completes() {
        assert_eq!(Outcome::Completed, wait(&[], Duration::ZERO).await);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_when_outstanding() -> Result<()> {
        let tracker = Tracker::new("abc");
        assert!(!tracker.dispatched([1].into())?);

        assert_eq!(
            Outcome::Elapsed,
            wait(&[tracker.clone()], Duration::from_millis(250)).await
        );

        assert_eq!(Outcome::Elapsed, wait(&[tracker], Duration::ZERO).await);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn completes_when_all_terminal() -> Result<()> {
        let converging = Tracker::new("abc");
        let failing = Tracker::new("pqr");

        assert!(!converging.dispatched([1].into())?);
        assert!(!failing.dispatched(BTreeSet::from([1, 2]))?);

        let waiting = {
            let trackers = [converging.clone(), failing.clone()];
            tokio::spawn(async move { wait(&trackers, Duration::from_secs(30)).await })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(converging.node_completed(1)?);
        converging.converged()?;

        tokio::time::sleep(Duration::from_millis(5)).await;
        failing.failed("node 2 unable to remove topic")?;

        assert_eq!(
            Outcome::Completed,
            waiting
                .await
                .map_err(|err| crate::Error::Message(err.to_string()))?
        );

        Ok(())
    }
}
