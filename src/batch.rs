// Topic Tabs - Topic-scoped browser tab visibility engine
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::host::{HostTab, TabHost};
use futures::future::join_all;
use std::time::Duration;

/// Result of a batched creation run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub requested: usize,
    /// Successfully created tabs, in request order.
    pub created: Vec<HostTab>,
    pub failed_urls: Vec<String>,
}

impl BatchOutcome {
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    #[must_use]
    pub fn success_ratio(&self) -> f64 {
        if self.requested == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.created.len() as f64 / self.requested as f64;
        ratio
    }
}

/// Create `urls` as background tabs, at most `batch_size` in flight at once and
/// `delay` between batches. Individual failures are dropped, never retried.
pub async fn create_batch<H: TabHost + ?Sized>(
    host: &H,
    urls: &[String],
    batch_size: usize,
    delay: Duration,
) -> BatchOutcome {
    let batch_size = batch_size.max(1);
    let mut outcome = BatchOutcome { requested: urls.len(), ..BatchOutcome::default() };

    let mut batches = urls.chunks(batch_size).peekable();
    while let Some(batch) = batches.next() {
        let results = join_all(batch.iter().map(|url| host.create_tab(url, false))).await;
        for (url, result) in batch.iter().zip(results) {
            match result {
                Ok(tab) => outcome.created.push(tab),
                Err(err) => {
                    tracing::warn!(%url, "tab creation failed: {err}");
                    outcome.failed_urls.push(url.clone());
                }
            }
        }
        if batches.peek().is_some() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::debug!(
        created = outcome.created.len(),
        requested = outcome.requested,
        ratio = outcome.success_ratio(),
        "batch creation finished"
    );
    outcome
}
