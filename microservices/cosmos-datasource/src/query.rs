//! Query execution

use std::sync::Arc;

use cosmos_auth_sdk::TokenProvider;
use cosmos_core::TimeRange;
use cosmos_streaming_sdk::{
    run_subscription, QueryEvent, RenderSink, SubscriptionSession, TelemetryQuery,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info};

use crate::CosmosDataSource;

/// One dashboard refresh: every panel query over a shared range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub targets: Vec<TelemetryQuery>,
    pub range: TimeRange,
    #[serde(default)]
    pub live_streaming: bool,
}

/// Running query. Cancelling or dropping it stops every subscription.
#[derive(Debug)]
pub struct QueryHandle {
    cancel: CancellationToken,
    _guard: DropGuard,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl QueryHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn subscriptions(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every subscription has ended
    pub async fn join(self) {
        let QueryHandle { _guard: guard, tasks, .. } = self;
        for (ref_id, task) in tasks {
            if let Err(e) = task.await {
                error!(ref_id = %ref_id, error = %e, "Subscription task aborted");
            }
        }
        drop(guard);
    }
}

impl CosmosDataSource {
    /// Start one subscription per query; their updates interleave on `sink`
    pub fn query(&self, request: &QueryRequest, sink: Arc<dyn RenderSink>) -> QueryHandle {
        let cancel = CancellationToken::new();
        let auth: Arc<dyn TokenProvider> = self.credentials.clone();

        let tasks = request
            .targets
            .iter()
            .map(|query| {
                let mut session = SubscriptionSession::new(
                    query,
                    &request.range,
                    request.live_streaming,
                    &self.settings.scope,
                );
                debug!(ref_id = %query.ref_id, items = query.items.len(), "Starting subscription");

                let auth = auth.clone();
                let channel = self.channel.clone();
                let sink = sink.clone();
                let cancel = cancel.child_token();
                let task = tokio::spawn(async move {
                    // Failures are already reported to the sink
                    let _ = run_subscription(&mut session, auth, channel, sink, cancel).await;
                });
                (query.ref_id.clone(), task)
            })
            .collect::<Vec<_>>();

        info!(
            subscriptions = tasks.len(),
            live = request.live_streaming,
            "Query started"
        );
        QueryHandle {
            _guard: cancel.clone().drop_guard(),
            cancel,
            tasks,
        }
    }

    /// [`query`](Self::query) with the updates delivered on a channel
    pub fn query_stream(&self, request: &QueryRequest) -> (QueryHandle, mpsc::UnboundedReceiver<QueryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.query(request, Arc::new(tx));
        (handle, rx)
    }
}
