//! Async driver for a [`SubscriptionSession`]

use std::sync::Arc;

use cosmos_auth_sdk::TokenProvider;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::channel::{ChannelEvent, PushChannel};
use crate::session::{SubscriptionSession, ADD_ACTION};
use crate::sink::RenderSink;
use crate::{ChannelError, SubscriptionError};

/// Run one subscription to completion.
///
/// Refreshes credentials, opens the channel, registers interest once the
/// server confirms, then renders every push until cancelled or the channel
/// fails. The session is `Closed` on return. Failures are also reported to
/// `sink`; cancellation is not a failure.
pub async fn run_subscription(
    session: &mut SubscriptionSession,
    auth: Arc<dyn TokenProvider>,
    channel: Arc<dyn PushChannel>,
    sink: Arc<dyn RenderSink>,
    cancel: CancellationToken,
) -> Result<(), SubscriptionError> {
    let span = info_span!("subscription", ref_id = %session.ref_id(), scope = %session.scope());
    async move {
        let outcome = drive(session, auth, channel, sink.as_ref(), &cancel).await;
        session.close();
        if let Err(err) = &outcome {
            warn!(error = %err, "Subscription failed");
            sink.fail(session.ref_id(), err);
        }
        outcome
    }
    .instrument(span)
    .await
}

async fn drive(
    session: &mut SubscriptionSession,
    auth: Arc<dyn TokenProvider>,
    channel: Arc<dyn PushChannel>,
    sink: &dyn RenderSink,
    cancel: &CancellationToken,
) -> Result<(), SubscriptionError> {
    session.begin_connect()?;

    // Never open the channel with a stale token
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Cancelled while refreshing credentials");
            return Ok(());
        }
        refreshed = auth.ensure_fresh() => refreshed?,
    }
    let token = auth.current_token();

    let mut subscription = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Cancelled while opening channel");
            return Ok(());
        }
        opened = channel.subscribe(session.scope(), &token) => opened?,
    };

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            event = subscription.next_event() => match event {
                Some(ChannelEvent::Confirmed) => {
                    let add = match session.on_connected(&token) {
                        Ok(add) => add,
                        Err(e) => break Err(e),
                    };
                    let data = match serde_json::to_value(&add) {
                        Ok(data) => data,
                        Err(e) => break Err(ChannelError::from(e)),
                    };
                    if let Err(e) = subscription.perform(ADD_ACTION, data) {
                        break Err(e);
                    }
                    info!(items = add.items.len(), live = add.end_time.is_none(), "Subscribed");
                }
                Some(ChannelEvent::Message(payload)) => match session.on_push(&payload) {
                    Ok(Some(update)) => sink.render(update),
                    Ok(None) => {}
                    Err(e) => break Err(e),
                },
                Some(ChannelEvent::Rejected) => {
                    break Err(ChannelError::Rejected(
                        "StreamingChannel refused the subscription".to_string(),
                    ))
                }
                Some(ChannelEvent::Disconnected(reason)) => break Err(ChannelError::Disconnected(reason)),
                None => break Err(ChannelError::Disconnected("connection closed".to_string())),
            },
        }
    };

    // Stop server pushes before the buffer goes away
    subscription.unsubscribe();
    debug!(received = session.received(), "Subscription torn down");
    outcome.map_err(SubscriptionError::from)
}
