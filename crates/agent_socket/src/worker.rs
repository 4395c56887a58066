use std::sync::Arc;

use chat_types::{AgentId, ConnectionId};
use tokio::sync::Notify;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::config::SessionConfig;
use crate::connector::{Connection, Connector, Inbound};
use crate::error::SocketError;
use crate::frames::{FrameCodec, InboundEvent};
use crate::retry::Backoff;
use crate::session::{Shared, WorkerEvent};

pub(crate) struct WorkerContext {
    pub(crate) connection_id: ConnectionId,
    pub(crate) agent_id: AgentId,
    pub(crate) endpoint: Url,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) cancel: CancellationToken,
    pub(crate) flush: Arc<Notify>,
    pub(crate) config: SessionConfig,
}

enum PumpExit {
    Cancelled,
    Superseded,
    Lost(SocketError),
}

enum Step {
    Cancelled,
    Flush,
    Ping,
    Inbound(Result<Inbound, SocketError>),
}

/// Connect/pump/backoff loop for one connection id.
///
/// Exits on cancellation, on a fatal fault, or as soon as the session reports
/// that this connection id is no longer current.
pub(crate) async fn run_worker(ctx: WorkerContext) {
    let mut backoff = Backoff::new(ctx.config.backoff);

    loop {
        if !ctx.shared.apply(ctx.connection_id, WorkerEvent::Connecting) {
            return;
        }
        debug!(
            agent = %ctx.agent_id,
            connection_id = ctx.connection_id,
            attempt = backoff.attempt(),
            "connecting"
        );

        let connected = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return,
            result = ctx.connector.connect(&ctx.endpoint) => result,
        };

        let fault = match connected {
            Ok(mut connection) => {
                backoff.reset();
                if !ctx.shared.apply(ctx.connection_id, WorkerEvent::Connected) {
                    close_quietly(connection.as_mut(), &ctx.config).await;
                    return;
                }
                info!(agent = %ctx.agent_id, connection_id = ctx.connection_id, "connected");

                match pump(&ctx, connection.as_mut()).await {
                    PumpExit::Cancelled | PumpExit::Superseded => {
                        close_quietly(connection.as_mut(), &ctx.config).await;
                        return;
                    }
                    PumpExit::Lost(fault) => fault,
                }
            }
            Err(fault) => fault,
        };

        if fault.is_fatal() {
            error!(
                agent = %ctx.agent_id,
                connection_id = ctx.connection_id,
                error = %fault,
                "agent not found; giving up"
            );
            let reason = format!("agent {} not found ({fault})", ctx.agent_id);
            ctx.shared
                .apply(ctx.connection_id, WorkerEvent::Fatal { reason });
            return;
        }

        let delay = backoff.next_delay();
        let attempt = backoff.attempt();
        warn!(
            agent = %ctx.agent_id,
            connection_id = ctx.connection_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %fault,
            "connection lost; reconnect scheduled"
        );
        let disconnected = WorkerEvent::Disconnected {
            reason: fault.to_string(),
            attempt,
            delay,
        };
        if !ctx.shared.apply(ctx.connection_id, disconnected) {
            return;
        }

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        if !ctx
            .shared
            .apply(ctx.connection_id, WorkerEvent::Reconnecting { attempt })
        {
            return;
        }
    }
}

async fn pump(ctx: &WorkerContext, connection: &mut dyn Connection) -> PumpExit {
    let mut codec = FrameCodec::new(ctx.config.frame_format, ctx.agent_id.clone());
    let mut ping = codec
        .ping_frame()
        .and(ctx.config.ping_interval)
        .map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

    loop {
        if let Some(exit) = flush_outbound(ctx, connection, &codec).await {
            return exit;
        }

        let step = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Step::Cancelled,
            _ = ctx.flush.notified() => Step::Flush,
            _ = next_tick(&mut ping) => Step::Ping,
            inbound = connection.next_inbound() => Step::Inbound(inbound),
        };

        match step {
            Step::Cancelled => return PumpExit::Cancelled,
            Step::Flush => {}
            Step::Ping => {
                if let Some(frame) = codec.ping_frame() {
                    if let Err(fault) = connection.send_text(frame).await {
                        return PumpExit::Lost(fault);
                    }
                    trace!(connection_id = ctx.connection_id, "keepalive sent");
                }
            }
            Step::Inbound(Ok(Inbound::Text(frame))) => match codec.decode(&frame) {
                InboundEvent::Ignored { event_type } => {
                    trace!(connection_id = ctx.connection_id, %event_type, "frame ignored");
                }
                event => {
                    if !ctx
                        .shared
                        .apply(ctx.connection_id, WorkerEvent::Inbound(event))
                    {
                        return PumpExit::Superseded;
                    }
                }
            },
            Step::Inbound(Ok(Inbound::Closed(close))) => return PumpExit::Lost(close.into_error()),
            Step::Inbound(Err(fault)) => return PumpExit::Lost(fault),
        }
    }
}

/// Transmits queued sends in FIFO order. A send that fails goes back to the
/// front of the queue. A send interrupted by cancellation is not requeued: the
/// frame may already be on the wire, so delivery is at most once.
async fn flush_outbound(
    ctx: &WorkerContext,
    connection: &mut dyn Connection,
    codec: &FrameCodec,
) -> Option<PumpExit> {
    while !ctx.cancel.is_cancelled() {
        let Some(text) = ctx.shared.take_outbound(ctx.connection_id) else {
            break;
        };
        let frame = codec.encode(&text);
        let sent = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            result = connection.send_text(frame) => Some(result),
        };

        match sent {
            Some(Ok(())) => {
                debug!(connection_id = ctx.connection_id, chars = text.len(), "message sent");
            }
            Some(Err(fault)) => {
                ctx.shared.requeue_front(&ctx.agent_id, text);
                return Some(PumpExit::Lost(fault));
            }
            None => {
                debug!(
                    connection_id = ctx.connection_id,
                    chars = text.len(),
                    "send interrupted by teardown, not retried"
                );
                return Some(PumpExit::Cancelled);
            }
        }
    }
    None
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn close_quietly(connection: &mut dyn Connection, config: &SessionConfig) {
    match tokio::time::timeout(config.close_timeout, connection.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(fault)) => debug!(error = %fault, "close handshake failed"),
        Err(_) => debug!("close handshake timed out"),
    }
}
