use tokio::sync::mpsc;
use tokio::time::{self, Duration, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::bootstrap::BootstrapStep;

use super::controller::FieldNode;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const INBOUND_POLL_MILLIS: u64 = 250;

/// Requests an operator can make of a running node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    RetryBootstrap,
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Drives every activity of `node` on its own cadence until `cancel_token`
/// fires. Operator commands are applied between activities.
///
/// All activities run inline on this task, one at a time and to completion,
/// so the node's state needs no locking. A slow camera or card call delays
/// whatever is due next.
pub async fn run_node(
    mut node: FieldNode,
    mut commands: mpsc::UnboundedReceiver<OperatorCommand>,
    cancel_token: CancellationToken,
) -> FieldNode {
    let settings = node.settings().clone();
    let mut bootstrap_ticker = ticker(settings.bootstrap_window());
    let mut capture_ticker = ticker(settings.capture_period());
    let mut delivery_ticker = ticker(settings.delivery_period());
    let mut uptime_ticker = ticker(settings.uptime_period());
    let mut inbound_ticker = ticker(Duration::from_millis(INBOUND_POLL_MILLIS));

    log_info!(
        "node {} up: capture every {:?}, delivery every {:?}, uptime every {:?}",
        settings.node_id,
        settings.capture_period(),
        settings.delivery_period(),
        settings.uptime_period()
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("node loop shutting down");
                break;
            }
            Some(command) = commands.recv() => {
                log_info!("operator command {command:?}");
                match command {
                    OperatorCommand::RetryBootstrap => {
                        // Retried tasks run one bootstrap window from now.
                        node.retry_bootstrap();
                        bootstrap_ticker.reset();
                    }
                }
            }
            _ = bootstrap_ticker.tick(), if node.bootstrap_pending() => {
                // A finished task lets its successor start right away.
                if let BootstrapStep::Completed(_) = node.tick_bootstrap() {
                    bootstrap_ticker.reset_immediately();
                }
            }
            _ = capture_ticker.tick(), if node.capture_enabled() => {
                node.tick_capture();
            }
            _ = delivery_ticker.tick() => {
                node.tick_delivery();
            }
            _ = uptime_ticker.tick(), if node.uptime_enabled() => {
                if let Err(err) = node.tick_uptime() {
                    log_warn!("uptime entry not written: {err}");
                }
            }
            _ = inbound_ticker.tick() => {
                node.tick_inbound();
            }
        }
    }

    node
}
