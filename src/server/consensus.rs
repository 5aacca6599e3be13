//! Majority-inverse toggle
//!
//! A toggle without a value reads every target's state first, then switches
//! the whole group to the opposite of the current majority. A tie turns the
//! group on.

use super::dispatcher::{dispatch_many, DispatchOutcome, DispatchResult, InvokeResponse};
use crate::devices::DeviceHandle;
use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Code probed to learn each target's current state
pub const STATUS_CODE: &str = "status";

/// State to switch to, given `tally` devices on out of `survivors`
pub fn desired_state(tally: usize, survivors: usize) -> u8 {
    if tally <= survivors / 2 {
        1
    } else {
        0
    }
}

/// Probe, vote and switch the surviving targets
pub async fn toggle_by_majority(
    targets: &[Arc<DeviceHandle>],
    code: &str,
) -> Result<InvokeResponse> {
    let probe = dispatch_many(targets, STATUS_CODE, None).await;
    let by_name: HashMap<&str, &Arc<DeviceHandle>> =
        targets.iter().map(|t| (t.name(), t)).collect();

    let mut survivors = Vec::new();
    let mut unreachable = Vec::new();
    let mut tally = 0usize;

    for outcome in probe.outcomes {
        let vote = outcome
            .status
            .as_ref()
            .and_then(|status| status.is_on())
            .filter(|_| outcome.succeeded);

        match (vote, by_name.get(outcome.device_name.as_str())) {
            (Some(on), Some(handle)) => {
                tally += usize::from(on);
                survivors.push(Arc::clone(handle));
            }
            _ => {
                warn!(device = %outcome.device_name, "Excluded from toggle vote");
                unreachable.push(DispatchOutcome::failure(outcome.device_name));
            }
        }
    }

    if survivors.is_empty() {
        return Err(GatewayError::AllTargetsUnreachable(unreachable.len()));
    }

    let desired = desired_state(tally, survivors.len());
    info!(
        code,
        tally,
        survivors = survivors.len(),
        desired,
        "Resolved toggle by majority"
    );

    let value = desired.to_string();
    let set = dispatch_many(&survivors, code, Some(value.as_str())).await;
    if set.success_count() == 0 {
        return Err(GatewayError::AllTargetsFailed(survivors.len()));
    }

    let mut outcomes = set.outcomes;
    outcomes.extend(unreachable);
    DispatchResult { outcomes }.aggregate()
}
