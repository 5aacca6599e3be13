//! Concurrent fan-out of one control code across several devices
//!
//! Every target gets its own task. Tasks share nothing but the read-only
//! device handles; the dispatcher waits for all of them before aggregating,
//! so a slow device only costs its own timeout and one offline device never
//! fails the others.

use super::consensus;
use crate::devices::{DeviceHandle, DeviceRegistry, DeviceStatus, EndpointKind};
use crate::error::{GatewayError, Result};
use crate::log_structured_error;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one device call inside a dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub device_name: String,
    pub succeeded: bool,
    /// Normalized state, only for successful state fetches
    pub status: Option<DeviceStatus>,
}

impl DispatchOutcome {
    pub fn success(device_name: impl Into<String>, status: Option<DeviceStatus>) -> Self {
        Self {
            device_name: device_name.into(),
            succeeded: true,
            status,
        }
    }

    pub fn failure(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            succeeded: false,
            status: None,
        }
    }
}

/// All outcomes of one dispatch, in completion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResult {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchResult {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Collapse into the caller-facing shape.
    ///
    /// Fails only when no target succeeded; otherwise both lists are sorted
    /// by device name.
    pub fn aggregate(self) -> Result<InvokeResponse> {
        let total = self.outcomes.len();
        if self.success_count() == 0 {
            return Err(GatewayError::AllTargetsFailed(total));
        }

        let (ok, failed): (Vec<_>, Vec<_>) =
            self.outcomes.into_iter().partition(|o| o.succeeded);

        let mut succeeded: Vec<DeviceResult> = ok
            .into_iter()
            .map(|o| DeviceResult {
                name: o.device_name,
                status: o.status,
            })
            .collect();
        succeeded.sort_by(|a, b| a.name.cmp(&b.name));

        let mut failed: Vec<String> = failed.into_iter().map(|o| o.device_name).collect();
        failed.sort();

        Ok(InvokeResponse { succeeded, failed })
    }
}

/// One successful device in an [`InvokeResponse`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceResult {
    pub name: String,
    pub status: Option<DeviceStatus>,
}

/// Response of a (possibly partially) successful invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeResponse {
    pub succeeded: Vec<DeviceResult>,
    pub failed: Vec<String>,
}

impl InvokeResponse {
    pub fn succeeded_names(&self) -> Vec<&str> {
        self.succeeded.iter().map(|d| d.name.as_str()).collect()
    }
}

/// One resolved control request
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub code: String,
    /// Absent is distinct from zero; blank input counts as absent
    pub value: Option<String>,
    /// De-duplicated, first occurrence wins
    pub targets: Vec<Arc<DeviceHandle>>,
}

impl DispatchRequest {
    pub fn new(targets: &[Arc<DeviceHandle>], code: &str, value: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            value: value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            targets: dedupe_targets(targets),
        }
    }
}

/// Run one call against one device; never fails past this boundary
pub async fn dispatch_one(
    handle: &DeviceHandle,
    code: &str,
    value: Option<&str>,
) -> DispatchOutcome {
    match handle.invoke(code, value).await {
        Ok(status) => DispatchOutcome::success(handle.name(), status),
        Err(e) => {
            log_structured_error!(e, "dispatcher", code);
            DispatchOutcome::failure(handle.name())
        }
    }
}

/// Collapse repeated targets, keeping first-seen order
pub fn dedupe_targets(targets: &[Arc<DeviceHandle>]) -> Vec<Arc<DeviceHandle>> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| seen.insert(t.name().to_string()))
        .cloned()
        .collect()
}

/// Fan one call out to every target and wait for all of them
pub async fn dispatch_many(
    targets: &[Arc<DeviceHandle>],
    code: &str,
    value: Option<&str>,
) -> DispatchResult {
    let targets = dedupe_targets(targets);
    debug!(code, targets = targets.len(), "Dispatching to devices");

    let mut pending: FuturesUnordered<_> = targets
        .into_iter()
        .map(|handle| {
            let name = handle.name().to_string();
            let code = code.to_string();
            let value = value.map(str::to_string);

            let task =
                tokio::spawn(async move { dispatch_one(&handle, &code, value.as_deref()).await });

            async move {
                task.await.unwrap_or_else(|e| {
                    warn!(device = %name, "Dispatch task aborted: {e}");
                    DispatchOutcome::failure(name)
                })
            }
        })
        .collect();

    let mut outcomes = Vec::with_capacity(pending.len());
    while let Some(outcome) = pending.next().await {
        outcomes.push(outcome);
    }

    DispatchResult { outcomes }
}

/// Validate every target before any network call.
///
/// Consensus needs `status` on every target as well as `code`.
fn preflight(
    targets: &[Arc<DeviceHandle>],
    code: &str,
    value: Option<&str>,
    vote: bool,
) -> Result<()> {
    for target in targets {
        if vote {
            target.endpoint(code)?;
            target.prepare(consensus::STATUS_CODE, None)?;
        } else {
            target.prepare(code, value)?;
        }
    }
    Ok(())
}

/// Entry point used by the HTTP layer
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Invoke `code` on the named devices of `family`; `None` selects every
    /// device that exposes `code`
    pub async fn invoke(
        &self,
        family: &str,
        devices: Option<&[String]>,
        code: &str,
        value: Option<&str>,
    ) -> Result<InvokeResponse> {
        let targets = self.registry.family(family)?.resolve_targets(devices, code)?;
        invoke_targets(&targets, code, value).await
    }
}

/// Invoke `code` on resolved targets, running the majority vote for a
/// value-less toggle
pub async fn invoke_targets(
    targets: &[Arc<DeviceHandle>],
    code: &str,
    value: Option<&str>,
) -> Result<InvokeResponse> {
    execute(DispatchRequest::new(targets, code, value)).await
}

/// Preflight and run a resolved request
pub async fn execute(request: DispatchRequest) -> Result<InvokeResponse> {
    let DispatchRequest {
        code,
        value,
        targets,
    } = request;
    if targets.is_empty() {
        return Err(GatewayError::EmptyTargets);
    }

    let kinds = targets
        .iter()
        .map(|t| t.endpoint(&code).map(|e| e.kind()))
        .collect::<Result<Vec<_>>>()?;
    let vote = value.is_none() && kinds.iter().all(|k| *k == EndpointKind::Toggle);

    preflight(&targets, &code, value.as_deref(), vote)?;

    if vote {
        consensus::toggle_by_majority(&targets, &code).await
    } else {
        dispatch_many(&targets, &code, value.as_deref())
            .await
            .aggregate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;
    use crate::error::TransportError;
    use crate::mock::{switch_family_config, MockTransport};
    use pretty_assertions::assert_eq;

    fn dispatcher(names: &[&str]) -> (Dispatcher, Arc<MockTransport>) {
        let transport = MockTransport::shared();
        let registry =
            DeviceRegistry::from_config(&switch_family_config(names), transport.clone()).unwrap();
        (Dispatcher::new(Arc::new(registry)), transport)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_duplicate_targets_collapse() {
        let (dispatcher, transport) = dispatcher(&["a", "b"]);

        let with_dupes = dispatcher
            .invoke("meross", Some(&names(&["a", "a", "b"])[..]), "toggle", Some("1"))
            .await
            .unwrap();
        assert_eq!(transport.call_count(), 2);

        let without = dispatcher
            .invoke("meross", Some(&names(&["a", "b"])[..]), "toggle", Some("1"))
            .await
            .unwrap();
        assert_eq!(with_dupes, without);
    }

    #[test]
    fn test_request_normalizes_targets_and_value() {
        let transport = MockTransport::shared();
        let registry =
            DeviceRegistry::from_config(&switch_family_config(&["a", "b"]), transport).unwrap();
        let family = registry.family("meross").unwrap();
        let listed = names(&["b", "a", "b"]);
        let targets = family.resolve_targets(Some(&listed[..]), "toggle").unwrap();

        let request = DispatchRequest::new(&targets, "toggle", Some("  "));
        let order: Vec<_> = request.targets.iter().map(|t| t.name()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(request.value, None);

        let request = DispatchRequest::new(&targets, "toggle", Some(" 0 "));
        assert_eq!(request.value.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_success() {
        let (dispatcher, transport) = dispatcher(&["a", "b", "c"]);
        transport.fail(
            "b.local",
            Method::Set,
            TransportError::VendorRejected {
                detail: "sign error".to_string(),
            },
        );

        let response = dispatcher
            .invoke("meross", None, "luminance", Some("40"))
            .await
            .unwrap();

        assert_eq!(response.succeeded_names(), vec!["a", "c"]);
        assert_eq!(response.failed, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_total_failure_escalates() {
        let (dispatcher, transport) = dispatcher(&["a", "b"]);
        transport.offline("a.local");
        transport.offline("b.local");

        let err = dispatcher
            .invoke("meross", None, "luminance", Some("40"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AllTargetsFailed(2)));
    }

    #[tokio::test]
    async fn test_unknown_code_never_reaches_transport() {
        let (dispatcher, transport) = dispatcher(&["a", "b"]);

        let err = dispatcher
            .invoke("meross", None, "self-destruct", Some("1"))
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert!(matches!(err, GatewayError::UnknownCode { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_value_aborts_before_network() {
        let (dispatcher, transport) = dispatcher(&["a", "b"]);

        let err = dispatcher
            .invoke("meross", None, "luminance", Some("101"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidValue(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_status_read() {
        let (dispatcher, transport) = dispatcher(&["lamp"]);
        transport.switch_state("lamp.local", 1);

        let response = dispatcher
            .invoke("meross", Some(&names(&["lamp"])[..]), "status", None)
            .await
            .unwrap();

        assert_eq!(
            response.succeeded,
            vec![DeviceResult {
                name: "lamp".to_string(),
                status: Some(DeviceStatus::Switch { onoff: 1 }),
            }]
        );
        assert!(response.failed.is_empty());
    }

    fn example_dispatcher() -> (Dispatcher, Arc<MockTransport>) {
        let config = crate::config::GatewayConfig::from_yaml_str(include_str!(
            "../../gateway.example.yaml"
        ))
        .unwrap();
        let transport = MockTransport::shared();
        let registry = DeviceRegistry::from_config(&config, transport.clone()).unwrap();
        (Dispatcher::new(Arc::new(registry)), transport)
    }

    #[tokio::test]
    async fn test_family_wide_toggle_skips_devices_without_code() {
        let (dispatcher, transport) = example_dispatcher();

        let response = dispatcher
            .invoke("meross", None, "toggle", Some("1"))
            .await
            .unwrap();

        assert_eq!(
            response.succeeded_names(),
            vec!["desk-lamp", "kitchen-bulb", "living-room"]
        );
        assert!(response.failed.is_empty());
        assert!(transport.calls_to("192.168.1.22", Method::Set).is_empty());
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_explicit_target_without_code_still_fails() {
        let (dispatcher, transport) = example_dispatcher();

        let err = dispatcher
            .invoke(
                "meross",
                Some(&names(&["desk-lamp", "hallway"])[..]),
                "toggle",
                Some("1"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::UnknownCode { ref device, .. } if device == "hallway"
        ));
        assert_eq!(transport.call_count(), 0);

        let err = dispatcher
            .invoke("meross", None, "defrost", Some("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownCode { .. }));
    }

    #[test]
    fn test_aggregate_sorts_by_name() {
        let result = DispatchResult {
            outcomes: vec![
                DispatchOutcome::success("zeta", None),
                DispatchOutcome::failure("omega"),
                DispatchOutcome::success("alpha", None),
                DispatchOutcome::failure("beta"),
            ],
        };

        let response = result.aggregate().unwrap();
        assert_eq!(response.succeeded_names(), vec!["alpha", "zeta"]);
        assert_eq!(response.failed, vec!["beta".to_string(), "omega".to_string()]);
    }
}
