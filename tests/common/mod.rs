//! Common test utilities

#![allow(dead_code)]

pub mod meross_mock;

use device_gateway::client::SignedTransport;
use device_gateway::{DeviceRegistry, Dispatcher, GatewayConfig};
use std::sync::Arc;
use std::time::Duration;

/// Device timeout used by every test configuration
pub const TEST_TIMEOUT_MS: u64 = 300;

/// Delay that reliably exceeds [`TEST_TIMEOUT_MS`]
pub const OFFLINE_DELAY: Duration = Duration::from_secs(3);

pub const SECRET: &str = "test-secret";

/// Endpoint table shared by the test family
const ENDPOINTS: &str = r#"
      - code: status
        kind: status
        namespace: Appliance.System.All
        device_types: [mss310]
        shape: switch
      - code: toggle
        kind: toggle
        namespace: Appliance.Control.ToggleX
        device_types: [mss310]
        key: togglex
        template: '{"channel":{id},"onoff":{value}}'
        min: 0
        max: 1
      - code: status
        kind: status
        namespace: Appliance.Hub.Mts100.All
        device_types: [mts100v3]
        shape: valves
      - code: adjust
        kind: numeric
        namespace: Appliance.Hub.Mts100.Temperature
        device_types: [mts100v3]
        key: temperature
        list: true
        template: '{"id":"{id}","custom":{value}}'
        min: 50
        max: 350
"#;

/// YAML for one `meross` family; each device is `(name, host, type, ids)`
pub fn config_yaml(devices: &[(&str, &str, &str, &[&str])]) -> String {
    let mut yaml = format!("families:\n  meross:\n    endpoints:{ENDPOINTS}    devices:\n");

    for (name, host, device_type, ids) in devices {
        let ids = ids
            .iter()
            .map(|id| format!("\"{id}\""))
            .collect::<Vec<_>>()
            .join(", ");
        yaml.push_str(&format!(
            "      - name: {name}\n        host: \"{host}\"\n        device_type: {device_type}\n        ids: [{ids}]\n        secret_key: {SECRET}\n        timeout_ms: {TEST_TIMEOUT_MS}\n"
        ));
    }
    yaml
}

/// Switch devices `(name, host)` on single channel 0
pub fn switch_config(devices: &[(&str, &str)]) -> GatewayConfig {
    let devices: Vec<(&str, &str, &str, &[&str])> = devices
        .iter()
        .map(|(name, host)| (*name, *host, "mss310", &["0"][..]))
        .collect();
    GatewayConfig::from_yaml_str(&config_yaml(&devices)).expect("test config is valid")
}

/// Dispatcher over the real signed transport
pub fn dispatcher(config: &GatewayConfig) -> Dispatcher {
    let transport = Arc::new(SignedTransport::new().expect("transport"));
    let registry = DeviceRegistry::from_config(config, transport).expect("registry");
    Dispatcher::new(Arc::new(registry))
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
