//! Device families and the process-wide registry
//!
//! Built once from [`GatewayConfig`] at startup and read-only afterwards.

use super::endpoint::EndpointDescriptor;
use super::handle::DeviceHandle;
use crate::client::Transport;
use crate::config::{FamilyConfig, GatewayConfig};
use crate::error::{GatewayError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Devices sharing one vendor protocol and endpoint table
#[derive(Debug)]
pub struct DeviceFamily {
    name: String,
    devices: BTreeMap<String, Arc<DeviceHandle>>,
}

impl DeviceFamily {
    /// Build every device of a family against the shared endpoint table
    pub fn from_config(
        name: &str,
        config: &FamilyConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let table = config
            .endpoints
            .iter()
            .map(|e| EndpointDescriptor::from_config(e).map(Arc::new))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| GatewayError::config(format!("family '{name}': {e}")))?;

        let mut devices = BTreeMap::new();
        for device in &config.devices {
            let handle = DeviceHandle::new(device, &table, Arc::clone(&transport))
                .map_err(|e| GatewayError::config(format!("family '{name}': {e}")))?;
            devices.insert(device.name.clone(), Arc::new(handle));
        }

        Ok(Self {
            name: name.to_string(),
            devices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device names in ascending order
    pub fn names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, name: &str) -> Result<Arc<DeviceHandle>> {
        self.devices
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::unknown_device(name))
    }

    /// Map requested names to handles for a call to `code`.
    ///
    /// `None` selects every device of the family that exposes `code`, in
    /// name order, and fails only when none does. An explicit list keeps its
    /// order and is taken as is; duplicates are collapsed by the dispatcher.
    pub fn resolve_targets(
        &self,
        names: Option<&[String]>,
        code: &str,
    ) -> Result<Vec<Arc<DeviceHandle>>> {
        let targets = match names {
            None => {
                let capable: Vec<_> = self
                    .devices
                    .values()
                    .filter(|d| d.endpoint(code).is_ok())
                    .cloned()
                    .collect();
                if capable.is_empty() && !self.devices.is_empty() {
                    return Err(GatewayError::unknown_code(&self.name, code));
                }
                capable
            }
            Some(names) => names
                .iter()
                .map(|name| self.device(name))
                .collect::<Result<Vec<_>>>()?,
        };

        if targets.is_empty() {
            return Err(GatewayError::EmptyTargets);
        }
        Ok(targets)
    }
}

/// All configured families, keyed by route-facing name
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    families: BTreeMap<String, DeviceFamily>,
}

impl DeviceRegistry {
    pub fn from_config(config: &GatewayConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut families = BTreeMap::new();

        for (name, family_config) in &config.families {
            let family = DeviceFamily::from_config(name, family_config, Arc::clone(&transport))?;
            info!(
                family = %name,
                devices = family.len(),
                endpoints = family_config.endpoints.len(),
                "Loaded device family"
            );
            families.insert(name.clone(), family);
        }

        Ok(Self { families })
    }

    pub fn family(&self, name: &str) -> Result<&DeviceFamily> {
        self.families
            .get(name)
            .ok_or_else(|| GatewayError::UnknownFamily(name.to_string()))
    }

    pub fn family_names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Total number of configured devices
    pub fn device_count(&self) -> usize {
        self.families.values().map(DeviceFamily::len).sum()
    }
}
