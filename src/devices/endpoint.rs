//! Endpoint descriptors
//!
//! An endpoint describes one control code of a device family: the vendor
//! namespace it talks to, how a value is validated, and how the per-ID
//! payload fragments are rendered. The same descriptor serves both the state
//! fetch (no value, `GET`) and the mutation (value given, `SET`).

use crate::client::Method;
use crate::config::EndpointConfig;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const ID_SLOT: &str = "{id}";
const VALUE_SLOT: &str = "{value}";

/// Value substituted into the `{value}` slot of a state fetch
pub const GET_PLACEHOLDER: &str = "0";

/// Behavior variant of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Value selects SET, no value selects GET
    #[default]
    Default,
    /// State fetch only
    Status,
    /// Boolean switch; a missing value triggers the majority vote
    Toggle,
    /// Bounded integer setting
    Numeric,
    /// Transition to a target value; there is no state to fetch
    Fade,
}

/// How a GET reply payload is normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    /// Pass the vendor payload through
    #[default]
    Raw,
    /// Single on/off channel
    Switch,
    /// On/off, mode and temperature of a thermostat
    Thermostat,
    /// Per-ID readings of multiplexed radiator valves
    Valves,
}

/// Inclusive value range; `0..=0` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValueBounds {
    pub min: i64,
    pub max: i64,
}

impl ValueBounds {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min == 0 && self.max == 0
    }

    pub fn contains(&self, value: i64) -> bool {
        self.is_unbounded() || (self.min..=self.max).contains(&value)
    }
}

/// Metadata and behavior for one control code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    code: String,
    kind: EndpointKind,
    supported_device_types: BTreeSet<String>,
    namespace: String,
    payload_key: Option<String>,
    list: bool,
    template: String,
    bounds: ValueBounds,
    shape: ResponseShape,
}

impl EndpointDescriptor {
    /// Build a descriptor from its declarative form, checking the template
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        let descriptor = Self {
            code: config.code.clone(),
            kind: config.kind,
            supported_device_types: config.device_types.iter().cloned().collect(),
            namespace: config.namespace.clone(),
            payload_key: config.key.clone().filter(|k| !k.is_empty()),
            list: config.list,
            template: config.template.trim().to_string(),
            bounds: ValueBounds::new(config.min, config.max),
            shape: config.shape,
        };
        descriptor.check_template()?;
        Ok(descriptor)
    }

    fn check_template(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(GatewayError::config(format!(
                "endpoint '{}': {reason}",
                self.code
            )))
        };

        if self.template.is_empty() {
            return Ok(());
        }
        if self.template.matches(ID_SLOT).count() > 1 {
            return fail("template uses {id} more than once");
        }
        if self.template.matches(VALUE_SLOT).count() > 1 {
            return fail("template uses {value} more than once");
        }
        if self.payload_key.is_none() {
            return fail("template given without a payload key");
        }
        let sample = vec!["0".to_string()];
        if self.render_payload(&sample, GET_PLACEHOLDER).is_err() {
            return fail("template does not render to JSON");
        }
        Ok(())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn bounds(&self) -> ValueBounds {
        self.bounds
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Whether payloads wrap fragments in a JSON array
    pub fn is_list(&self) -> bool {
        self.list
    }

    /// Whether the endpoint renders any payload at all
    pub fn has_template(&self) -> bool {
        !self.template.is_empty()
    }

    pub fn supports(&self, device_type: &str) -> bool {
        self.supported_device_types.contains(device_type)
    }

    /// Check a caller-supplied value against the bounds.
    ///
    /// Values must be integers; when the endpoint is unbounded an empty value
    /// is accepted as well and yields `None`. The parsed integer is what gets
    /// rendered, so `+1` and `01` reach the device as `1`.
    pub fn validate(&self, value: &str) -> Result<Option<i64>> {
        let value = value.trim();
        if value.is_empty() && self.bounds.is_unbounded() {
            return Ok(None);
        }

        let parsed: i64 = value.parse().map_err(|_| {
            GatewayError::invalid_value(format!(
                "'{value}' is not an integer for code '{}'",
                self.code
            ))
        })?;

        if !self.bounds.contains(parsed) {
            return Err(GatewayError::invalid_value(format!(
                "{parsed} outside [{}, {}] for code '{}'",
                self.bounds.min, self.bounds.max, self.code
            )));
        }
        Ok(Some(parsed))
    }

    /// Presence of a value selects a mutation, absence a state fetch
    pub fn resolve_method(&self, has_value: bool) -> Method {
        if has_value {
            Method::Set
        } else {
            Method::Get
        }
    }

    /// Render one fragment per hardware ID and join them with `,`
    pub fn build_payload(&self, ids: &[String], value: &str) -> String {
        ids.iter()
            .map(|id| render_fragment(&self.template, id, value))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Full JSON payload for the vendor envelope
    pub fn render_payload(&self, ids: &[String], value: &str) -> Result<serde_json::Value> {
        if self.template.is_empty() {
            return Ok(serde_json::json!({}));
        }

        let key = self.payload_key.as_deref().unwrap_or_default();
        let fragments = self.build_payload(ids, value);
        let body = if self.list {
            format!("[{fragments}]")
        } else {
            fragments
        };
        let key = serde_json::to_string(key)?;
        let rendered = format!("{{{key}:{body}}}");

        serde_json::from_str(&rendered).map_err(|e| {
            GatewayError::invalid_value(format!(
                "payload for code '{}' is not valid JSON: {e}",
                self.code
            ))
        })
    }
}

/// Single left-to-right pass; substituted text is never rescanned.
fn render_fragment(template: &str, id: &str, value: &str) -> String {
    let mut out = String::with_capacity(template.len() + id.len() + value.len());
    let mut rest = template;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix(ID_SLOT) {
            out.push_str(id);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix(VALUE_SLOT) {
            out.push_str(value);
            rest = tail;
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}
