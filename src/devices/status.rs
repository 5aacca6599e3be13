//! Normalized device state
//!
//! GET replies come back in whatever layout the hub firmware uses. Each
//! endpoint declares a [`ResponseShape`] and the reply payload is folded into
//! one of the [`DeviceStatus`] variants before it leaves the device layer.

use super::endpoint::ResponseShape;
use crate::error::TransportError;
use serde::Serialize;
use serde_json::Value;

/// Temperature reading in degrees Celsius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Temperature {
    pub current: f64,
    pub target: f64,
    pub heating: bool,
}

/// State of one multiplexed radiator valve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValveReading {
    pub id: String,
    pub onoff: u8,
    pub mode: i64,
    pub temperature: Temperature,
}

/// Normalized result of a state fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeviceStatus {
    Switch {
        onoff: u8,
    },
    Thermostat {
        onoff: u8,
        mode: i64,
        temperature: Temperature,
    },
    Valves(Vec<ValveReading>),
    Raw(Value),
}

impl DeviceStatus {
    /// On/off state for majority voting.
    ///
    /// A valve group counts as on when any valve is on. Raw payloads carry
    /// no on/off notion.
    pub fn is_on(&self) -> Option<bool> {
        match self {
            DeviceStatus::Switch { onoff } | DeviceStatus::Thermostat { onoff, .. } => {
                Some(*onoff == 1)
            }
            DeviceStatus::Valves(valves) if !valves.is_empty() => {
                Some(valves.iter().any(|v| v.onoff == 1))
            }
            DeviceStatus::Valves(_) | DeviceStatus::Raw(_) => None,
        }
    }

    /// Fold a vendor reply payload into the declared shape
    pub fn from_payload(
        shape: ResponseShape,
        payload: &Value,
        ids: &[String],
    ) -> Result<Self, TransportError> {
        match shape {
            ResponseShape::Raw => Ok(DeviceStatus::Raw(payload.clone())),
            ResponseShape::Switch => parse_switch(payload, ids),
            ResponseShape::Thermostat => parse_thermostat(payload),
            ResponseShape::Valves => parse_valves(payload, ids),
        }
    }
}

fn malformed(what: &str) -> TransportError {
    TransportError::MalformedResponse(format!("reply has no {what}"))
}

fn as_u8(value: &Value) -> Option<u8> {
    value.as_u64().and_then(|v| u8::try_from(v).ok())
}

fn tenths(value: &Value) -> f64 {
    value.as_f64().unwrap_or_default() / 10.0
}

fn id_matches(channel: &Value, id: &str) -> bool {
    match channel {
        Value::Number(n) => n.to_string() == id,
        Value::String(s) => s == id,
        _ => false,
    }
}

fn parse_switch(payload: &Value, ids: &[String]) -> Result<DeviceStatus, TransportError> {
    let digest = &payload["all"]["digest"];
    let togglex = [&payload["togglex"], &digest["togglex"]]
        .into_iter()
        .find(|v| !v.is_null());

    let entry = match togglex {
        Some(Value::Array(channels)) => {
            let first_id = ids.first().map(String::as_str).unwrap_or("0");
            channels
                .iter()
                .find(|c| id_matches(&c["channel"], first_id))
                .or_else(|| channels.first())
        }
        Some(object) if object.is_object() => Some(object),
        _ => [&payload["toggle"], &digest["toggle"]]
            .into_iter()
            .find(|v| v.is_object()),
    };

    let onoff = entry
        .and_then(|e| as_u8(&e["onoff"]))
        .ok_or_else(|| malformed("on/off state"))?;
    Ok(DeviceStatus::Switch { onoff })
}

fn parse_thermostat(payload: &Value) -> Result<DeviceStatus, TransportError> {
    let mode = [
        &payload["all"]["digest"]["thermostat"]["mode"][0],
        &payload["mode"][0],
    ]
    .into_iter()
    .find(|v| v.is_object())
    .ok_or_else(|| malformed("thermostat mode"))?;

    let onoff = as_u8(&mode["onoff"]).ok_or_else(|| malformed("thermostat on/off"))?;

    Ok(DeviceStatus::Thermostat {
        onoff,
        mode: mode["mode"].as_i64().unwrap_or_default(),
        temperature: Temperature {
            current: tenths(&mode["currentTemp"]),
            target: tenths(&mode["targetTemp"]),
            heating: mode["state"].as_i64() == Some(1),
        },
    })
}

fn parse_valves(payload: &Value, ids: &[String]) -> Result<DeviceStatus, TransportError> {
    let all = payload["all"]
        .as_array()
        .ok_or_else(|| malformed("valve list"))?;

    let valves: Vec<ValveReading> = all
        .iter()
        .filter_map(|valve| {
            let id = valve["id"].as_str()?;
            if !ids.iter().any(|wanted| wanted == id) {
                return None;
            }
            let temperature = &valve["temperature"];
            Some(ValveReading {
                id: id.to_string(),
                onoff: as_u8(&valve["togglex"]["onoff"]).unwrap_or_default(),
                mode: valve["mode"]["state"].as_i64().unwrap_or_default(),
                temperature: Temperature {
                    current: tenths(&temperature["room"]),
                    target: tenths(&temperature["currentSet"]),
                    heating: temperature["heating"].as_i64() == Some(1),
                },
            })
        })
        .collect();

    if valves.is_empty() {
        return Err(malformed("readings for the configured valve ids"));
    }
    Ok(DeviceStatus::Valves(valves))
}
