//! Blocking HTTP client for the device service.
//!
//! Endpoints (relative to `base_url`):
//! - `GET  /devices/{id}/status` -> `{ "connected": bool, "lastSeenAt": string|null }`
//! - `GET  /devices/{id}/weight` -> `{ "weight": number }` (kilograms)
//! - `POST /sessions/status`      -> session start/stop record
use std::time::Duration;

use chrono::{DateTime, Utc};
use drain_traits::{
    Ack, DeviceProbe, DeviceStatus, SessionRecorder, SyncAction, SyncRecord, WeightSource,
};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceFault, Result};
use crate::util::endpoint;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    connected: bool,
    #[serde(default)]
    last_seen_at: Option<DateTime<Utc>>,
}

/// Wire shape of the session-status endpoint.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusBody<'a> {
    pub action: &'static str,
    pub device_id: &'a str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drained_volume: Option<f64>,
}

impl<'a> From<&'a SyncRecord> for SessionStatusBody<'a> {
    fn from(r: &'a SyncRecord) -> Self {
        match r.action {
            SyncAction::Start => Self {
                action: r.action.as_str(),
                device_id: &r.device_id,
                timestamp: r.timestamp,
                initial_weight: r.mass_kg,
                final_weight: None,
                duration: None,
                drain_duration: None,
                drained_volume: None,
            },
            SyncAction::Stop => Self {
                action: r.action.as_str(),
                device_id: &r.device_id,
                timestamp: r.timestamp,
                initial_weight: None,
                final_weight: r.mass_kg,
                duration: r.duration_seconds,
                drain_duration: r.duration_seconds,
                // 1 g of dialysate ~ 1 ml
                drained_volume: r.drained_grams,
            },
        }
    }
}

/// Extract the kilogram reading from a weight payload. Anything but a JSON
/// number under `weight` is a decode fault; range checks happen in the core.
pub fn parse_weight(body: &serde_json::Value) -> Result<f64> {
    match body.get("weight") {
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| DeviceFault::Decode(format!("weight not representable: {n}"))),
        Some(other) => Err(DeviceFault::Decode(format!("weight is not a number: {other}"))),
        None => Err(DeviceFault::Decode("missing weight field".into())),
    }
}

/// Map a non-success status to a typed fault. 2xx maps to `None`.
pub fn classify_status(status: u16, message: impl Into<String>) -> Option<DeviceFault> {
    if (200..300).contains(&status) {
        None
    } else {
        Some(DeviceFault::Http {
            status,
            message: message.into(),
        })
    }
}

fn map_transport(e: reqwest::Error) -> DeviceFault {
    if e.is_timeout() {
        DeviceFault::Timeout
    } else if e.is_decode() {
        DeviceFault::Decode(e.to_string())
    } else {
        DeviceFault::Network(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct HttpDevice {
    client: reqwest::blocking::Client,
    base_url: String,
    device_id: String,
}

impl HttpDevice {
    pub fn new(base_url: &str, device_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_transport)?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            device_id: device_id.to_string(),
        })
    }

    fn get_json(&self, path: &[&str]) -> Result<serde_json::Value> {
        let url = endpoint(&self.base_url, path);
        let resp = self.client.get(&url).send().map_err(map_transport)?;
        let status = resp.status().as_u16();
        if let Some(fault) = classify_status(status, url) {
            return Err(fault);
        }
        resp.json::<serde_json::Value>().map_err(map_transport)
    }

    pub fn fetch_status(&self) -> Result<DeviceStatus> {
        let v = self.get_json(&["devices", &self.device_id, "status"])?;
        let body: StatusBody =
            serde_json::from_value(v).map_err(|e| DeviceFault::Decode(e.to_string()))?;
        Ok(DeviceStatus {
            connected: body.connected,
            last_seen_at: body.last_seen_at,
        })
    }

    pub fn fetch_weight(&self) -> Result<f64> {
        let v = self.get_json(&["devices", &self.device_id, "weight"])?;
        parse_weight(&v)
    }

    pub fn post_record(&self, record: &SyncRecord) -> Result<Ack> {
        let url = endpoint(&self.base_url, &["sessions", "status"]);
        let body = SessionStatusBody::from(record);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(map_transport)?;
        let status = resp.status().as_u16();
        if let Some(fault) = classify_status(status, resp.text().unwrap_or_default()) {
            tracing::warn!(status, action = body.action, "session record rejected");
            return Err(fault);
        }
        Ok(Ack { status })
    }
}

impl WeightSource for HttpDevice {
    fn read_kg(&mut self) -> std::result::Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.fetch_weight()?)
    }
}

impl DeviceProbe for HttpDevice {
    fn status(
        &mut self,
    ) -> std::result::Result<DeviceStatus, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.fetch_status()?)
    }
}

impl SessionRecorder for HttpDevice {
    fn record(
        &mut self,
        record: &SyncRecord,
    ) -> std::result::Result<Ack, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.post_record(record)?)
    }
}
