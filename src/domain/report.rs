use std::fmt;

use serde::{Deserialize, Serialize};

/// Output mode of a report, fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// MIME type of a serialized report
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }
}

/// Transport the measured SDK was configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Unknown,
    Mqtt,
    MqttWs,
    Http,
    Amqp,
    AmqpWs,
}

impl Protocol {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mqtt" => Self::Mqtt,
            "mqtt_ws" => Self::MqttWs,
            "http" => Self::Http,
            "amqp" => Self::Amqp,
            "amqp_ws" => Self::AmqpWs,
            _ => Self::Unknown,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mqtt => "MQTT PROTOCOL",
            Self::MqttWs => "MQTT WS PROTOCOL",
            Self::Http => "HTTP PROTOCOL",
            Self::Amqp => "AMQP PROTOCOL",
            Self::AmqpWs => "AMQP WS PROTOCOL",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
