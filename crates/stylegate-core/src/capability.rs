//! Capability names and availability status

use serde::{Deserialize, Serialize};

/// A named category of remote inference service.
///
/// The set is closed: every route of the gateway maps onto exactly one of
/// these, and configuration sections are keyed by their snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Person + garment image in, composited image out
    VirtualTryon,
    /// Free text in, free text out
    Chatbot,
    /// Prompt in, generated garment image out
    TextToDress,
    /// Descriptive phrase in, comma-delimited item list out
    Occasion,
}

impl Capability {
    /// All capabilities, in configuration order
    pub const ALL: [Capability; 4] = [
        Capability::VirtualTryon,
        Capability::Chatbot,
        Capability::TextToDress,
        Capability::Occasion,
    ];

    /// Configuration / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::VirtualTryon => "virtual_tryon",
            Capability::Chatbot => "chatbot",
            Capability::TextToDress => "text_to_dress",
            Capability::Occasion => "occasion",
        }
    }

    /// Human-readable service name used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Capability::VirtualTryon => "Virtual try-on",
            Capability::Chatbot => "Chatbot",
            Capability::TextToDress => "Text-to-dress",
            Capability::Occasion => "Occasion",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "virtual_tryon" => Ok(Capability::VirtualTryon),
            "chatbot" => Ok(Capability::Chatbot),
            "text_to_dress" => Ok(Capability::TextToDress),
            "occasion" => Ok(Capability::Occasion),
            _ => Err(format!("Unknown capability: '{}'", s)),
        }
    }
}

/// Availability of a capability as reported by `/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Available,
    Unavailable,
}

impl ServiceStatus {
    pub fn from_bound(bound: bool) -> Self {
        if bound {
            ServiceStatus::Available
        } else {
            ServiceStatus::Unavailable
        }
    }
}
