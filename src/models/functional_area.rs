//! SiteWhere functional area definitions
//!
//! Every microservice in an instance is identified by its functional area.
//! The set is closed: templates that name an area outside this list fail to
//! parse instead of producing a microservice the operator cannot run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enumeration of all SiteWhere microservice functional areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionalArea {
    AssetManagement,
    BatchOperations,
    CommandDelivery,
    DeviceManagement,
    DeviceRegistration,
    DeviceState,
    EventManagement,
    EventSearch,
    EventSources,
    InboundProcessing,
    InstanceManagement,
    LabelGeneration,
    OutboundConnectors,
    ScheduleManagement,
}

impl FunctionalArea {
    /// Get the identifier as it appears in custom resources
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionalArea::AssetManagement => "asset-management",
            FunctionalArea::BatchOperations => "batch-operations",
            FunctionalArea::CommandDelivery => "command-delivery",
            FunctionalArea::DeviceManagement => "device-management",
            FunctionalArea::DeviceRegistration => "device-registration",
            FunctionalArea::DeviceState => "device-state",
            FunctionalArea::EventManagement => "event-management",
            FunctionalArea::EventSearch => "event-search",
            FunctionalArea::EventSources => "event-sources",
            FunctionalArea::InboundProcessing => "inbound-processing",
            FunctionalArea::InstanceManagement => "instance-management",
            FunctionalArea::LabelGeneration => "label-generation",
            FunctionalArea::OutboundConnectors => "outbound-connectors",
            FunctionalArea::ScheduleManagement => "schedule-management",
        }
    }

    /// Try to parse a string into a FunctionalArea, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// All functional areas, in the order the default profile deploys them
    pub fn all() -> &'static [Self] {
        &[
            FunctionalArea::InstanceManagement,
            FunctionalArea::AssetManagement,
            FunctionalArea::BatchOperations,
            FunctionalArea::CommandDelivery,
            FunctionalArea::DeviceManagement,
            FunctionalArea::DeviceRegistration,
            FunctionalArea::DeviceState,
            FunctionalArea::EventManagement,
            FunctionalArea::EventSearch,
            FunctionalArea::EventSources,
            FunctionalArea::InboundProcessing,
            FunctionalArea::LabelGeneration,
            FunctionalArea::OutboundConnectors,
            FunctionalArea::ScheduleManagement,
        ]
    }

    /// Areas deployed by the minimal profile
    pub fn minimal() -> &'static [Self] {
        &[
            FunctionalArea::InstanceManagement,
            FunctionalArea::AssetManagement,
            FunctionalArea::DeviceManagement,
            FunctionalArea::EventManagement,
            FunctionalArea::EventSources,
            FunctionalArea::InboundProcessing,
        ]
    }
}

impl fmt::Display for FunctionalArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<FunctionalArea> for String {
    fn from(area: FunctionalArea) -> Self {
        area.as_str().to_string()
    }
}

impl FromStr for FunctionalArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FunctionalArea::all()
            .iter()
            .copied()
            .find(|area| area.as_str() == s)
            .ok_or_else(|| format!("Unknown functional area: {}", s))
    }
}
