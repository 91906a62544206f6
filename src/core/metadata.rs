//! Static resource metadata attached to every record

use super::attributes::Attributes;
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "service.name";
pub const SERVICE_VERSION: &str = "service.version";
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// Service identity plus arbitrary static attributes
///
/// Immutable once a logger has been created from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMetadata {
    pub service_name: String,
    pub service_version: Option<String>,
    pub environment: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl StaticMetadata {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: None,
            environment: None,
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    #[must_use]
    pub fn with_attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.attributes.insert(key, value);
        self
    }

    /// Resource attributes followed by the static map, as one attribute set
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = self.resource_attributes();
        attrs.extend_from(&self.attributes);
        attrs
    }

    /// `service.name`, and `service.version` / `deployment.environment` when set
    pub fn resource_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new().with_field(SERVICE_NAME, self.service_name.as_str());
        if let Some(ref version) = self.service_version {
            attrs.insert(SERVICE_VERSION, version.as_str());
        }
        if let Some(ref environment) = self.environment {
            attrs.insert(DEPLOYMENT_ENVIRONMENT, environment.as_str());
        }
        attrs
    }
}
