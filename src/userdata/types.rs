//! Cloud-config document types
//!
//! The subset of the cloud-config schema emitted for new servers. Every
//! field is optional so a rendered document can be parsed back for
//! comparison.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header line identifying a cloud-config document
pub const CLOUD_CONFIG_HEADER: &str = "#cloud-config";

/// Top-level cloud-config document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Hostname to set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Fully qualified domain name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,

    /// Whether to manage /etc/hosts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_etc_hosts: Option<bool>,

    /// Whether root login is locked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_root: Option<bool>,

    /// Whether sshd accepts password authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_pwauth: Option<bool>,

    /// Resize root filesystem to fill the disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_rootfs: Option<bool>,

    /// Package update on first boot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_update: Option<bool>,

    /// Whether cloud-init writes /etc/resolv.conf
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_resolv_conf: Option<bool>,

    /// Resolver configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolv_conf: Option<ResolvConf>,

    /// Extra apt repositories
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apt_sources: Vec<AptSource>,

    /// Puppet agent configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puppet: Option<PuppetConfig>,

    /// SSH authorized keys for default user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_authorized_keys: Option<Vec<String>>,
}

/// `resolv_conf` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvConf {
    pub nameservers: Vec<String>,
    pub searchdomains: String,
    pub domain: String,
    pub options: ResolvOptions,
}

/// Resolver options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvOptions {
    pub rotate: bool,
    pub timeout: u32,
}

/// A single `apt_sources` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AptSource {
    pub source: String,
    pub filename: String,
    pub keyid: String,
}

/// `puppet` block; `conf` maps puppet.conf sections to their settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuppetConfig {
    pub conf: BTreeMap<String, BTreeMap<String, String>>,
}

impl PuppetConfig {
    /// Agent pointed at `server`
    pub fn with_server(server: &str) -> Self {
        let agent = BTreeMap::from([("server".to_string(), server.to_string())]);
        Self {
            conf: BTreeMap::from([("agent".to_string(), agent)]),
        }
    }

    /// The `[agent] server` setting, if present
    pub fn server(&self) -> Option<&str> {
        self.conf
            .get("agent")
            .and_then(|agent| agent.get("server"))
            .map(String::as_str)
    }
}

impl CloudConfig {
    /// Parse cloud-config from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        // Strip #cloud-config header if present
        let yaml = yaml
            .trim_start()
            .strip_prefix(CLOUD_CONFIG_HEADER)
            .map(|s| s.trim_start())
            .unwrap_or(yaml);

        serde_yaml::from_str(yaml)
    }

    /// Render as YAML prefixed with the `#cloud-config` header
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("{}\n\n{}", CLOUD_CONFIG_HEADER, body))
    }

    /// Check if this looks like a cloud-config (starts with #cloud-config)
    pub fn is_cloud_config(data: &str) -> bool {
        data.trim_start().starts_with(CLOUD_CONFIG_HEADER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_cloud_config() {
        let yaml = r#"
#cloud-config
hostname: test-instance
ssh_pwauth: true
"#;
        let config = CloudConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.hostname, Some("test-instance".to_string()));
        assert_eq!(config.ssh_pwauth, Some(true));
        assert!(config.resolv_conf.is_none());
    }

    #[test]
    fn test_is_cloud_config() {
        assert!(CloudConfig::is_cloud_config("#cloud-config\nhostname: test"));
        assert!(CloudConfig::is_cloud_config("  #cloud-config\n"));
        assert!(!CloudConfig::is_cloud_config("#!/bin/bash\necho hello"));
    }

    #[test]
    fn test_unset_fields_are_not_rendered() {
        let config = CloudConfig {
            hostname: Some("web1".to_string()),
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.starts_with("#cloud-config\n\n"));
        assert!(yaml.contains("hostname: web1"));
        assert!(!yaml.contains("apt_sources"));
        assert!(!yaml.contains("puppet"));
    }

    #[test]
    fn test_puppet_server_lookup() {
        let puppet = PuppetConfig::with_server("pm.example.com");
        assert_eq!(puppet.server(), Some("pm.example.com"));
        assert_eq!(PuppetConfig::default().server(), None);
    }
}
