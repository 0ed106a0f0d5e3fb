//! First-boot user-data generation
//!
//! Renders the cloud-config handed to a new server through the config
//! drive. The document always sets the hostname, manages /etc/hosts,
//! allows password logins, keeps root login enabled, grows the root
//! filesystem and refreshes the package index. Resolver, Puppet and SSH
//! key sections are only emitted when the caller asks for them.

pub mod types;

pub use types::{AptSource, CLOUD_CONFIG_HEADER, CloudConfig, PuppetConfig, ResolvConf, ResolvOptions};

use crate::BootstrapError;
use crate::config::Nameservers;
use tracing::debug;

/// Puppet Labs apt repository line; `$RELEASE` is expanded by cloud-init
pub const PUPPETLABS_APT_SOURCE: &str = "deb http://apt.puppetlabs.com $RELEASE main dependencies";

/// File name for the Puppet Labs apt source list
pub const PUPPETLABS_APT_FILENAME: &str = "puppetlabs.list";

/// Puppet Labs repository signing key
pub const PUPPETLABS_KEY_ID: &str = "4BD6EC30";

/// Build the cloud-config document for a server
pub fn generate_cloud_config(
    hostname: &str,
    domain: &str,
    ssh_keys: Option<&[String]>,
    nameservers: Option<&Nameservers>,
    puppet_host: Option<&str>,
) -> CloudConfig {
    let mut config = CloudConfig {
        hostname: Some(hostname.to_string()),
        fqdn: Some(format!("{}.{}", hostname, domain)),
        manage_etc_hosts: Some(true),
        disable_root: Some(false),
        ssh_pwauth: Some(true),
        resize_rootfs: Some(true),
        package_update: Some(true),
        ..Default::default()
    };

    if let Some(nameservers) = nameservers {
        config.manage_resolv_conf = Some(true);
        config.resolv_conf = Some(ResolvConf {
            nameservers: nameservers.to_vec(),
            searchdomains: domain.to_string(),
            domain: domain.to_string(),
            options: ResolvOptions {
                rotate: true,
                timeout: 1,
            },
        });
    }

    if let Some(puppet_host) = puppet_host {
        config.apt_sources.push(AptSource {
            source: PUPPETLABS_APT_SOURCE.to_string(),
            filename: PUPPETLABS_APT_FILENAME.to_string(),
            keyid: PUPPETLABS_KEY_ID.to_string(),
        });
        config.puppet = Some(PuppetConfig::with_server(puppet_host));
    }

    if let Some(keys) = ssh_keys {
        config.ssh_authorized_keys = Some(keys.to_vec());
    }

    config
}

/// Render the user-data text for a server
pub fn render_user_data(
    hostname: &str,
    domain: &str,
    ssh_keys: Option<&[String]>,
    nameservers: Option<&Nameservers>,
    puppet_host: Option<&str>,
) -> Result<String, BootstrapError> {
    let config = generate_cloud_config(hostname, domain, ssh_keys, nameservers, puppet_host);
    let text = config.to_yaml()?;
    debug!("Rendered {} bytes of user-data", text.len());
    Ok(text)
}
