//! Service endpoint resolution
//!
//! Works out where the editor will be reachable from: a host name (or a
//! non-loopback IPv4 address when the machine has no usable hostname), a free
//! TCP port on the host, and the folder the editor opens.

use crate::config::DevContainerConfig;
use crate::errors::{EndpointError, Result};
use crate::workspace;
use std::fmt;
use std::net::{IpAddr, TcpListener};
use sysinfo::{Networks, System};
use tracing::{debug, instrument};

/// Where the editor is reachable once the container is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
    pub workspace_folder: String,
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "http://{}:{}/?folder={}",
            self.host, self.port, self.workspace_folder
        )
    }
}

/// Pick the host to advertise.
///
/// A non-empty hostname wins; otherwise the first non-loopback IPv4 address.
pub fn select_host(
    hostname: Option<String>,
    addrs: impl IntoIterator<Item = IpAddr>,
) -> Result<String> {
    if let Some(name) = hostname.filter(|h| !h.trim().is_empty()) {
        return Ok(name);
    }
    addrs
        .into_iter()
        .find(|addr| addr.is_ipv4() && !addr.is_loopback())
        .map(|addr| addr.to_string())
        .ok_or_else(|| EndpointError::HostUnavailable.into())
}

/// Resolve the host of this machine
#[instrument]
pub fn resolve_host() -> Result<String> {
    let hostname = System::host_name();
    if hostname.is_none() {
        debug!("No hostname available, falling back to interface addresses");
    }
    let networks = Networks::new_with_refreshed_list();
    let addrs: Vec<IpAddr> = networks
        .list()
        .values()
        .flat_map(|data| data.ip_networks().iter().map(|net| net.addr))
        .collect();
    select_host(hostname, addrs)
}

/// Ask the OS for a free TCP port.
///
/// The probe listener is closed before returning, so another process can take
/// the port before the container engine binds it.
pub fn find_available_port() -> Result<u16> {
    let listener = TcpListener::bind(("0.0.0.0", 0)).map_err(EndpointError::PortUnavailable)?;
    let port = listener
        .local_addr()
        .map_err(EndpointError::PortUnavailable)?
        .port();
    drop(listener);
    debug!("Found available port {}", port);
    Ok(port)
}

/// Host, port and workspace folder for one run
#[instrument(skip_all)]
pub fn resolve_endpoint(config: &DevContainerConfig) -> Result<ServiceEndpoint> {
    let host = resolve_host()?;
    let port = find_available_port()?;
    let workspace_folder = workspace::resolve_workspace_folder(config)?;
    Ok(ServiceEndpoint {
        host,
        port,
        workspace_folder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CodeupError;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;

    #[test]
    fn test_endpoint_display() {
        let endpoint = ServiceEndpoint {
            host: "devbox".to_string(),
            port: 41234,
            workspace_folder: "/workspace/proj".to_string(),
        };
        assert_eq!(
            endpoint.to_string(),
            "http://devbox:41234/?folder=/workspace/proj"
        );
    }

    #[test]
    fn test_select_host_prefers_hostname() -> anyhow::Result<()> {
        let host = select_host(
            Some("devbox".to_string()),
            [IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))],
        )?;
        assert_eq!(host, "devbox");
        Ok(())
    }

    #[test]
    fn test_select_host_falls_back_to_ipv4() -> anyhow::Result<()> {
        let addrs = [
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
        ];
        assert_eq!(select_host(None, addrs)?, "192.168.1.20");
        assert_eq!(select_host(Some(String::new()), addrs)?, "192.168.1.20");
        Ok(())
    }

    #[test]
    fn test_select_host_unavailable() {
        let result = select_host(None, [IpAddr::V4(Ipv4Addr::LOCALHOST)]);
        assert!(matches!(
            result,
            Err(CodeupError::Endpoint(EndpointError::HostUnavailable))
        ));
    }

    #[test]
    fn test_port_is_released() -> anyhow::Result<()> {
        let port = find_available_port()?;
        assert_ne!(port, 0);
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        drop(listener);
        Ok(())
    }

    #[test]
    fn test_resolve_endpoint_uses_workspace_folder() -> anyhow::Result<()> {
        let config = DevContainerConfig {
            dir_path: PathBuf::from("/home/me/proj/.devcontainer"),
            ..DevContainerConfig::default()
        };
        match resolve_endpoint(&config) {
            Ok(endpoint) => {
                assert_eq!(endpoint.workspace_folder, "/workspace/proj");
                assert!(endpoint.to_string().ends_with("/?folder=/workspace/proj"));
            }
            Err(CodeupError::Endpoint(EndpointError::HostUnavailable)) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
