//! Appchain address resolution
//!
//! Turns the operator's partial `{ip, address, ports}` into a complete
//! endpoint. Every combination either yields a fully populated endpoint or a
//! named `ValidationError`.
//!
//! Fabric port order: orderer, then `(url, event)` pairs per peer. The event
//! ports sit at indices 2, 4, 6 and 8, and the address must name one of them.

use pier_types::{
    AppchainEndpoint, AppchainInput, ChainType, Result, ValidationError, ETHER_ANY_PORT,
};
use std::collections::HashSet;

const FABRIC_EVENT_PORTS: [usize; 4] = [2, 4, 6, 8];
const ETHER_WILDCARD_IP: &str = "0.0.0.0";

/// Resolve the endpoint for `chain` from partial input
pub fn resolve(chain: ChainType, input: &AppchainInput) -> Result<AppchainEndpoint> {
    match chain {
        ChainType::Fabric => resolve_fabric(input),
        ChainType::Ethereum => resolve_ether(input),
    }
}

fn resolve_fabric(input: &AppchainInput) -> Result<AppchainEndpoint> {
    let chain = ChainType::Fabric;
    let explicit = input.explicit_ports();

    if let Some(ports) = &explicit {
        check_count(chain, ports)?;
        check_duplicates(ports)?;
    }
    let ports = explicit.clone().unwrap_or_else(|| chain.default_ports());

    let (ip, address) = match input.address() {
        None => {
            let ip = input.ip().unwrap_or(chain.default_ip()).to_string();
            let address = format!("{}:{}", ip, ports[2]);
            (ip, address)
        }
        Some(address) => {
            if explicit.is_none() {
                return Err(ValidationError::MissingPorts(address.to_string()));
            }
            let names_event_port = FABRIC_EVENT_PORTS
                .iter()
                .any(|&i| address.contains(ports[i].as_str()));
            if !names_event_port {
                let event_ports: Vec<&str> =
                    FABRIC_EVENT_PORTS.iter().map(|&i| ports[i].as_str()).collect();
                return Err(ValidationError::InconsistentAddress {
                    address: address.to_string(),
                    field: "event ports",
                    value: event_ports.join(","),
                });
            }
            let ip = match input.ip() {
                Some(ip) => {
                    check_contains(address, "ip", ip)?;
                    ip.to_string()
                }
                None => host_of(address).to_string(),
            };
            (ip, address.to_string())
        }
    };

    let crypto_path = input
        .crypto_path
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| ValidationError::MissingCredentialPath(chain.to_string()))?;

    Ok(AppchainEndpoint {
        ip,
        address,
        ports,
        crypto_path: Some(crypto_path),
    })
}

fn resolve_ether(input: &AppchainInput) -> Result<AppchainEndpoint> {
    let chain = ChainType::Ethereum;
    let explicit = input.explicit_ports();

    if let Some(ports) = &explicit {
        check_duplicates(ports)?;
        check_count(chain, ports)?;
    }

    let (ip, address, ports) = match input.address() {
        None => {
            let ip = input.ip().unwrap_or(chain.default_ip()).to_string();
            // A derived address needs a concrete port
            let ports = explicit
                .filter(|p| p[0] != ETHER_ANY_PORT)
                .unwrap_or_else(|| chain.default_ports());
            let address = format!("ws://{}:{}", ip, ports[0]);
            (ip, address, ports)
        }
        Some(address) => {
            let ports = match explicit {
                Some(ports) if ports[0] != ETHER_ANY_PORT => {
                    check_contains(address, "port", &ports[0])?;
                    ports
                }
                _ => vec![ETHER_ANY_PORT.to_string()],
            };
            let ip = match input.ip() {
                None | Some(ETHER_WILDCARD_IP) => ETHER_WILDCARD_IP.to_string(),
                Some(ip) => {
                    check_contains(address, "ip", ip)?;
                    ip.to_string()
                }
            };
            (ip, address.to_string(), ports)
        }
    };

    Ok(AppchainEndpoint {
        ip,
        address,
        ports,
        crypto_path: input.crypto_path.clone(),
    })
}

fn check_count(chain: ChainType, ports: &[String]) -> Result<()> {
    if ports.len() != chain.port_count() {
        return Err(ValidationError::PortCount {
            chain: chain.to_string(),
            expected: chain.port_count(),
            actual: ports.len(),
            ports: ports.to_vec(),
        });
    }
    Ok(())
}

fn check_duplicates(ports: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ports.len());
    for port in ports {
        if !seen.insert(port.as_str()) {
            return Err(ValidationError::DuplicatePort(port.clone()));
        }
    }
    Ok(())
}

fn check_contains(address: &str, field: &'static str, value: &str) -> Result<()> {
    if address.contains(value) {
        Ok(())
    } else {
        Err(ValidationError::InconsistentAddress {
            address: address.to_string(),
            field,
            value: value.to_string(),
        })
    }
}

/// Host part of `[scheme://]host[:port][/path]`
fn host_of(address: &str) -> &str {
    let rest = address
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(address);
    rest.split([':', '/']).next().unwrap_or(rest)
}
