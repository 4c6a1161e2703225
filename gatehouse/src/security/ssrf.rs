// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Syntactic SSRF filtering for caller-supplied URLs.
//!
//! The guard inspects the URL as written. It does not resolve DNS, so a public
//! hostname that later resolves to an internal address is not caught here; callers
//! that open connections should re-check the peer address with [`SsrfGuard::check_ip`].

use crate::config::SsrfConfig;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsrfRejection {
    InvalidUrl,
    BlockedScheme,
    BlockedHost,
}

impl SsrfRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            SsrfRejection::InvalidUrl => "invalid_url",
            SsrfRejection::BlockedScheme => "blocked_scheme",
            SsrfRejection::BlockedHost => "blocked_host",
        }
    }
}

impl fmt::Display for SsrfRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsrfRejection::InvalidUrl => write!(f, "Invalid URL"),
            SsrfRejection::BlockedScheme => {
                write!(f, "URL scheme is not allowed. Use http or https")
            }
            SsrfRejection::BlockedHost => write!(f, "URL host is not allowed"),
        }
    }
}

impl std::error::Error for SsrfRejection {}

#[derive(Debug, Clone)]
pub struct SsrfGuard {
    blocked_hosts: HashSet<String>,
    blocked_scheme_markers: Vec<String>,
}

impl Default for SsrfGuard {
    fn default() -> Self {
        Self::new(&SsrfConfig::default())
    }
}

impl SsrfGuard {
    pub fn new(config: &SsrfConfig) -> Self {
        Self {
            blocked_hosts: config
                .blocked_hosts
                .iter()
                .map(|host| normalize_host(host))
                .collect(),
            blocked_scheme_markers: config
                .blocked_scheme_markers
                .iter()
                .map(|marker| marker.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Validates `raw` and returns the parsed URL when it is safe to fetch.
    pub fn check(&self, raw: &str) -> Result<Url, SsrfRejection> {
        let url = Url::parse(raw).map_err(|_| SsrfRejection::InvalidUrl)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SsrfRejection::BlockedScheme);
        }

        // Catches schemes smuggled past the parser, e.g. in nested redirects
        let lowered = raw.to_ascii_lowercase();
        if self
            .blocked_scheme_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
        {
            return Err(SsrfRejection::BlockedScheme);
        }

        let host = url.host().ok_or(SsrfRejection::InvalidUrl)?;
        let (host_name, ip) = match host {
            Host::Domain(domain) => (normalize_host(domain), None),
            Host::Ipv4(addr) => (addr.to_string(), Some(IpAddr::V4(addr))),
            Host::Ipv6(addr) => (addr.to_string(), Some(IpAddr::V6(addr))),
        };
        if host_name.is_empty() {
            return Err(SsrfRejection::InvalidUrl);
        }

        if self.blocked_hosts.contains(&host_name) {
            return Err(SsrfRejection::BlockedHost);
        }

        let ip = ip.or_else(|| host_name.parse::<IpAddr>().ok());
        if let Some(ip) = ip {
            Self::check_ip(ip)?;
        }

        Ok(url)
    }

    pub fn is_allowed(&self, raw: &str) -> bool {
        self.check(raw).is_ok()
    }

    /// Range check for an address about to be connected to.
    pub fn check_ip(ip: IpAddr) -> Result<(), SsrfRejection> {
        if is_internal_ip(&ip) {
            return Err(SsrfRejection::BlockedHost);
        }
        Ok(())
    }
}

fn normalize_host(host: &str) -> String {
    host.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Loopback, private, link-local and "this network" addresses, including their
/// IPv4-mapped IPv6 forms.
pub fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.octets()[0] == 0
}

fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link local
    if (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80 {
        return true;
    }
    ip.to_ipv4_mapped()
        .map(|v4| is_internal_ipv4(&v4))
        .unwrap_or(false)
}
