//! URL allowlist policy for remote-access tools.
//!
//! When enabled, only URLs whose host matches the allowlist pass: exact
//! domain entries, `*.host.tld` wildcards (strict suffix match — the bare
//! apex needs its own entry), CIDR ranges for IP literals, and an optional
//! localhost exemption. Tools that reach the network call
//! [`UrlSecurityPolicy::check`] before connecting; a refusal is a normal tool
//! failure the model can see.

use std::net::IpAddr;

use tracing::warn;
use url::Url;

use crate::settings::UrlSecuritySettings;
use crate::tools::ToolError;

/// A parsed CIDR range, v4 or v6.
#[derive(Clone, Debug, PartialEq)]
struct Cidr {
    addr: IpAddr,
    prefix: u8,
}

impl Cidr {
    fn parse(s: &str) -> Result<Self, String> {
        let (addr_part, prefix_part) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let addr: IpAddr = addr_part
            .trim()
            .parse()
            .map_err(|_| format!("invalid IP in CIDR: {}", s))?;
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix = match prefix_part {
            None => max,
            Some(p) => p
                .trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid prefix in CIDR: {}", s))?,
        };
        if prefix > max {
            return Err(format!("prefix out of range in CIDR: {}", s));
        }
        Ok(Self { addr, prefix })
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let bits = u32::from(net) ^ u32::from(ip);
                self.prefix == 0 || bits >> (32 - self.prefix as u32) == 0
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let bits = u128::from(net) ^ u128::from(ip);
                self.prefix == 0 || bits >> (128 - self.prefix as u32) == 0
            }
            _ => false,
        }
    }
}

/// Compiled allowlist policy.
#[derive(Clone, Debug)]
pub struct UrlSecurityPolicy {
    enabled: bool,
    exact_domains: Vec<String>,
    wildcard_suffixes: Vec<String>,
    ranges: Vec<Cidr>,
    allow_localhost: bool,
    log_blocked: bool,
}

impl UrlSecurityPolicy {
    /// Compiles the policy from settings. Malformed CIDR entries are reported
    /// (fail-closed: a policy you cannot parse is a policy you cannot trust).
    pub fn from_settings(settings: &UrlSecuritySettings) -> Result<Self, String> {
        let mut exact_domains = Vec::new();
        let mut wildcard_suffixes = Vec::new();
        for domain in &settings.allow_domains {
            let domain = domain.trim().to_lowercase();
            if let Some(suffix) = domain.strip_prefix("*.") {
                wildcard_suffixes.push(format!(".{}", suffix));
            } else if !domain.is_empty() {
                exact_domains.push(domain);
            }
        }
        let ranges = settings
            .allow_ips
            .iter()
            .map(|s| Cidr::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            enabled: settings.enabled,
            exact_domains,
            wildcard_suffixes,
            ranges,
            allow_localhost: settings.allow_localhost,
            log_blocked: settings.log_blocked_attempts,
        })
    }

    /// A disabled policy that allows everything.
    pub fn allow_all() -> Self {
        Self {
            enabled: false,
            exact_domains: Vec::new(),
            wildcard_suffixes: Vec::new(),
            ranges: Vec::new(),
            allow_localhost: true,
            log_blocked: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Checks one URL against the policy. Disabled policies allow everything.
    pub fn check(&self, raw: &str) -> Result<(), ToolError> {
        if !self.enabled {
            return Ok(());
        }
        let parsed = Url::parse(raw)
            .map_err(|e| ToolError::InvalidInput(format!("invalid URL {}: {}", raw, e)))?;
        let Some(host) = parsed.host_str() else {
            return self.block(raw, "no host");
        };
        let host = host.trim_matches(['[', ']']).to_lowercase();

        if let Ok(ip) = host.parse::<IpAddr>() {
            if self.allow_localhost && ip.is_loopback() {
                return Ok(());
            }
            if self.ranges.iter().any(|r| r.contains(ip)) {
                return Ok(());
            }
            return self.block(raw, "IP not in allowed ranges");
        }

        if self.allow_localhost && host == "localhost" {
            return Ok(());
        }
        if self.exact_domains.iter().any(|d| d == &host) {
            return Ok(());
        }
        if self
            .wildcard_suffixes
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()))
        {
            return Ok(());
        }
        self.block(raw, "host not in allowlist")
    }

    fn block(&self, url: &str, reason: &str) -> Result<(), ToolError> {
        if self.log_blocked {
            warn!(url, reason, "blocked URL access");
        }
        Err(ToolError::UrlBlocked(url.to_string()))
    }
}
