use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use trust_dns_resolver::{
    config::{LookupIpStrategy, ResolverConfig, ResolverOpts},
    error::ResolveError,
    system_conf::read_system_conf,
    TokioAsyncResolver,
};

use crate::config::LookupConfig;
use crate::types::{RegistrationFeatures, TriState};
use crate::whois::WhoisError;

/// Domains registered for more than this many days score legitimate.
pub const DOMAIN_AGE_THRESHOLD_DAYS: i64 = 365;

/// WHOIS failed in any way: both registration slots are suspicious.
pub const REGISTRATION_FALLBACK: RegistrationFeatures = RegistrationFeatures {
    domain_registration_length: TriState::Suspicious,
    age_of_domain: TriState::Suspicious,
};

/// No A record could be resolved.
pub const DNS_FALLBACK: TriState = TriState::Suspicious;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("host is empty")]
    EmptyHost,

    #[error("{0} is an IP address, not a name with A records")]
    NotAName(String),

    #[error("dns lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("dns resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("no A records")]
    NoRecords,
}

pub fn score_registration(
    created: &Result<DateTime<Utc>, WhoisError>,
    now: DateTime<Utc>,
) -> RegistrationFeatures {
    match created {
        Ok(created) => {
            let established = (now - *created).num_days() > DOMAIN_AGE_THRESHOLD_DAYS;
            let score = TriState::legitimate_if(established);
            RegistrationFeatures {
                domain_registration_length: score,
                age_of_domain: score,
            }
        }
        Err(e) => {
            debug!("Registration lookup failed: {}", e);
            REGISTRATION_FALLBACK
        }
    }
}

pub fn score_dns(resolved: &Result<(), DnsError>) -> TriState {
    match resolved {
        Ok(()) => TriState::Legitimate,
        Err(e) => {
            debug!("DNS lookup failed: {}", e);
            DNS_FALLBACK
        }
    }
}

/// A-record probe with its own explicit bound.
pub struct DnsProbe {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsProbe {
    pub fn new(config: &LookupConfig) -> Self {
        let (resolver_config, mut opts) = match read_system_conf() {
            Ok(system) => system,
            Err(e) => {
                warn!("No system resolver configuration ({}), using defaults", e);
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        opts.timeout = config.dns_timeout();
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
            timeout: config.dns_timeout(),
        }
    }

    pub async fn resolve(&self, host: &str) -> Result<(), DnsError> {
        if host.is_empty() {
            return Err(DnsError::EmptyHost);
        }
        // The resolver answers literals itself; as a DNS name they never resolve.
        if host.parse::<IpAddr>().is_ok() {
            return Err(DnsError::NotAName(host.to_string()));
        }

        let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(host))
            .await
            .map_err(|_| DnsError::Timeout(self.timeout))??;

        if lookup.iter().next().is_some() {
            Ok(())
        } else {
            Err(DnsError::NoRecords)
        }
    }
}
