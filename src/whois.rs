use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use publicsuffix::{List, Psl};
use regex::Regex;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::LookupConfig;

const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

/// ICANN and private sections of the Mozilla public suffix list.
static SUFFIXES: Lazy<List> = Lazy::new(|| {
    include_str!("../data/public_suffix_list.dat")
        .parse::<List>()
        .expect("bundled public suffix list")
});

static REFERRAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:refer|whois):\s*(\S+)\s*$").expect("valid referral pattern")
});

static REGISTRAR_SERVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*registrar whois server:\s*(\S+)\s*$").expect("valid registrar pattern")
});

static CREATION_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?im)^\s*(?:creation date|created on|created|registered on|registration time",
        r"|registration date|domain registration date|record created|registered)",
        r"\s*\.*:\s*(.+?)\s*$",
    ))
    .expect("valid creation pattern")
});

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("host is empty")]
    EmptyHost,

    #[error("{0} is an IP address, not a domain")]
    NotADomain(String),

    #[error("whois lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("whois connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no whois server for .{0}")]
    NoReferral(String),

    #[error("no creation date in whois record for {0}")]
    MissingCreationDate(String),
}

pub struct WhoisClient {
    root_server: String,
    port: u16,
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(config: &LookupConfig) -> Self {
        Self {
            root_server: config.whois_server.clone(),
            port: config.whois_port,
            timeout: config.whois_timeout(),
        }
    }

    /// Creation date of the registrable domain behind `host`.
    pub async fn creation_date(&self, host: &str) -> Result<DateTime<Utc>, WhoisError> {
        if host.is_empty() {
            return Err(WhoisError::EmptyHost);
        }
        if host.parse::<IpAddr>().is_ok() {
            return Err(WhoisError::NotADomain(host.to_string()));
        }

        let domain = registrable_domain(host);
        tokio::time::timeout(self.timeout, self.lookup(&domain))
            .await
            .map_err(|_| WhoisError::Timeout(self.timeout))?
    }

    async fn lookup(&self, domain: &str) -> Result<DateTime<Utc>, WhoisError> {
        let tld = domain.rsplit('.').next().unwrap_or(domain);

        let root = self.query(&self.root_server, tld).await?;
        let registry = capture(&REFERRAL, &root)
            .ok_or_else(|| WhoisError::NoReferral(tld.to_string()))?;

        let record = self.query(registry, domain).await?;
        if let Some(created) = first_creation_date(&record) {
            return Ok(created);
        }

        // Thin registries only point at the registrar's server.
        if let Some(registrar) = capture(&REGISTRAR_SERVER, &record) {
            let server = registrar
                .trim_start_matches("whois://")
                .trim_start_matches("http://")
                .trim_start_matches("https://")
                .trim_end_matches('/');
            let detail = self.query(server, domain).await?;
            if let Some(created) = first_creation_date(&detail) {
                return Ok(created);
            }
        }

        Err(WhoisError::MissingCreationDate(domain.to_string()))
    }

    async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
        debug!("whois {} @ {}:{}", query, server, self.port);
        let mut stream = TcpStream::connect((server, self.port)).await?;
        stream.write_all(format!("{query}\r\n").as_bytes()).await?;

        let mut response = Vec::new();
        stream.take(MAX_RESPONSE_BYTES).read_to_end(&mut response).await?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

fn capture<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Public suffix plus one label. Hosts that are themselves a suffix come back as is.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');
    SUFFIXES
        .domain(host.as_bytes())
        .and_then(|domain| std::str::from_utf8(domain.as_bytes()).ok())
        .unwrap_or(host)
        .to_string()
}

/// First creation date in document order that parses.
pub fn first_creation_date(record: &str) -> Option<DateTime<Utc>> {
    CREATION_FIELD
        .captures_iter(record)
        .filter_map(|caps| caps.get(1))
        .find_map(|value| parse_date(value.as_str()))
}

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    parse_exact(value).or_else(|| {
        // "2001-05-02 10:00:00 (UTC+8)", "1999-01-01 #12345"
        let first = value.split_whitespace().next()?;
        parse_exact(first)
    })
}

fn parse_exact(value: &str) -> Option<DateTime<Utc>> {
    const DATE_TIME_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 8] = [
        "%Y-%m-%d", "%d-%b-%Y", "%d-%m-%Y", "%d.%m.%Y",
        "%Y.%m.%d", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
