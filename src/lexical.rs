use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::types::{LexicalFeatures, TriState};

/// URLs shorter than this many characters score legitimate.
pub const URL_LENGTH_THRESHOLD: usize = 54;

/// `//` found at or after this character index flags a redirect.
const DOUBLE_SLASH_SEARCH_START: usize = 8;

static DOTTED_QUAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").expect("valid dotted-quad pattern"));

static SHORTENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(bit\.ly|tinyurl|goo\.gl|ow\.ly|t\.co)").expect("valid shortener pattern")
});

/// A URL parsed once for one extraction.
#[derive(Debug, Clone)]
pub struct Target {
    pub raw: String,
    pub url: Option<Url>,
    pub scheme: String,
    pub host: String,
}

impl Target {
    /// Never fails. A string that does not parse keeps an empty host and
    /// scheme, so every host-based lookup falls back.
    pub fn parse(raw: &str) -> Self {
        let url = Url::parse(raw).ok();
        let scheme = url.as_ref().map(|u| u.scheme().to_string()).unwrap_or_default();
        let host = url
            .as_ref()
            .and_then(|u| u.host_str())
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_lowercase())
            .unwrap_or_default();

        Self {
            raw: raw.to_string(),
            url,
            scheme,
            host,
        }
    }
}

pub fn analyze(target: &Target) -> LexicalFeatures {
    let raw = target.raw.as_str();
    let host = target.host.as_str();

    LexicalFeatures {
        having_ip_address: TriState::suspicious_if(DOTTED_QUAD.is_match(host)),
        url_length: TriState::legitimate_if(raw.chars().count() < URL_LENGTH_THRESHOLD),
        shortening_service: TriState::suspicious_if(SHORTENER.is_match(&raw.to_lowercase())),
        having_at_symbol: TriState::suspicious_if(raw.contains('@')),
        double_slash_redirecting: TriState::suspicious_if(has_late_double_slash(raw)),
        prefix_suffix: TriState::suspicious_if(host.contains('-')),
        having_sub_domain: TriState::suspicious_if(host.matches('.').count() > 1),
        ssl_final_state: TriState::legitimate_if(target.scheme == "https"),
        port: TriState::suspicious_if(explicit_port(raw).is_some()),
        https_token: TriState::suspicious_if(host.contains("https")),
        abnormal_url: TriState::suspicious_if(!raw.contains(host)),
    }
}

fn has_late_double_slash(raw: &str) -> bool {
    match raw.char_indices().nth(DOUBLE_SLASH_SEARCH_START) {
        Some((offset, _)) => raw[offset..].contains("//"),
        None => false,
    }
}

/// Port text written in the authority, including default ports the URL
/// parser would normalize away.
fn explicit_port(raw: &str) -> Option<&str> {
    let (_, rest) = raw.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    let port = if host_port.starts_with('[') {
        host_port.split_once(']')?.1.strip_prefix(':')?
    } else {
        host_port.rsplit_once(':')?.1
    };

    (!port.is_empty()).then_some(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(raw: &str) -> LexicalFeatures {
        analyze(&Target::parse(raw))
    }

    #[test]
    fn test_clean_https_url() {
        let f = features("https://example.com");
        assert_eq!(f.having_ip_address, TriState::Legitimate);
        assert_eq!(f.url_length, TriState::Legitimate);
        assert_eq!(f.shortening_service, TriState::Legitimate);
        assert_eq!(f.having_at_symbol, TriState::Legitimate);
        assert_eq!(f.double_slash_redirecting, TriState::Legitimate);
        assert_eq!(f.prefix_suffix, TriState::Legitimate);
        assert_eq!(f.having_sub_domain, TriState::Legitimate);
        assert_eq!(f.ssl_final_state, TriState::Legitimate);
        assert_eq!(f.port, TriState::Legitimate);
        assert_eq!(f.https_token, TriState::Legitimate);
        assert_eq!(f.abnormal_url, TriState::Legitimate);
    }

    #[test]
    fn test_ip_literal_host() {
        let f = features("http://192.168.1.1/login");
        assert_eq!(f.having_ip_address, TriState::Suspicious);
        assert_eq!(f.ssl_final_state, TriState::Suspicious);
        assert_eq!(f.having_sub_domain, TriState::Suspicious);
    }

    #[test]
    fn test_length_threshold() {
        let short = format!("https://a.io/{}", "x".repeat(URL_LENGTH_THRESHOLD - 14));
        assert_eq!(short.chars().count(), URL_LENGTH_THRESHOLD - 1);
        assert_eq!(features(&short).url_length, TriState::Legitimate);

        let long = format!("{short}x");
        assert_eq!(features(&long).url_length, TriState::Suspicious);
    }

    #[test]
    fn test_shortener_is_case_insensitive() {
        assert_eq!(features("https://bit.ly/3xYz").shortening_service, TriState::Suspicious);
        assert_eq!(features("https://TinyURL.com/abc").shortening_service, TriState::Suspicious);
    }

    #[test]
    fn test_at_symbol() {
        let f = features("http://user@evil.example/paypal");
        assert_eq!(f.having_at_symbol, TriState::Suspicious);
    }

    #[test]
    fn test_double_slash_after_scheme() {
        assert_eq!(
            features("https://example.com/path").double_slash_redirecting,
            TriState::Legitimate
        );
        assert_eq!(
            features("https://example.com//evil.example").double_slash_redirecting,
            TriState::Suspicious
        );
        assert_eq!(
            features("http://example.com/?next=http://evil.example").double_slash_redirecting,
            TriState::Suspicious
        );
    }

    #[test]
    fn test_hyphen_only_counts_in_host() {
        assert_eq!(features("https://pay-pal.example").prefix_suffix, TriState::Suspicious);
        assert_eq!(features("https://example.com/a-b").prefix_suffix, TriState::Legitimate);
    }

    #[test]
    fn test_subdomain_depth() {
        assert_eq!(features("https://example.com").having_sub_domain, TriState::Legitimate);
        assert_eq!(features("https://www.example.com").having_sub_domain, TriState::Suspicious);
    }

    #[test]
    fn test_explicit_port_including_default() {
        assert_eq!(features("http://example.com:8080/").port, TriState::Suspicious);
        assert_eq!(features("https://example.com:443/").port, TriState::Suspicious);
        assert_eq!(features("http://[::1]:8080/").port, TriState::Suspicious);
        assert_eq!(features("http://user:pw@example.com/").port, TriState::Legitimate);
        assert_eq!(features("http://example.com/a:b").port, TriState::Legitimate);
    }

    #[test]
    fn test_https_token_in_host() {
        assert_eq!(features("http://https-secure.example").https_token, TriState::Suspicious);
        assert_eq!(features("https://example.com/https").https_token, TriState::Legitimate);
    }

    #[test]
    fn test_abnormal_url_when_host_not_in_text() {
        assert_eq!(features("HTTP://EXAMPLE.COM/").abnormal_url, TriState::Suspicious);
    }

    #[test]
    fn test_unparseable_input_still_scores() {
        let target = Target::parse("not a url");
        assert!(target.host.is_empty());
        let f = analyze(&target);
        assert_eq!(f.ssl_final_state, TriState::Suspicious);
        assert_eq!(f.having_ip_address, TriState::Legitimate);
    }
}
