use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    config::Config,
    content,
    fetcher::SafeFetcher,
    intel::{self, DnsProbe},
    lexical::{self, Target},
    types::{ContentFeatures, FeatureVector},
    whois::WhoisClient,
};

/// Runs every analyzer for one URL and merges their output.
///
/// Holds no mutable state; share it behind an `Arc` across requests.
pub struct FeatureExtractor {
    fetcher: SafeFetcher,
    whois: WhoisClient,
    dns: DnsProbe,
}

impl FeatureExtractor {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            fetcher: SafeFetcher::new(&config.fetch)?,
            whois: WhoisClient::new(&config.lookup),
            dns: DnsProbe::new(&config.lookup),
        })
    }

    /// Never fails: every unreachable lookup turns into its fallback value.
    pub async fn extract(&self, raw_url: &str) -> FeatureVector {
        let start = Instant::now();
        let target = Target::parse(raw_url);

        let lexical = lexical::analyze(&target);

        let created = self.whois.creation_date(&target.host).await;
        if created.is_err() {
            metrics::counter!("lookup_failures_total", "lookup" => "whois").increment(1);
        }
        let registration = intel::score_registration(&created, Utc::now());

        let page = match &target.url {
            Some(url) => self.fetcher.fetch(url).await,
            None => None,
        };
        let content = match &page {
            Some(page) => content::analyze(page, &target.host),
            None => ContentFeatures::UNREACHABLE,
        };

        let resolved = self.dns.resolve(&target.host).await;
        if resolved.is_err() {
            metrics::counter!("lookup_failures_total", "lookup" => "dns").increment(1);
        }
        let dns_record = intel::score_dns(&resolved);

        let features = FeatureVector::assemble(lexical, registration, content, dns_record);

        let elapsed = start.elapsed().as_millis() as f64;
        metrics::histogram!("extraction_duration_ms").record(elapsed);
        info!(
            "Extracted features for {} in {:.0}ms (page: {}, whois: {}, dns: {})",
            raw_url,
            elapsed,
            page.is_some(),
            created.is_ok(),
            resolved.is_ok()
        );
        debug!("Features for {}: {:?}", raw_url, features);

        features
    }
}
