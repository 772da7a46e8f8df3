//! URL phishing classifier.
//!
//! [`features::FeatureExtractor`] turns a URL into a fixed 30-feature
//! [`types::FeatureVector`] from its text, WHOIS and DNS lookups and the live
//! page, absorbing every network failure into fallback values.
//! [`model::NetworkModel`] maps that vector to a phishing/legitimate label and
//! [`routes`] serves both over HTTP.

pub mod config;
pub mod content;
pub mod error;
pub mod features;
pub mod fetcher;
pub mod intel;
pub mod lexical;
pub mod model;
pub mod routes;
pub mod types;
pub mod whois;
