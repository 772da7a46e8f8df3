use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Column order the trained classifier was fitted on.
pub const FEATURE_COLUMNS: [&str; 30] = [
    "having_IP_Address",
    "URL_Length",
    "Shortining_Service",
    "having_At_Symbol",
    "double_slash_redirecting",
    "Prefix_Suffix",
    "having_Sub_Domain",
    "SSLfinal_State",
    "Domain_registeration_length",
    "Favicon",
    "port",
    "HTTPS_token",
    "Request_URL",
    "URL_of_Anchor",
    "Links_in_tags",
    "SFH",
    "Submitting_to_email",
    "Abnormal_URL",
    "Redirect",
    "on_mouseover",
    "RightClick",
    "popUpWidnow",
    "Iframe",
    "age_of_domain",
    "DNSRecord",
    "web_traffic",
    "Page_Rank",
    "Google_Index",
    "Links_pointing_to_page",
    "Statistical_report",
];

/// Value of a single feature, using the training data's -1/0/1 convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum TriState {
    Suspicious = -1,
    Neutral = 0,
    Legitimate = 1,
}

impl TriState {
    /// `Suspicious` when the condition holds, `Legitimate` otherwise.
    pub fn suspicious_if(condition: bool) -> Self {
        if condition {
            TriState::Suspicious
        } else {
            TriState::Legitimate
        }
    }

    pub fn legitimate_if(condition: bool) -> Self {
        Self::suspicious_if(!condition)
    }

    pub fn value(self) -> i8 {
        self as i8
    }
}

impl Serialize for TriState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Features derived from the URL text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalFeatures {
    pub having_ip_address: TriState,
    pub url_length: TriState,
    pub shortening_service: TriState,
    pub having_at_symbol: TriState,
    pub double_slash_redirecting: TriState,
    pub prefix_suffix: TriState,
    pub having_sub_domain: TriState,
    pub ssl_final_state: TriState,
    pub port: TriState,
    pub https_token: TriState,
    pub abnormal_url: TriState,
}

/// Both slots are derived from the same WHOIS creation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationFeatures {
    pub domain_registration_length: TriState,
    pub age_of_domain: TriState,
}

/// Features that need a fetched page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFeatures {
    pub request_url: TriState,
    pub url_of_anchor: TriState,
    pub links_in_tags: TriState,
    pub sfh: TriState,
    pub submitting_to_email: TriState,
    pub redirect: TriState,
    pub on_mouseover: TriState,
    pub right_click: TriState,
    pub popup_window: TriState,
    pub iframe: TriState,
}

impl ContentFeatures {
    /// Fallback when the page could not be fetched: could not verify, assume hostile.
    pub const UNREACHABLE: ContentFeatures = ContentFeatures {
        request_url: TriState::Suspicious,
        url_of_anchor: TriState::Suspicious,
        links_in_tags: TriState::Suspicious,
        sfh: TriState::Suspicious,
        submitting_to_email: TriState::Suspicious,
        redirect: TriState::Suspicious,
        on_mouseover: TriState::Suspicious,
        right_click: TriState::Suspicious,
        popup_window: TriState::Suspicious,
        iframe: TriState::Suspicious,
    };
}

/// Features the training data carried but which are never measured live.
///
/// Known limitation: the classifier was fitted on real favicon, traffic,
/// page-rank, index, backlink and report signals. These fixed values keep the
/// column layout compatible; they carry no information about the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticDefaults {
    pub favicon: TriState,
    pub web_traffic: TriState,
    pub page_rank: TriState,
    pub google_index: TriState,
    pub links_pointing_to_page: TriState,
    pub statistical_report: TriState,
}

impl StaticDefaults {
    pub const VALUES: StaticDefaults = StaticDefaults {
        favicon: TriState::Legitimate,
        web_traffic: TriState::Neutral,
        page_rank: TriState::Neutral,
        google_index: TriState::Legitimate,
        links_pointing_to_page: TriState::Neutral,
        statistical_report: TriState::Legitimate,
    };
}

/// The full 30-feature record handed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureVector {
    #[serde(rename = "having_IP_Address")]
    pub having_ip_address: TriState,
    #[serde(rename = "URL_Length")]
    pub url_length: TriState,
    #[serde(rename = "Shortining_Service")]
    pub shortening_service: TriState,
    #[serde(rename = "having_At_Symbol")]
    pub having_at_symbol: TriState,
    #[serde(rename = "double_slash_redirecting")]
    pub double_slash_redirecting: TriState,
    #[serde(rename = "Prefix_Suffix")]
    pub prefix_suffix: TriState,
    #[serde(rename = "having_Sub_Domain")]
    pub having_sub_domain: TriState,
    #[serde(rename = "SSLfinal_State")]
    pub ssl_final_state: TriState,
    #[serde(rename = "Domain_registeration_length")]
    pub domain_registration_length: TriState,
    #[serde(rename = "Favicon")]
    pub favicon: TriState,
    #[serde(rename = "port")]
    pub port: TriState,
    #[serde(rename = "HTTPS_token")]
    pub https_token: TriState,
    #[serde(rename = "Request_URL")]
    pub request_url: TriState,
    #[serde(rename = "URL_of_Anchor")]
    pub url_of_anchor: TriState,
    #[serde(rename = "Links_in_tags")]
    pub links_in_tags: TriState,
    #[serde(rename = "SFH")]
    pub sfh: TriState,
    #[serde(rename = "Submitting_to_email")]
    pub submitting_to_email: TriState,
    #[serde(rename = "Abnormal_URL")]
    pub abnormal_url: TriState,
    #[serde(rename = "Redirect")]
    pub redirect: TriState,
    #[serde(rename = "on_mouseover")]
    pub on_mouseover: TriState,
    #[serde(rename = "RightClick")]
    pub right_click: TriState,
    #[serde(rename = "popUpWidnow")]
    pub popup_window: TriState,
    #[serde(rename = "Iframe")]
    pub iframe: TriState,
    #[serde(rename = "age_of_domain")]
    pub age_of_domain: TriState,
    #[serde(rename = "DNSRecord")]
    pub dns_record: TriState,
    #[serde(rename = "web_traffic")]
    pub web_traffic: TriState,
    #[serde(rename = "Page_Rank")]
    pub page_rank: TriState,
    #[serde(rename = "Google_Index")]
    pub google_index: TriState,
    #[serde(rename = "Links_pointing_to_page")]
    pub links_pointing_to_page: TriState,
    #[serde(rename = "Statistical_report")]
    pub statistical_report: TriState,
}

impl FeatureVector {
    pub fn assemble(
        lexical: LexicalFeatures,
        registration: RegistrationFeatures,
        content: ContentFeatures,
        dns_record: TriState,
    ) -> Self {
        let defaults = StaticDefaults::VALUES;

        Self {
            having_ip_address: lexical.having_ip_address,
            url_length: lexical.url_length,
            shortening_service: lexical.shortening_service,
            having_at_symbol: lexical.having_at_symbol,
            double_slash_redirecting: lexical.double_slash_redirecting,
            prefix_suffix: lexical.prefix_suffix,
            having_sub_domain: lexical.having_sub_domain,
            ssl_final_state: lexical.ssl_final_state,
            domain_registration_length: registration.domain_registration_length,
            favicon: defaults.favicon,
            port: lexical.port,
            https_token: lexical.https_token,
            request_url: content.request_url,
            url_of_anchor: content.url_of_anchor,
            links_in_tags: content.links_in_tags,
            sfh: content.sfh,
            submitting_to_email: content.submitting_to_email,
            abnormal_url: lexical.abnormal_url,
            redirect: content.redirect,
            on_mouseover: content.on_mouseover,
            right_click: content.right_click,
            popup_window: content.popup_window,
            iframe: content.iframe,
            age_of_domain: registration.age_of_domain,
            dns_record,
            web_traffic: defaults.web_traffic,
            page_rank: defaults.page_rank,
            google_index: defaults.google_index,
            links_pointing_to_page: defaults.links_pointing_to_page,
            statistical_report: defaults.statistical_report,
        }
    }

    /// Name/value pairs in `FEATURE_COLUMNS` order.
    pub fn entries(&self) -> [(&'static str, TriState); 30] {
        [
            (FEATURE_COLUMNS[0], self.having_ip_address),
            (FEATURE_COLUMNS[1], self.url_length),
            (FEATURE_COLUMNS[2], self.shortening_service),
            (FEATURE_COLUMNS[3], self.having_at_symbol),
            (FEATURE_COLUMNS[4], self.double_slash_redirecting),
            (FEATURE_COLUMNS[5], self.prefix_suffix),
            (FEATURE_COLUMNS[6], self.having_sub_domain),
            (FEATURE_COLUMNS[7], self.ssl_final_state),
            (FEATURE_COLUMNS[8], self.domain_registration_length),
            (FEATURE_COLUMNS[9], self.favicon),
            (FEATURE_COLUMNS[10], self.port),
            (FEATURE_COLUMNS[11], self.https_token),
            (FEATURE_COLUMNS[12], self.request_url),
            (FEATURE_COLUMNS[13], self.url_of_anchor),
            (FEATURE_COLUMNS[14], self.links_in_tags),
            (FEATURE_COLUMNS[15], self.sfh),
            (FEATURE_COLUMNS[16], self.submitting_to_email),
            (FEATURE_COLUMNS[17], self.abnormal_url),
            (FEATURE_COLUMNS[18], self.redirect),
            (FEATURE_COLUMNS[19], self.on_mouseover),
            (FEATURE_COLUMNS[20], self.right_click),
            (FEATURE_COLUMNS[21], self.popup_window),
            (FEATURE_COLUMNS[22], self.iframe),
            (FEATURE_COLUMNS[23], self.age_of_domain),
            (FEATURE_COLUMNS[24], self.dns_record),
            (FEATURE_COLUMNS[25], self.web_traffic),
            (FEATURE_COLUMNS[26], self.page_rank),
            (FEATURE_COLUMNS[27], self.google_index),
            (FEATURE_COLUMNS[28], self.links_pointing_to_page),
            (FEATURE_COLUMNS[29], self.statistical_report),
        ]
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.entries()
            .iter()
            .map(|(name, value)| (name.to_string(), f64::from(value.value())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Phishing,
    Legitimate,
}

impl Label {
    /// Class `0` is phishing; every other class is legitimate.
    pub fn from_class(class: i64) -> Self {
        if class == 0 {
            Label::Phishing
        } else {
            Label::Legitimate
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Phishing => f.write_str("phishing"),
            Label::Legitimate => f.write_str("legitimate"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub url: String,
    pub label: Label,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturesResponse {
    pub url: String,
    pub features: FeatureVector,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(value: TriState) -> FeatureVector {
        let lexical = LexicalFeatures {
            having_ip_address: value,
            url_length: value,
            shortening_service: value,
            having_at_symbol: value,
            double_slash_redirecting: value,
            prefix_suffix: value,
            having_sub_domain: value,
            ssl_final_state: value,
            port: value,
            https_token: value,
            abnormal_url: value,
        };
        let registration = RegistrationFeatures {
            domain_registration_length: value,
            age_of_domain: value,
        };
        FeatureVector::assemble(lexical, registration, ContentFeatures::UNREACHABLE, value)
    }

    #[test]
    fn test_entries_follow_column_order() {
        let names: Vec<&str> = uniform(TriState::Legitimate)
            .entries()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(names, FEATURE_COLUMNS.to_vec());
    }

    #[test]
    fn test_serializes_all_thirty_keys() {
        let json = serde_json::to_value(uniform(TriState::Legitimate)).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 30);
        for name in FEATURE_COLUMNS {
            let value = object[name].as_i64().unwrap();
            assert!((-1..=1).contains(&value), "{name} = {value}");
        }
    }

    #[test]
    fn test_static_defaults_are_fixed() {
        let features = uniform(TriState::Suspicious);
        assert_eq!(features.favicon, TriState::Legitimate);
        assert_eq!(features.web_traffic, TriState::Neutral);
        assert_eq!(features.page_rank, TriState::Neutral);
        assert_eq!(features.google_index, TriState::Legitimate);
        assert_eq!(features.links_pointing_to_page, TriState::Neutral);
        assert_eq!(features.statistical_report, TriState::Legitimate);
    }

    #[test]
    fn test_label_from_class() {
        assert_eq!(Label::from_class(0), Label::Phishing);
        assert_eq!(Label::from_class(1), Label::Legitimate);
        assert_eq!(Label::from_class(-1), Label::Legitimate);
        assert_eq!(serde_json::to_string(&Label::Phishing).unwrap(), "\"phishing\"");
    }
}
