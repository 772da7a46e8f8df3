use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::fetcher::FetchedPage;
use crate::types::{ContentFeatures, TriState};

/// Share of off-host media above which `Request_URL` is suspicious.
pub const REQUEST_URL_THRESHOLD: f64 = 0.3;
/// Share of off-site anchors above which `URL_of_Anchor` is suspicious.
pub const ANCHOR_THRESHOLD: f64 = 0.5;
/// Share of off-host meta/script/link sources above which `Links_in_tags` is suspicious.
pub const LINKS_IN_TAGS_THRESHOLD: f64 = 0.5;

const MOUSEOVER_PATTERN: &str = "onmouseover";
const RIGHT_CLICK_PATTERN: &str = "event.button==2";
const POPUP_PATTERN: &str = "window.open";
const MAILTO_PREFIX: &str = "mailto:";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static MEDIA: Lazy<Selector> = Lazy::new(|| selector("img, audio, embed, iframe"));
static ANCHORS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static TAG_LINKS: Lazy<Selector> = Lazy::new(|| selector("meta, script, link"));
static FORMS: Lazy<Selector> = Lazy::new(|| selector("form"));
static IFRAMES: Lazy<Selector> = Lazy::new(|| selector("iframe"));

pub fn analyze(page: &FetchedPage, host: &str) -> ContentFeatures {
    let document = Html::parse_document(&page.body);
    let text = page.body.to_lowercase();
    let actions = form_actions(&document);

    ContentFeatures {
        request_url: TriState::suspicious_if(
            off_host_source_ratio(&document, &MEDIA, host) > REQUEST_URL_THRESHOLD,
        ),
        url_of_anchor: TriState::suspicious_if(
            unsafe_anchor_ratio(&document, host) > ANCHOR_THRESHOLD,
        ),
        links_in_tags: TriState::suspicious_if(
            off_host_source_ratio(&document, &TAG_LINKS, host) > LINKS_IN_TAGS_THRESHOLD,
        ),
        sfh: TriState::suspicious_if(
            actions.iter().any(|action| !action.is_empty() && !action.contains(host)),
        ),
        submitting_to_email: TriState::suspicious_if(
            actions.iter().any(|action| action.starts_with(MAILTO_PREFIX)),
        ),
        redirect: TriState::suspicious_if(!page.history.is_empty()),
        on_mouseover: TriState::suspicious_if(text.contains(MOUSEOVER_PATTERN)),
        right_click: TriState::suspicious_if(text.contains(RIGHT_CLICK_PATTERN)),
        popup_window: TriState::suspicious_if(text.contains(POPUP_PATTERN)),
        iframe: TriState::suspicious_if(document.select(&IFRAMES).next().is_some()),
    }
}

/// Empty selections divide by one, so they score legitimate.
fn ratio(matching: usize, total: usize) -> f64 {
    matching as f64 / total.max(1) as f64
}

/// Off-host `src` values over every selected element, with or without `src`.
fn off_host_source_ratio(document: &Html, selector: &Selector, host: &str) -> f64 {
    let elements: Vec<ElementRef> = document.select(selector).collect();
    let off_host = elements
        .iter()
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| !src.is_empty() && !src.contains(host))
        .count();

    ratio(off_host, elements.len())
}

fn unsafe_anchor_ratio(document: &Html, host: &str) -> f64 {
    let hrefs: Vec<&str> = document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .collect();
    let unsafe_count = hrefs
        .iter()
        .filter(|href| !href.contains(host) && !href.starts_with('/'))
        .count();

    ratio(unsafe_count, hrefs.len())
}

fn form_actions(document: &Html) -> Vec<&str> {
    document
        .select(&FORMS)
        .filter_map(|form| form.value().attr("action"))
        .collect()
}
