//! Field extraction from Seedfinder pages
//!
//! Everything here is deterministic: values the page does not carry are
//! left empty instead of being made up.

use crate::db::models::{GrowingDifficulty, NewStrain, StrainType};
use regex_lite::Regex;
use std::sync::OnceLock;

/// Per-set cap on keyword matches
const MAX_KEYWORDS: usize = 3;

const EFFECT_WORDS: &[&str] = &[
    "creative", "energized", "focused", "euphoric", "giggly",
    "sleepy", "relaxed", "tingly", "happy", "uplifted",
];

const FLAVOR_WORDS: &[&str] = &[
    "citrus", "berry", "pine", "floral", "earthy", "spicy",
    "sweet", "diesel", "fruity", "lemon", "mint",
];

const MEDICAL_WORDS: &[&str] = &[
    "stress", "anxiety", "pain", "insomnia", "depression",
    "nausea", "appetite", "inflammation",
];

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]*/strain-info/[^"]+)""#).expect("static regex"))
}

/// Remove markup and surrounding whitespace
pub fn strip_tags(fragment: &str) -> String {
    tag_re().replace_all(fragment, "").trim().to_string()
}

/// "northern-lights" -> "Northern Lights"
fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Name and breeder from `/strain-info/<name>/<breeder>/`
pub fn name_and_breeder_from_url(url: &str) -> Option<(String, String)> {
    let (_, path) = url.split_once("/strain-info/")?;
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let name = parts.next()?;
    let breeder = parts.next()?;
    Some((title_case_slug(name), title_case_slug(breeder)))
}

/// Both indica and sativa mentioned, or "hybrid", means hybrid
pub fn classify_type(html_lower: &str) -> StrainType {
    let indica = html_lower.contains("indica");
    let sativa = html_lower.contains("sativa");
    if (indica && sativa) || html_lower.contains("hybrid") {
        StrainType::Hybrid
    } else if indica {
        StrainType::Indica
    } else if sativa {
        StrainType::Sativa
    } else {
        StrainType::Hybrid
    }
}

pub fn classify_difficulty(html_lower: &str) -> GrowingDifficulty {
    if html_lower.contains("easy") || html_lower.contains("beginner") {
        GrowingDifficulty::Easy
    } else if ["difficult", "expert", "advanced"].iter().any(|w| html_lower.contains(w)) {
        GrowingDifficulty::Difficult
    } else {
        GrowingDifficulty::Moderate
    }
}

/// Vocabulary words present on the page, in vocabulary order
fn scan_keywords(html_lower: &str, vocabulary: &[&str]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|word| html_lower.contains(*word))
        .take(MAX_KEYWORDS)
        .map(|word| word.to_string())
        .collect()
}

/// Value cell of a `<td>Label</td><td>value</td>` row, for the first label found
pub fn extract_field(html: &str, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| {
        let pattern = format!(
            r"(?is)<td[^>]*>\s*{}[^<]*</td>\s*<td[^>]*>(.*?)</td>",
            regex_lite::escape(label)
        );
        let re = Regex::new(&pattern).ok()?;
        let value = strip_tags(re.captures(html)?.get(1)?.as_str());
        (!value.is_empty()).then_some(value)
    })
}

pub fn extract_description(html: &str) -> Option<String> {
    const OPEN: &str = r#"<div class="description">"#;
    let start = html.find(OPEN)? + OPEN.len();
    let end = html[start..].find("</div>")? + start;
    let text = strip_tags(&html[start..end]);
    (!text.is_empty()).then_some(text)
}

/// Strain page links found on a search results page, absolute and de-duplicated
pub fn extract_strain_urls(html: &str, base_url: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let mut urls: Vec<String> = Vec::new();

    for cap in href_re().captures_iter(html) {
        let href = &cap[1];
        let url = if href.starts_with('/') {
            format!("{}{}", base, href)
        } else {
            href.to_string()
        };

        if url.contains('#') || url.contains('?') {
            continue;
        }
        if !urls.contains(&url) {
            urls.push(url);
        }
    }

    urls
}

/// Build a strain from a fetched page
pub fn parse_strain_page(html: &str, url: &str) -> NewStrain {
    let lower = html.to_lowercase();
    let field = |labels: &[&str]| extract_field(html, labels).unwrap_or_default();

    let (name, breeder) = name_and_breeder_from_url(url)
        .unwrap_or_else(|| ("Unknown".to_string(), field(&["Breeder"])));

    NewStrain {
        name,
        strain_type: classify_type(&lower),
        genetics: field(&["Genetics", "Lineage", "Parents"]),
        breeder,
        flowering_time: field(&["Flowering Time", "Flowering"]),
        yield_indoor: field(&["Indoor Yield", "Yield Indoor"]),
        yield_outdoor: field(&["Outdoor Yield", "Yield Outdoor"]),
        height_indoor: field(&["Indoor Height", "Height Indoor"]),
        height_outdoor: field(&["Outdoor Height", "Height Outdoor"]),
        thc_content: field(&["THC"]),
        cbd_content: field(&["CBD"]),
        description: extract_description(html).unwrap_or_default(),
        effects: scan_keywords(&lower, EFFECT_WORDS),
        flavors: scan_keywords(&lower, FLAVOR_WORDS),
        medical_uses: scan_keywords(&lower, MEDICAL_WORDS),
        growing_difficulty: Some(classify_difficulty(&lower)),
        seedfinder_url: Some(url.to_string()),
    }
}
