//! Category Normalizer
//!
//! Maps free-form category text onto a closed set of resale categories.
//!
//! # Resolution order
//! 1. Exact member of [`CATEGORIES`] (after lower-casing and `_` joining)
//! 2. Partial containment against the set, on whole `_`-separated segments
//!    (plus inputs of 3+ characters inside a longer member name)
//! 3. Alias table (exact, then as whole segments of the input)
//! 4. `general`

/// Fallback category
pub const GENERAL: &str = "general";

/// Closed category set
pub const CATEGORIES: &[&str] = &[
    "trading_cards",
    "video_games",
    "electronics",
    "collectibles",
    "comics",
    "books",
    "music",
    "movies",
    "toys",
    "sports_memorabilia",
    "sneakers",
    "clothing",
    "jewelry",
    "watches",
    "coins",
    "stamps",
    "antiques",
    "art",
    "home_goods",
    "tools",
    GENERAL,
];

const CATEGORY_ALIASES: &[(&str, &str)] = &[
    ("cards", "trading_cards"),
    ("pokemon", "trading_cards"),
    ("tcg", "trading_cards"),
    ("games", "video_games"),
    ("gaming", "video_games"),
    ("console", "video_games"),
    ("vinyl", "music"),
    ("records", "music"),
    ("cd", "music"),
    ("dvd", "movies"),
    ("blu-ray", "movies"),
    ("bluray", "movies"),
    ("film", "movies"),
    ("shoes", "sneakers"),
    ("footwear", "sneakers"),
    ("apparel", "clothing"),
    ("fashion", "clothing"),
    ("memorabilia", "sports_memorabilia"),
    ("autograph", "sports_memorabilia"),
    ("figures", "toys"),
    ("lego", "toys"),
    ("action_figure", "toys"),
    ("numismatic", "coins"),
    ("currency", "coins"),
    ("philately", "stamps"),
    ("vintage", "antiques"),
    ("painting", "art"),
    ("prints", "art"),
    ("kitchen", "home_goods"),
    ("furniture", "home_goods"),
    ("household", "home_goods"),
    ("hardware", "tools"),
    ("computers", "electronics"),
    ("phones", "electronics"),
    ("camera", "electronics"),
    ("novel", "books"),
    ("magazine", "books"),
    ("manga", "comics"),
    ("graphic_novel", "comics"),
];

/// Shortest input allowed to match as a substring of a category name
const MIN_PARTIAL_LEN: usize = 3;

/// True if the segments of `needle` appear consecutively among those of `haystack`
fn contains_segments(haystack: &str, needle: &str) -> bool {
    let haystack: Vec<&str> = haystack.split('_').collect();
    let needle: Vec<&str> = needle.split('_').collect();
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize a category; never fails
pub fn normalize_category(raw: Option<&str>) -> &'static str {
    let key = match raw {
        Some(raw) => canonical_key(raw),
        None => return GENERAL,
    };
    if key.is_empty() {
        return GENERAL;
    }

    if let Some(category) = CATEGORIES.iter().copied().find(|c| *c == key) {
        return category;
    }

    let partial = CATEGORIES
        .iter()
        .copied()
        .filter(|c| *c != GENERAL)
        .find(|c| {
            contains_segments(&key, c)
                || contains_segments(c, &key)
                || (key.len() >= MIN_PARTIAL_LEN && c.len() > key.len() && c.contains(key.as_str()))
        });
    if let Some(category) = partial {
        return category;
    }

    if let Some((_, category)) = CATEGORY_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return *category;
    }
    if let Some((_, category)) = CATEGORY_ALIASES.iter().find(|(alias, _)| contains_segments(&key, alias)) {
        return *category;
    }

    GENERAL
}
