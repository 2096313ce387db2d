//! Default keyword tables for the scoring engine
//!
//! These are the production defaults for the target region. All of them are
//! configuration, not invariants - consumers can replace any table via
//! [`crate::config::ScoringConfig`].

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Location names, including the region name itself.
pub fn locations() -> Vec<String> {
    owned(&[
        // The region itself
        "sri lanka",
        // Major cities and towns
        "colombo",
        "kandy",
        "galle",
        "jaffna",
        "negombo",
        "anuradhapura",
        "polonnaruwa",
        "trincomalee",
        "batticaloa",
        "ratnapura",
        "kurunegala",
        "puttalam",
        "badulla",
        "bandarawela",
        "ella",
        "nuwara eliya",
        "matara",
        "hambantota",
        "chilaw",
        "kegalle",
        "monaragala",
        "vavuniya",
        "mannar",
        "ampara",
        "kalutara",
        "gampaha",
        "matale",
        // Landmarks and destinations
        "sigiriya",
        "dambulla",
        "bentota",
        "hikkaduwa",
        "unawatuna",
        "mirissa",
        "arugam bay",
        "yala",
        "udawalawe",
        "sinharaja",
        "horton plains",
        "adams peak",
        "pidurangala",
        "temple of tooth",
        "gangaramaya",
        "kelaniya",
        "kataragama",
        "sri pada",
    ])
}

/// Language and nationality markers.
pub fn languages() -> Vec<String> {
    owned(&["sinhala", "tamil", "sinhalese", "sri lankan", "ceylon"])
}

/// Cultural terms: festivals, greetings, cuisine.
pub fn cultural_terms() -> Vec<String> {
    owned(&[
        "ayubowan",
        "vanakkam",
        "poya",
        "vesak",
        "poson",
        "esala",
        "kathina",
        "avurudu",
        "sinhala new year",
        "tamil new year",
        "deepavali",
        "kiribath",
        "kottu",
        "hoppers",
        "string hoppers",
        "pol sambol",
        "parippu",
        "rice and curry",
        "watalappan",
        "kokis",
        "achcharu",
        "pittu",
        "thala guli",
        "aggala",
        "halapa",
        "kevum",
        "athirasa",
    ])
}

/// Universities and well-known schools.
pub fn institutions() -> Vec<String> {
    owned(&[
        "university of colombo",
        "university of peradeniya",
        "university of moratuwa",
        "university of kelaniya",
        "university of sri jayewardenepura",
        "university of ruhuna",
        "university of jaffna",
        "open university of sri lanka",
        "royal college",
        "st thomas college",
        "ladies college",
        "visakha vidyalaya",
        "nalanda college",
        "ananda college",
        "dharmaraja college",
        "trinity college",
    ])
}

/// National media outlets.
pub fn media_outlets() -> Vec<String> {
    owned(&[
        "daily mirror",
        "sunday times",
        "daily news",
        "lankadeepa",
        "divaina",
        "ada derana",
        "tv derana",
        "rupavahini",
        "sirasa tv",
        "hiru tv",
        "swarnavahini",
        "shakthi tv",
        "capital tv",
    ])
}

/// Positive quality markers.
pub fn positive_quality() -> Vec<String> {
    owned(&[
        "hd",
        "high definition",
        "1080p",
        "4k",
        "uhd",
        "official",
        "verified",
        "original",
        "exclusive",
        "interview",
        "documentary",
        "educational",
        "tutorial",
        "guide",
        "review",
        "analysis",
        "behind the scenes",
    ])
}

/// Negative quality markers.
pub fn negative_quality() -> Vec<String> {
    owned(&[
        "clickbait",
        "fake",
        "scam",
        "spam",
        "bot",
        "automated",
        "duplicate",
        "stolen",
        "copied",
        "repost",
        "mirror",
        "leaked",
        "pirated",
    ])
}

/// Spam detection regex patterns (compiled case-insensitively).
pub fn spam_patterns() -> Vec<String> {
    vec![
        r"\b(100%|guaranteed|instant|immediate|urgent|limited time)\b".to_string(),
        r"\b(click here|download now|act now|order now)\b".to_string(),
        r"\$[\d,]+\s*(dollars?|usd|earn|make|profit)".to_string(),
        r"\b(miracle|secret|revealed|exposed|shocking)\b".to_string(),
        r"!{3,}|\?{3,}|\.{4,}".to_string(),
        r"\b(watch.*before.*deleted|removed|banned)\b".to_string(),
    ]
}

/// Channel locale hints that grant the explicit region bonus.
pub fn region_hints() -> Vec<String> {
    owned(&["lk", "sri lanka", "sri_lanka"])
}
