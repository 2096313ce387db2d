//! Relevance, quality, engagement and spam scoring
//!
//! The engine is a pure function from raw video metadata to a
//! [`ScoredVideo`]: given the same item and the same [`ScoreContext`], it
//! always produces identical output. Keyword tables, spam patterns and the
//! relevance threshold come from [`ScoringConfig`] and are compiled once at
//! engine construction.
//!
//! Keyword matching runs on a lowercased corpus (title, description, channel
//! name and tags). The spam heuristics additionally keep a case-preserving
//! corpus, because the uppercase-ratio check is meaningless after lowercasing.

pub mod keywords;

use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::types::{ContentAnalysis, ScoredVideo, VideoDetails};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

/// Per-call context the engine needs beyond the raw item.
///
/// Everything here is supplied by the caller so that scoring stays
/// deterministic and side-effect free.
#[derive(Clone, Debug)]
pub struct ScoreContext {
    /// The query that surfaced the item
    pub search_query: String,
    /// Prefix for building the canonical watch URL (item id is appended)
    pub watch_url_base: String,
    /// Timestamp to stamp on the scored item
    pub now: DateTime<Utc>,
}

/// Compiled scoring engine
#[derive(Debug)]
pub struct ScoringEngine {
    relevance_threshold: f64,
    locations: Vec<String>,
    languages: Vec<String>,
    cultural_terms: Vec<String>,
    institutions: Vec<String>,
    media_outlets: Vec<String>,
    positive_quality: Vec<String>,
    negative_quality: Vec<String>,
    region_hints: Vec<String>,
    spam_patterns: Vec<Regex>,
}

impl ScoringEngine {
    /// Compile an engine from configuration.
    ///
    /// Fails with a configuration error when a spam pattern does not compile.
    pub fn new(config: &ScoringConfig) -> Result<Self> {
        let spam_patterns = config
            .spam_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::Config {
                        message: format!("invalid spam pattern '{}': {}", pattern, e),
                        key: Some("scoring.spam_patterns".to_string()),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            relevance_threshold: config.relevance_threshold,
            locations: lowercase_all(&config.locations),
            languages: lowercase_all(&config.languages),
            cultural_terms: lowercase_all(&config.cultural_terms),
            institutions: lowercase_all(&config.institutions),
            media_outlets: lowercase_all(&config.media_outlets),
            positive_quality: lowercase_all(&config.positive_quality),
            negative_quality: lowercase_all(&config.negative_quality),
            region_hints: lowercase_all(&config.region_hints),
            spam_patterns,
        })
    }

    /// Score one item. Pure: no I/O, no clock access, no mutation of inputs.
    pub fn score(&self, details: &VideoDetails, ctx: &ScoreContext) -> ScoredVideo {
        let mut tags: Vec<String> = details.tags.iter().map(|t| t.to_lowercase()).collect();
        // Tag order must not influence any score
        tags.sort();

        let corpus_raw = format!(
            "{} {} {} {}",
            details.title,
            details.description,
            details.channel_title,
            details.tags.join(" ")
        );
        let corpus = format!(
            "{} {} {} {}",
            details.title.to_lowercase(),
            details.description.to_lowercase(),
            details.channel_title.to_lowercase(),
            tags.join(" ")
        );

        let relevance_score = self.relevance_score(&corpus, details);
        let quality_score = self.quality_score(&corpus, details);
        let engagement_score = engagement_score(details);
        let spam_score = self.spam_score(&corpus, &corpus_raw);

        let is_relevant = relevance_score >= self.relevance_threshold;
        let composite_score = round3(
            0.4 * relevance_score
                + 0.3 * quality_score
                + 0.2 * engagement_score
                + 0.1 * (1.0 - spam_score),
        );

        let analysis = ContentAnalysis {
            matched_locations: matched_terms(&corpus, &self.locations),
            matched_cultural_terms: matched_terms(&corpus, &self.cultural_terms),
            detected_language: self.detect_language(&corpus),
            content_category: categorize(&corpus),
        };

        ScoredVideo {
            details: details.clone(),
            relevance_score: round3(relevance_score),
            quality_score: round3(quality_score),
            engagement_score: round3(engagement_score),
            spam_score: round3(spam_score),
            composite_score,
            is_relevant,
            analysis,
            search_query: ctx.search_query.clone(),
            video_url: format!("{}{}", ctx.watch_url_base, details.video_id),
            extracted_at: ctx.now,
        }
    }

    /// Topical relevance: capped keyword sub-scores plus the channel-locale
    /// bonus, clipped to [0, 1].
    fn relevance_score(&self, corpus: &str, details: &VideoDetails) -> f64 {
        let location_matches = count_matches(corpus, &self.locations) as f64;
        let language_matches = count_matches(corpus, &self.languages) as f64;
        let cultural_matches = count_matches(corpus, &self.cultural_terms) as f64;
        let institutional_matches = (count_matches(corpus, &self.institutions)
            + count_matches(corpus, &self.media_outlets)) as f64;

        let mut score = (location_matches * 0.2).min(0.4)
            + (language_matches * 0.15).min(0.3)
            + (cultural_matches * 0.1).min(0.2)
            + (institutional_matches * 0.05).min(0.1);

        if let Some(country) = &details.channel_country {
            let country = country.to_lowercase();
            if self.region_hints.iter().any(|hint| *hint == country) {
                score += 0.2;
            }
        }

        score.min(1.0)
    }

    /// Content quality: 0.5 baseline, keyword and metadata adjustments,
    /// clipped to [0, 1].
    fn quality_score(&self, corpus: &str, details: &VideoDetails) -> f64 {
        let mut score = 0.5;

        let positive = count_matches(corpus, &self.positive_quality) as f64;
        score += (positive * 0.1).min(0.3);

        let negative = count_matches(corpus, &self.negative_quality) as f64;
        score -= (negative * 0.1).min(0.3);

        if details.hd {
            score += 0.1;
        }
        if details.captions {
            score += 0.1;
        }

        let duration_secs = parse_duration_secs(&details.duration);
        if duration_secs > 0 {
            if (30..=3600).contains(&duration_secs) {
                score += 0.1;
            } else if duration_secs > 3600 {
                score -= 0.05;
            }
        }

        score.clamp(0.0, 1.0)
    }

    /// Spam likelihood: pattern hits plus shouting and punctuation
    /// heuristics, 0.2 per indicator, capped at 1.
    ///
    /// The uppercase ratio is measured on the case-preserving corpus.
    fn spam_score(&self, corpus: &str, corpus_raw: &str) -> f64 {
        let mut indicators = self
            .spam_patterns
            .iter()
            .filter(|pattern| pattern.is_match(corpus))
            .count() as f64;

        let total_chars = corpus_raw.chars().count();
        if total_chars > 50 {
            let uppercase = corpus_raw.chars().filter(|c| c.is_uppercase()).count();
            if uppercase as f64 / total_chars as f64 > 0.3 {
                indicators += 1.0;
            }
        }

        if total_chars > 0 {
            let punctuation = corpus_raw
                .chars()
                .filter(|c| matches!(c, '!' | '?' | '.'))
                .count();
            if punctuation as f64 / total_chars as f64 > 0.1 {
                indicators += 1.0;
            }
        }

        (indicators * 0.2).min(1.0)
    }

    /// Unicode-range heuristic for the content language.
    fn detect_language(&self, corpus: &str) -> String {
        if corpus.chars().any(|c| ('\u{0D80}'..='\u{0DFF}').contains(&c)) {
            return "sinhala".to_string();
        }
        if corpus.chars().any(|c| ('\u{0B80}'..='\u{0BFF}').contains(&c)) {
            return "tamil".to_string();
        }
        if count_matches(corpus, &self.locations) > 0 {
            return "english_regional".to_string();
        }
        "english".to_string()
    }
}

/// Audience engagement from raw counters; 0 when there are no views.
fn engagement_score(details: &VideoDetails) -> f64 {
    if details.view_count == 0 {
        return 0.0;
    }

    let views = details.view_count as f64;
    let engagement_rate =
        (details.like_count as f64 + 2.0 * details.comment_count as f64) / views;

    let normalized_engagement = (engagement_rate * 10.0).min(1.0);
    let view_score = (views / 1000.0).min(1.0);

    0.7 * normalized_engagement + 0.3 * view_score
}

/// Number of table keywords contained in the corpus.
fn count_matches(corpus: &str, table: &[String]) -> usize {
    table.iter().filter(|kw| corpus.contains(kw.as_str())).count()
}

/// The specific table keywords contained in the corpus.
fn matched_terms(corpus: &str, table: &[String]) -> Vec<String> {
    table
        .iter()
        .filter(|kw| corpus.contains(kw.as_str()))
        .cloned()
        .collect()
}

/// Keyword-bucket content categorization.
fn categorize(corpus: &str) -> String {
    const BUCKETS: &[(&str, &[&str])] = &[
        ("news", &["news", "breaking", "update", "report", "announcement"]),
        ("entertainment", &["music", "dance", "comedy", "movie", "film", "song"]),
        ("sports", &["cricket", "football", "rugby", "sports", "match", "game"]),
        ("travel", &["travel", "visit", "tour", "destination", "hotel", "beach"]),
        ("food", &["food", "recipe", "cooking", "restaurant", "curry", "rice"]),
        ("education", &["education", "tutorial", "learn", "how to", "guide", "university"]),
        ("politics", &["politics", "election", "government", "minister", "parliament"]),
        ("culture", &["culture", "festival", "tradition", "temple", "religious", "ceremony"]),
    ];

    for (category, triggers) in BUCKETS {
        if triggers.iter().any(|t| corpus.contains(t)) {
            return (*category).to_string();
        }
    }
    "general".to_string()
}

/// Parse an ISO-8601 duration ("PT1H2M3S") into seconds.
///
/// Anything unparseable is treated as zero, which skips the duration
/// adjustments in the quality score.
pub fn parse_duration_secs(duration: &str) -> u64 {
    let Some(rest) = duration.strip_prefix("PT") else {
        return 0;
    };

    let mut seconds: u64 = 0;
    let mut number = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let Ok(value) = number.parse::<u64>() else {
            return 0;
        };
        number.clear();
        match c {
            'H' => seconds += value * 3600,
            'M' => seconds += value * 60,
            'S' => seconds += value,
            _ => return 0,
        }
    }
    seconds
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn lowercase_all(table: &[String]) -> Vec<String> {
    table.iter().map(|kw| kw.to_lowercase()).collect()
}
