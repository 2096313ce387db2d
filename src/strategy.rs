//! Search strategy scheduling
//!
//! A strategy is a single saved search: query text, a category tag for
//! reporting, and a per-strategy result cap. A [`StrategySchedule`] is the
//! ordered, restartable sequence of strategies a comprehensive run walks
//! through. List order is the iteration order; the `priority` field is
//! metadata for dashboards and previews only.
//!
//! Pacing between strategies (the inter-strategy delay that keeps the
//! external API happy) is a contract owned by the orchestrator, not by the
//! schedule itself - see [`crate::config::StrategyConfig::delay_between`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single search strategy, defined at startup and immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchStrategy {
    /// Query text sent to the search source
    pub query: String,

    /// Category tag (reporting only)
    #[serde(default = "default_category")]
    pub category: String,

    /// Human-facing ordering hint (ascending = higher priority). Does not
    /// affect scheduling order.
    #[serde(default = "default_priority")]
    pub priority: u8,

    /// Maximum number of results to request for this strategy
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl SearchStrategy {
    /// Create a strategy with default category/priority/result cap.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: default_category(),
            priority: default_priority(),
            max_results: default_max_results(),
        }
    }

    /// Create a strategy with an explicit category and priority.
    pub fn tagged(query: impl Into<String>, category: impl Into<String>, priority: u8) -> Self {
        Self {
            query: query.into(),
            category: category.into(),
            priority,
            max_results: default_max_results(),
        }
    }

    /// Override the per-strategy result cap.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

/// An ordered, finite, restartable sequence of search strategies.
///
/// `next()` hands out strategies in list order until the sequence is
/// exhausted; `reset()` rewinds to the beginning for the next run.
#[derive(Clone, Debug)]
pub struct StrategySchedule {
    strategies: Vec<SearchStrategy>,
    position: usize,
}

impl StrategySchedule {
    /// Build a schedule from an ordered strategy list.
    pub fn new(strategies: Vec<SearchStrategy>) -> Self {
        Self {
            strategies,
            position: 0,
        }
    }

    /// Build a one-off schedule from ad hoc query strings (targeted runs).
    pub fn from_queries<I, S>(queries: I, max_results: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strategies = queries
            .into_iter()
            .map(|q| SearchStrategy::tagged(q, "targeted", 1).with_max_results(max_results))
            .collect();
        Self::new(strategies)
    }

    /// The next strategy in list order, or `None` when the schedule is done.
    pub fn next(&mut self) -> Option<&SearchStrategy> {
        let strategy = self.strategies.get(self.position)?;
        self.position += 1;
        Some(strategy)
    }

    /// Rewind to the start of the sequence.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Total number of strategies in the schedule.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True when the schedule contains no strategies.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Number of strategies already handed out.
    pub fn dispatched(&self) -> usize {
        self.position
    }

    /// Strategies sorted by ascending priority, for human-facing previews.
    pub fn preview(&self) -> Vec<&SearchStrategy> {
        let mut sorted: Vec<&SearchStrategy> = self.strategies.iter().collect();
        sorted.sort_by_key(|s| s.priority);
        sorted
    }
}

/// The built-in comprehensive strategy catalog.
///
/// Covers locations, culture, entertainment, news, sports, travel and current
/// events for the target region. Consumers can replace the whole list via
/// [`crate::config::StrategyConfig::strategies`].
pub fn default_catalog() -> Vec<SearchStrategy> {
    vec![
        // Location-based searches
        SearchStrategy::tagged("Sri Lanka", "general", 1),
        SearchStrategy::tagged("Colombo", "location", 2),
        SearchStrategy::tagged("Kandy Sri Lanka", "location", 2),
        SearchStrategy::tagged("Galle Sri Lanka", "location", 2),
        SearchStrategy::tagged("Jaffna Sri Lanka", "location", 3),
        // Cultural and traditional content
        SearchStrategy::tagged("Sinhala", "culture", 2),
        SearchStrategy::tagged("Tamil Sri Lanka", "culture", 2),
        SearchStrategy::tagged("Vesak Sri Lanka", "culture", 3),
        SearchStrategy::tagged("Avurudu Sri Lanka", "culture", 3),
        SearchStrategy::tagged("Sri Lankan food", "culture", 2),
        // Entertainment and media
        SearchStrategy::tagged("Sri Lankan music", "entertainment", 2),
        SearchStrategy::tagged("Sri Lankan movies", "entertainment", 3),
        SearchStrategy::tagged("Sri Lankan news", "news", 1),
        SearchStrategy::tagged("Sri Lankan cricket", "sports", 2),
        // Tourism and travel
        SearchStrategy::tagged("Sri Lanka tourism", "travel", 2),
        SearchStrategy::tagged("Visit Sri Lanka", "travel", 3),
        SearchStrategy::tagged("Sri Lanka beaches", "travel", 3),
        SearchStrategy::tagged("Sigiriya", "travel", 3),
        // Current events and trending
        SearchStrategy::tagged("Sri Lanka today", "current", 1),
        SearchStrategy::tagged("Sri Lanka update", "current", 2),
        SearchStrategy::tagged("Ceylon", "historical", 3),
    ]
}

fn default_category() -> String {
    "general".to_string()
}

fn default_priority() -> u8 {
    1
}

fn default_max_results() -> u32 {
    50
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_follows_list_order_not_priority() {
        let mut schedule = StrategySchedule::new(vec![
            SearchStrategy::tagged("third by priority", "a", 3),
            SearchStrategy::tagged("first by priority", "b", 1),
            SearchStrategy::tagged("second by priority", "c", 2),
        ]);

        assert_eq!(schedule.next().unwrap().query, "third by priority");
        assert_eq!(schedule.next().unwrap().query, "first by priority");
        assert_eq!(schedule.next().unwrap().query, "second by priority");
        assert!(schedule.next().is_none(), "schedule must be finite");
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut schedule = StrategySchedule::new(vec![
            SearchStrategy::new("one"),
            SearchStrategy::new("two"),
        ]);

        assert_eq!(schedule.next().unwrap().query, "one");
        assert_eq!(schedule.next().unwrap().query, "two");
        assert!(schedule.next().is_none());

        schedule.reset();
        assert_eq!(schedule.dispatched(), 0);
        assert_eq!(schedule.next().unwrap().query, "one");
    }

    #[test]
    fn preview_sorts_by_priority_without_reordering_iteration() {
        let mut schedule = StrategySchedule::new(vec![
            SearchStrategy::tagged("low", "a", 9),
            SearchStrategy::tagged("high", "b", 1),
        ]);

        let preview: Vec<String> = schedule.preview().iter().map(|s| s.query.clone()).collect();
        assert_eq!(preview, vec!["high".to_string(), "low".to_string()]);

        // Iteration order is unchanged by preview
        assert_eq!(schedule.next().unwrap().query, "low");
    }

    #[test]
    fn from_queries_builds_targeted_strategies() {
        let mut schedule = StrategySchedule::from_queries(["alpha", "beta"], 25);

        assert_eq!(schedule.len(), 2);
        let first = schedule.next().unwrap();
        assert_eq!(first.query, "alpha");
        assert_eq!(first.category, "targeted");
        assert_eq!(first.max_results, 25);
    }

    #[test]
    fn empty_schedule_is_immediately_done() {
        let mut schedule = StrategySchedule::new(vec![]);
        assert!(schedule.is_empty());
        assert!(schedule.next().is_none());
    }

    #[test]
    fn default_catalog_is_nonempty_and_capped_at_50() {
        let catalog = default_catalog();
        assert!(catalog.len() >= 20);
        assert!(catalog.iter().all(|s| s.max_results == 50));
        assert!(catalog.iter().any(|s| s.category == "news"));
    }
}
