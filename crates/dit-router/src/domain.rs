//! # Domain Router
//!
//! Routes on prior domain knowledge: each expert declares descriptor words
//! ("finance", "payments", ...). A descriptor claimed by more than one
//! expert is ambiguous and dropped from the map entirely. Queries are
//! tokenized on whitespace; candidates are ordered by how many of their
//! descriptors appear in the query, with round-robin as the fallback when
//! nothing matches.

use crate::router::{RoundRobinRouter, RouteError, Router};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Keyword-based routing over per-expert descriptor mappings.
pub struct DomainRouter {
    /// Unambiguous descriptor -> owning expert.
    domains: HashMap<String, String>,
    /// Descriptors dropped for being claimed by multiple experts.
    ambiguous: HashSet<String>,
    /// Stop at the first mapped word instead of tallying the whole query.
    first_match: bool,
    fallback: RoundRobinRouter,
}

impl DomainRouter {
    /// Build a tallying domain router from expert -> descriptors.
    #[must_use]
    pub fn new(mapping: &HashMap<String, Vec<String>>) -> Self {
        Self::build(mapping, false)
    }

    /// Build the simplified variant that short-circuits on the first word
    /// mapped to a domain.
    #[must_use]
    pub fn first_match(mapping: &HashMap<String, Vec<String>>) -> Self {
        Self::build(mapping, true)
    }

    fn build(mapping: &HashMap<String, Vec<String>>, first_match: bool) -> Self {
        let mut domains: HashMap<String, String> = HashMap::new();
        let mut ambiguous: HashSet<String> = HashSet::new();
        for (expert, descriptors) in mapping {
            for descriptor in descriptors {
                if domains.contains_key(descriptor) || ambiguous.contains(descriptor) {
                    domains.remove(descriptor);
                    ambiguous.insert(descriptor.clone());
                } else {
                    domains.insert(descriptor.clone(), expert.clone());
                }
            }
        }
        debug!(
            descriptors = domains.len(),
            ambiguous = ambiguous.len(),
            first_match,
            "domain router built"
        );
        Self {
            domains,
            ambiguous,
            first_match,
            fallback: RoundRobinRouter::new(),
        }
    }

    /// Descriptors dropped as ambiguous.
    #[must_use]
    pub fn ambiguous_descriptors(&self) -> &HashSet<String> {
        &self.ambiguous
    }

    fn order_with_primary(primary: &str, experts: &[String]) -> Vec<String> {
        let mut ordered = vec![primary.to_string()];
        ordered.extend(experts.iter().filter(|e| e.as_str() != primary).cloned());
        ordered
    }
}

impl Router for DomainRouter {
    fn select(&self, query: &str, experts: &[String]) -> Result<Vec<String>, RouteError> {
        if experts.is_empty() {
            return Err(RouteError::NoExperts);
        }

        if self.first_match {
            for word in query.split_whitespace() {
                if let Some(expert) = self.domains.get(word) {
                    if experts.contains(expert) {
                        return Ok(Self::order_with_primary(expert, experts));
                    }
                }
            }
            return self.fallback.select(query, experts);
        }

        let mut tallies: HashMap<&str, usize> =
            experts.iter().map(|e| (e.as_str(), 0)).collect();
        for word in query.split_whitespace() {
            if self.ambiguous.contains(word) {
                continue;
            }
            if let Some(expert) = self.domains.get(word) {
                if let Some(count) = tallies.get_mut(expert.as_str()) {
                    *count += 1;
                }
            }
        }

        let best = experts
            .iter()
            .map(|e| tallies.get(e.as_str()).copied().unwrap_or(0))
            .max()
            .unwrap_or(0);
        if best == 0 {
            return self.fallback.select(query, experts);
        }

        // Stable sort keeps registration order among equal tallies.
        let mut order: Vec<usize> = (0..experts.len()).collect();
        order.sort_by_key(|&i| Reverse(tallies.get(experts[i].as_str()).copied().unwrap_or(0)));
        Ok(order.into_iter().map(|i| experts[i].clone()).collect())
    }
}
