use crate::intent::{BoostPlan, BoostRule, SearchIntent};
use scout_protocol::SearchHit;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankWeights {
    /// Added when a query token names the hit's file or class exactly.
    pub exact_match: f32,
    /// Subtracted when the plan expects a file type the hit does not have.
    pub type_mismatch: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            exact_match: 1.0,
            type_mismatch: 0.5,
        }
    }
}

/// A hit together with its adjusted score. The hit itself is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    #[serde(flatten)]
    pub hit: SearchHit,
    #[serde(rename = "rank_score")]
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RerankEngine {
    weights: RerankWeights,
}

impl RerankEngine {
    pub fn new(weights: RerankWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> RerankWeights {
        self.weights
    }

    /// Rerank with an optional intent plus caller-supplied rules.
    pub fn rerank(
        &self,
        hits: &[SearchHit],
        query: &str,
        intent: Option<SearchIntent>,
        extra_rules: &[BoostRule],
        limit: usize,
    ) -> Vec<RankedHit> {
        let plan = intent
            .map(|intent| intent.boost_plan())
            .unwrap_or_default()
            .with_rules(extra_rules.iter().cloned());
        self.rerank_with_plan(hits, query, &plan, limit)
    }

    pub fn rerank_with_plan(
        &self,
        hits: &[SearchHit],
        query: &str,
        plan: &BoostPlan,
        limit: usize,
    ) -> Vec<RankedHit> {
        if hits.is_empty() || limit == 0 {
            return Vec::new();
        }

        let needles = QueryNeedles::from_query(query);
        let mut ranked: Vec<RankedHit> = hits
            .iter()
            .map(|hit| RankedHit {
                score: self.score(hit, &needles, plan),
                hit: hit.clone(),
            })
            .collect();

        // `sort_by` is stable: equal scores keep engine order.
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let mut seen = HashSet::new();
        ranked.retain(|r| seen.insert(r.hit.path.clone()));
        ranked.truncate(limit);
        ranked
    }

    fn score(&self, hit: &SearchHit, needles: &QueryNeedles, plan: &BoostPlan) -> f32 {
        let mut score = if hit.score.is_finite() { hit.score } else { 0.0 };

        score += plan
            .rules
            .iter()
            .filter(|rule| rule.matches(hit))
            .map(|rule| rule.weight)
            .sum::<f32>();

        if needles.matches(hit) {
            score += self.weights.exact_match;
        }

        if let Some(expected) = plan.expected_file_type.as_deref() {
            if hit.effective_file_type().as_deref() != Some(expected) {
                score -= self.weights.type_mismatch;
            }
        }
        score
    }
}

/// File-like (`di.xml`) and class-like (`CartRepository`, `Vendor\Module\Model\Cart`) tokens.
#[derive(Debug, Default)]
struct QueryNeedles {
    files: Vec<String>,
    classes: Vec<String>,
}

impl QueryNeedles {
    fn from_query(query: &str) -> Self {
        let mut needles = Self::default();
        for raw in query.split(|c: char| c.is_whitespace() || c == ',' || c == '"' || c == '\'') {
            let token = raw.trim_matches(|c: char| c == '(' || c == ')' || c == ':');
            if token.is_empty() {
                continue;
            }
            if let Some((_, ext)) = token.rsplit_once('.') {
                if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                    let file = token.rsplit(['/', '\\']).next().unwrap_or(token);
                    needles.files.push(file.to_ascii_lowercase());
                    continue;
                }
            }
            if is_class_like(token) {
                needles.classes.push(token.trim_start_matches('\\').to_string());
            }
        }
        needles
    }

    fn matches(&self, hit: &SearchHit) -> bool {
        let file_name = hit.file_name().to_ascii_lowercase();
        if self.files.iter().any(|f| *f == file_name) {
            return true;
        }
        self.classes.iter().any(|class| {
            if let Some(hit_class) = hit.class_name.as_deref() {
                let hit_class = hit_class.trim_start_matches('\\');
                if hit_class == class || hit_class.rsplit('\\').next() == Some(class.as_str()) {
                    return true;
                }
            }
            let class_file = format!("{}.php", class.replace('\\', "/")).to_ascii_lowercase();
            let hit_path = hit.path.replace('\\', "/").to_ascii_lowercase();
            hit_path == class_file || hit_path.ends_with(&format!("/{class_file}"))
        })
    }
}

fn is_class_like(token: &str) -> bool {
    if token.contains('\\') {
        return token.chars().any(|c| c.is_ascii_uppercase());
    }
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_uppercase()
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && token.chars().skip(1).any(|c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{BoostRule, SearchIntent};
    use pretty_assertions::assert_eq;
    use scout_protocol::EntityKind;

    fn paths(ranked: &[RankedHit]) -> Vec<&str> {
        ranked.iter().map(|r| r.hit.path.as_str()).collect()
    }

    #[test]
    fn controller_intent_lifts_controller_over_closer_hit() {
        let hits = vec![
            SearchHit::new("app/code/Vendor/Checkout/Model/Cart.php", 0.95),
            SearchHit::new("app/code/Vendor/Checkout/Controller/Cart/Add.php", 0.7)
                .with_kind(EntityKind::Controller),
            SearchHit::new("app/code/Vendor/Checkout/view/frontend/templates/cart.phtml", 0.8),
        ];
        let engine = RerankEngine::default();
        let ranked = engine.rerank(
            &hits,
            "checkout cart add controller",
            Some(SearchIntent::Controller),
            &[],
            10,
        );

        let top = &ranked[0].hit;
        assert!(top.is_controller);
        assert!(top.path.contains("/Controller/"));
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn output_is_deterministic_and_stable_on_ties() {
        let hits = vec![
            SearchHit::new("a.php", 0.5),
            SearchHit::new("b.php", 0.5),
            SearchHit::new("c.php", 0.5),
        ];
        let engine = RerankEngine::default();
        let first = engine.rerank(&hits, "anything", None, &[], 10);
        let second = engine.rerank(&hits, "anything", None, &[], 10);
        assert_eq!(first, second);
        assert_eq!(paths(&first), vec!["a.php", "b.php", "c.php"]);
    }

    #[test]
    fn duplicates_keep_highest_occurrence() {
        let hits = vec![
            SearchHit::new("dup.php", 0.2),
            SearchHit::new("other.php", 0.5),
            SearchHit::new("dup.php", 0.9),
        ];
        let ranked = RerankEngine::default().rerank(&hits, "q", None, &[], 10);
        assert_eq!(paths(&ranked), vec!["dup.php", "other.php"]);
        assert!((ranked[0].score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn exact_file_name_in_query_wins() {
        let hits = vec![
            SearchHit::new("app/code/V/Sales/etc/events.xml", 0.3),
            SearchHit::new("app/code/V/Sales/etc/di.xml", 0.6),
        ];
        let ranked = RerankEngine::default().rerank(&hits, "sales events.xml", None, &[], 1);
        assert_eq!(paths(&ranked), vec!["app/code/V/Sales/etc/events.xml"]);
    }

    #[test]
    fn exact_class_name_matches_metadata_or_file() {
        let hits = vec![
            SearchHit::new("app/code/V/Quote/Model/Other.php", 0.8),
            SearchHit::new("app/code/V/Quote/Model/QuoteRepository.php", 0.4),
        ];
        let ranked = RerankEngine::default().rerank(&hits, "QuoteRepository save", None, &[], 10);
        assert_eq!(ranked[0].hit.file_name(), "QuoteRepository.php");

        let hits = vec![
            SearchHit::new("x/Foo.php", 0.8),
            SearchHit::new("x/Bar.php", 0.1).with_class("Vendor\\Module\\Model\\Cart"),
        ];
        let ranked =
            RerankEngine::default().rerank(&hits, "Vendor\\Module\\Model\\Cart", None, &[], 10);
        assert_eq!(ranked[0].hit.path, "x/Bar.php");
    }

    #[test]
    fn expected_type_mismatch_is_penalized() {
        let hits = vec![
            SearchHit::new("app/code/V/M/Block/Cart.php", 0.9),
            SearchHit::new("app/design/frontend/V/theme/templates/cart.phtml", 0.6),
        ];
        let ranked =
            RerankEngine::default().rerank(&hits, "cart", Some(SearchIntent::Template), &[], 10);
        assert_eq!(ranked[0].hit.effective_file_type().as_deref(), Some("phtml"));
    }

    #[test]
    fn extra_rules_apply_and_limit_truncates() {
        let hits = vec![
            SearchHit::new("a/Plugin/One.php", 0.5),
            SearchHit::new("b/Two.php", 0.6),
            SearchHit::new("c/Three.php", 0.55),
        ];
        let ranked = RerankEngine::default().rerank(
            &hits,
            "q",
            None,
            &[BoostRule::path("/Plugin/")],
            2,
        );
        assert_eq!(paths(&ranked), vec!["a/Plugin/One.php", "b/Two.php"]);
    }
}
