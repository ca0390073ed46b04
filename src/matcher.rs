//! Four-tier skill resolution against the master taxonomy
//!
//! A raw mention resolves through exact -> alias -> token/rule -> vector,
//! short-circuiting at the first hit. Every positive match must then pass
//! the per-skill disambiguation rules; a blocked match is reported
//! distinctly from a plain miss so callers can log it.

use crate::ai::errors::AiProviderError;
use crate::canonicalize::{canonicalize, tokenize};
use crate::taxonomy::{DisambiguationRules, MasterSkill, SkillTaxonomy, SkillType};
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use std::sync::Arc;

/// Embedding source for the vector tier. The engine wraps the AI provider
/// with the persistent embedding cache behind this seam.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, AiProviderError>;
}

/// How a mention resolved onto a master skill, in increasing confidence
/// order for aggregation purposes: vector < rule < alias < exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchMethod {
    Vector,
    Rule,
    Alias,
    Exact,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Alias => "alias",
            MatchMethod::Rule => "rule",
            MatchMethod::Vector => "vector",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(MatchMethod::Exact),
            "alias" => Some(MatchMethod::Alias),
            "rule" => Some(MatchMethod::Rule),
            "vector" => Some(MatchMethod::Vector),
            _ => None,
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct SkillMatch {
    pub skill_id: i64,
    pub skill_code: String,
    pub skill_type: SkillType,
    pub confidence: f64,
    pub method: MatchMethod,
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Match(SkillMatch),
    NoMatch,
    DisambiguationBlocked,
}

impl MatchOutcome {
    pub fn into_match(self) -> Option<SkillMatch> {
        match self {
            MatchOutcome::Match(m) => Some(m),
            _ => None,
        }
    }
}

const VECTOR_MATCH_THRESHOLD: f64 = 0.92;

pub struct SkillMatcher {
    taxonomy: Arc<SkillTaxonomy>,
    vector_index: Arc<VectorIndex>,
    vector_threshold: f64,
    // Canonical forms precomputed once; the master list is immutable for
    // the life of the engine.
    canonical_names: Vec<String>,
    canonical_aliases: Vec<Vec<String>>,
}

impl SkillMatcher {
    pub fn new(taxonomy: Arc<SkillTaxonomy>, vector_index: Arc<VectorIndex>) -> Self {
        Self::with_threshold(taxonomy, vector_index, VECTOR_MATCH_THRESHOLD)
    }

    pub fn with_threshold(
        taxonomy: Arc<SkillTaxonomy>,
        vector_index: Arc<VectorIndex>,
        vector_threshold: f64,
    ) -> Self {
        let canonical_names = taxonomy
            .skills()
            .iter()
            .map(|s| canonicalize(&s.skill_name))
            .collect();
        let canonical_aliases = taxonomy
            .skills()
            .iter()
            .map(|s| s.aliases.iter().map(|a| canonicalize(a)).collect())
            .collect();

        Self { taxonomy, vector_index, vector_threshold, canonical_names, canonical_aliases }
    }

    /// Resolve a raw mention. `context_text` is the surrounding resume or JD
    /// text used by disambiguation. `allow_implicit` is part of the caller
    /// contract (the eligibility gate passes `false`, the aggregator `true`);
    /// the resolution tiers themselves are identical for both.
    pub async fn resolve(
        &self,
        raw_name: &str,
        context_text: &str,
        _allow_implicit: bool,
        embedder: &dyn Embedder,
    ) -> MatchOutcome {
        let normalized = canonicalize(raw_name);
        if normalized.is_empty() {
            return MatchOutcome::NoMatch;
        }
        let context = canonicalize(context_text);

        // 1. Exact match on canonical skill name
        for (idx, skill) in self.taxonomy.skills().iter().enumerate() {
            if self.canonical_names[idx] == normalized {
                return self.disambiguated(skill, &normalized, &context, 1.00, MatchMethod::Exact);
            }
        }

        // 2. Alias match
        for (idx, skill) in self.taxonomy.skills().iter().enumerate() {
            if self.canonical_aliases[idx].iter().any(|a| !a.is_empty() && *a == normalized) {
                return self.disambiguated(skill, &normalized, &context, 0.95, MatchMethod::Alias);
            }
        }

        // 3. Token/rule match: every master token must appear in the mention
        let mention_tokens = tokenize(&normalized);
        for skill in self.taxonomy.skills() {
            if skill.tokens.is_empty() {
                continue;
            }

            // Guardrail: single-letter tokens ("c", "r") only match when the
            // mention is itself a single token, otherwise "C" would claim
            // every mention containing the letter.
            if skill.tokens.iter().any(|t| t.len() == 1) && mention_tokens.len() > 1 {
                continue;
            }

            if skill.tokens.iter().all(|t| mention_tokens.contains(&t.to_lowercase())) {
                log::debug!(
                    "[SkillMatcher] Token rule matched {:?} -> {}",
                    raw_name,
                    skill.skill_code
                );
                return self.disambiguated(skill, &normalized, &context, 0.90, MatchMethod::Rule);
            }
        }

        // 4. Vector match, strict threshold
        if !self.vector_index.is_empty() {
            let query = match embedder.embed(&normalized).await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("[SkillMatcher] Embedding failed for {:?}: {}", raw_name, e);
                    return MatchOutcome::NoMatch;
                }
            };

            if let Some((entry, score)) = self.vector_index.search(&query) {
                if score >= self.vector_threshold {
                    if let Some(skill) = self.taxonomy.get_by_id(entry.skill_id) {
                        let confidence = (score * 1000.0).round() / 1000.0;
                        return self.disambiguated(
                            skill,
                            &normalized,
                            &context,
                            confidence,
                            MatchMethod::Vector,
                        );
                    }
                }
            }
        }

        MatchOutcome::NoMatch
    }

    fn disambiguated(
        &self,
        skill: &MasterSkill,
        normalized: &str,
        context: &str,
        confidence: f64,
        method: MatchMethod,
    ) -> MatchOutcome {
        if !passes_disambiguation(skill.disambiguation_rules.as_ref(), normalized, context) {
            return MatchOutcome::DisambiguationBlocked;
        }

        MatchOutcome::Match(SkillMatch {
            skill_id: skill.skill_id,
            skill_code: skill.skill_code.clone(),
            skill_type: skill.skill_type,
            confidence,
            method,
        })
    }
}

/// Rule-based block/allow guard against false positives (Java vs JavaScript).
///
/// Block rules win over allow rules; a non-empty allow list requires at
/// least one phrase to be present. Missing rules fail open.
pub fn passes_disambiguation(
    rules: Option<&DisambiguationRules>,
    normalized: &str,
    context: &str,
) -> bool {
    let rules = match rules {
        Some(r) => r,
        None => return true,
    };

    let combined = format!("{} {}", normalized, context);

    for blocked in &rules.block_if_contains {
        if !blocked.is_empty() && combined.contains(&blocked.to_lowercase()) {
            return false;
        }
    }

    if !rules.allow_if_contains.is_empty() {
        return rules
            .allow_if_contains
            .iter()
            .any(|a| combined.contains(&a.to_lowercase()));
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::SkillTaxonomy;
    use crate::vector_index::VectorEntry;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedEmbedder {
        vectors: Mutex<HashMap<String, Vec<f64>>>,
    }

    impl FixedEmbedder {
        fn new(pairs: &[(&str, Vec<f64>)]) -> Self {
            let vectors = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            Self { vectors: Mutex::new(vectors) }
        }

        fn empty() -> Self {
            Self { vectors: Mutex::new(HashMap::new()) }
        }
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f64>, AiProviderError> {
            Ok(self
                .vectors
                .lock()
                .unwrap()
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0, 0.0, 0.0]))
        }
    }

    fn master(
        id: i64,
        code: &str,
        name: &str,
        aliases: Vec<&str>,
        tokens: Vec<&str>,
        rules: Option<DisambiguationRules>,
    ) -> MasterSkill {
        MasterSkill {
            skill_id: id,
            skill_code: code.to_string(),
            skill_name: name.to_string(),
            skill_type: SkillType::Programming,
            category: None,
            parent_skill_id: None,
            aliases: aliases.into_iter().map(String::from).collect(),
            tokens: tokens.into_iter().map(String::from).collect(),
            disambiguation_rules: rules,
        }
    }

    fn matcher_with(skills: Vec<MasterSkill>, entries: Vec<VectorEntry>) -> SkillMatcher {
        SkillMatcher::new(
            Arc::new(SkillTaxonomy::new(skills, vec![])),
            Arc::new(VectorIndex::new(entries)),
        )
    }

    #[tokio::test]
    async fn test_exact_match() {
        let m = matcher_with(vec![master(1, "language_java", "Java", vec![], vec![], None)], vec![]);
        let outcome = m.resolve("Java", "", true, &FixedEmbedder::empty()).await;
        let matched = outcome.into_match().unwrap();
        assert_eq!(matched.skill_code, "language_java");
        assert_eq!(matched.method, MatchMethod::Exact);
        assert_eq!(matched.confidence, 1.00);
    }

    #[tokio::test]
    async fn test_alias_match() {
        let m = matcher_with(
            vec![master(1, "language_javascript", "JavaScript", vec!["JS", "ECMAScript"], vec![], None)],
            vec![],
        );
        let matched = m
            .resolve("ecmascript", "", true, &FixedEmbedder::empty())
            .await
            .into_match()
            .unwrap();
        assert_eq!(matched.method, MatchMethod::Alias);
        assert_eq!(matched.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_token_rule_match() {
        let m = matcher_with(
            vec![master(1, "framework_aspnet_mvc", "ASP.NET MVC", vec![], vec!["aspnet", "mvc"], None)],
            vec![],
        );
        let matched = m
            .resolve("ASP.NET Core MVC", "", true, &FixedEmbedder::empty())
            .await
            .into_match()
            .unwrap();
        assert_eq!(matched.method, MatchMethod::Rule);
        assert_eq!(matched.confidence, 0.90);
    }

    #[tokio::test]
    async fn test_single_letter_token_guardrail() {
        let m = matcher_with(
            vec![master(1, "language_c", "C", vec![], vec!["c"], None)],
            vec![],
        );
        // Multi-token mention must not trip a single-letter rule
        let outcome = m
            .resolve("c development tools", "", true, &FixedEmbedder::empty())
            .await;
        assert!(matches!(outcome, MatchOutcome::NoMatch));

        // A lone "C" still resolves
        let matched = m.resolve("C", "", true, &FixedEmbedder::empty()).await.into_match().unwrap();
        assert_eq!(matched.skill_code, "language_c");
    }

    #[tokio::test]
    async fn test_vector_match_above_threshold() {
        let m = matcher_with(
            vec![master(7, "framework_react", "React", vec![], vec![], None)],
            vec![VectorEntry { skill_id: 7, embedding: vec![1.0, 0.0, 0.0] }],
        );
        let embedder = FixedEmbedder::new(&[("reactjs", vec![0.99, 0.05, 0.0])]);
        let matched = m.resolve("ReactJS", "", true, &embedder).await.into_match().unwrap();
        assert_eq!(matched.method, MatchMethod::Vector);
        assert!(matched.confidence >= 0.92 && matched.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_vector_below_threshold_is_no_match() {
        let m = matcher_with(
            vec![master(7, "framework_react", "React", vec![], vec![], None)],
            vec![VectorEntry { skill_id: 7, embedding: vec![1.0, 0.0, 0.0] }],
        );
        let embedder = FixedEmbedder::new(&[("angular", vec![0.5, 0.8, 0.0])]);
        assert!(matches!(
            m.resolve("angular", "", true, &embedder).await,
            MatchOutcome::NoMatch
        ));
    }

    #[tokio::test]
    async fn test_disambiguation_blocks_java_near_javascript() {
        let rules = DisambiguationRules {
            block_if_contains: vec!["javascript".to_string()],
            allow_if_contains: vec![],
        };
        let m = matcher_with(
            vec![master(1, "language_java", "Java", vec![], vec![], Some(rules))],
            vec![],
        );
        let outcome = m
            .resolve("Java", "built JavaScript frameworks", true, &FixedEmbedder::empty())
            .await;
        assert!(matches!(outcome, MatchOutcome::DisambiguationBlocked));
    }

    #[tokio::test]
    async fn test_allow_list_requires_presence() {
        let rules = DisambiguationRules {
            block_if_contains: vec![],
            allow_if_contains: vec!["data".to_string()],
        };
        let m = matcher_with(
            vec![master(1, "language_r", "R", vec!["r lang"], vec![], Some(rules))],
            vec![],
        );
        assert!(matches!(
            m.resolve("r lang", "web development", true, &FixedEmbedder::empty()).await,
            MatchOutcome::DisambiguationBlocked
        ));
        assert!(m
            .resolve("r lang", "data analysis", true, &FixedEmbedder::empty())
            .await
            .into_match()
            .is_some());
    }

    #[test]
    fn test_missing_rules_fail_open() {
        assert!(passes_disambiguation(None, "java", "anything"));
        assert!(passes_disambiguation(Some(&DisambiguationRules::default()), "java", "anything"));
    }

    #[test]
    fn test_method_ordering() {
        assert!(MatchMethod::Exact > MatchMethod::Alias);
        assert!(MatchMethod::Alias > MatchMethod::Rule);
        assert!(MatchMethod::Rule > MatchMethod::Vector);
    }
}
