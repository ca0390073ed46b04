//! Per-candidate skill aggregation
//!
//! Folds every role's mentions into one accumulator per master skill:
//! months per seniority band, usage window, evidence weights and strength,
//! and a blended confidence that mixes the extractor's confidence with the
//! matcher's.

use crate::errors::InvariantViolation;
use crate::matcher::{Embedder, MatchMethod, MatchOutcome, SkillMatcher};
use crate::profile::{role_title_skill_codes, seniority_band_from_title, CandidateRole, MentionSource, SeniorityBand};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Accumulated metrics for one candidate x master skill pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMetrics {
    pub junior_months: i64,
    pub mid_months: i64,
    pub senior_months: i64,
    pub total_months: i64,
    pub first_used: Option<NaiveDate>,
    pub last_used: Option<NaiveDate>,
    pub evidence_score: f64,
    pub evidence_sources: BTreeSet<MentionSource>,
    pub max_evidence_strength: i64,
    pub confidence_scores: Vec<f64>,
    pub match_confidence: f64,
    pub normalization_methods: Vec<MatchMethod>,
    pub normalization_confidence: f64,
    pub has_presence: bool,
}

impl Default for SkillMetrics {
    fn default() -> Self {
        Self {
            junior_months: 0,
            mid_months: 0,
            senior_months: 0,
            total_months: 0,
            first_used: None,
            last_used: None,
            evidence_score: 0.0,
            evidence_sources: BTreeSet::new(),
            max_evidence_strength: 1,
            confidence_scores: Vec::new(),
            match_confidence: 0.0,
            normalization_methods: Vec::new(),
            normalization_confidence: 0.0,
            has_presence: false,
        }
    }
}

impl SkillMetrics {
    /// Mutable months slot for a seniority band.
    fn band_months_mut(&mut self, band: SeniorityBand) -> &mut i64 {
        match band {
            SeniorityBand::Junior => &mut self.junior_months,
            SeniorityBand::Mid => &mut self.mid_months,
            SeniorityBand::Senior => &mut self.senior_months,
        }
    }

    /// The strongest normalization method observed across mentions, by
    /// priority exact > alias > rule > vector.
    pub fn strongest_method(&self) -> Option<MatchMethod> {
        self.normalization_methods.iter().max().copied()
    }

    fn refresh_evidence_strength(&mut self) {
        let strongest = self
            .evidence_sources
            .iter()
            .map(|s| s.evidence_strength())
            .max()
            .unwrap_or(0);
        self.max_evidence_strength = strongest.max(1);
    }

    /// Check the accumulator invariants before persisting. A violation is a
    /// programmer error, not bad input.
    pub fn validate(&self, skill_code: &str) -> Result<(), InvariantViolation> {
        if self.total_months != self.junior_months + self.mid_months + self.senior_months {
            return Err(InvariantViolation {
                skill_code: skill_code.to_string(),
                detail: format!(
                    "total_months {} != band sum {}",
                    self.total_months,
                    self.junior_months + self.mid_months + self.senior_months
                ),
            });
        }

        if let (Some(first), Some(last)) = (self.first_used, self.last_used) {
            if first > last {
                return Err(InvariantViolation {
                    skill_code: skill_code.to_string(),
                    detail: format!("first_used {} after last_used {}", first, last),
                });
            }
        }

        if self.evidence_sources.is_empty() && self.total_months != 0 {
            return Err(InvariantViolation {
                skill_code: skill_code.to_string(),
                detail: "months accrued without any evidence source".to_string(),
            });
        }

        Ok(())
    }
}

/// Folds candidate roles into per-skill accumulators keyed by skill code.
/// BTreeMap keeps iteration (and therefore persistence) order stable.
pub struct SkillAggregator {
    map: BTreeMap<String, SkillMetrics>,
}

impl SkillAggregator {
    pub fn new() -> Self {
        Self { map: BTreeMap::new() }
    }

    /// Fold one role: role-title credit first, then every mention.
    /// Unresolved mentions are dropped, never failed.
    pub async fn process_role(
        &mut self,
        role: &CandidateRole,
        matcher: &SkillMatcher,
        embedder: &dyn Embedder,
    ) {
        let band = seniority_band_from_title(&role.title);
        let months = role.verified_duration_months;

        // Title credit grants presence only; months come from the mention
        // loop against the role itself.
        for code in role_title_skill_codes(&role.title) {
            let acc = self.map.entry(code.to_string()).or_default();
            acc.has_presence = true;
            acc.evidence_sources.insert(MentionSource::RoleTitle);
            acc.refresh_evidence_strength();
        }

        for mention in &role.mentions {
            let outcome = matcher
                .resolve(&mention.raw_name, &mention.context, true, embedder)
                .await;

            let matched = match outcome {
                MatchOutcome::Match(m) => m,
                MatchOutcome::DisambiguationBlocked => {
                    log::info!(
                        "[SkillAggregator] Disambiguation blocked {:?} in role {:?}",
                        mention.raw_name,
                        role.title
                    );
                    continue;
                }
                MatchOutcome::NoMatch => {
                    log::debug!("[SkillAggregator] No match for {:?}", mention.raw_name);
                    continue;
                }
            };

            let acc = self.map.entry(matched.skill_code.clone()).or_default();

            *acc.band_months_mut(band) += months;

            acc.first_used = match (acc.first_used, role.start_date) {
                (Some(current), Some(start)) => Some(current.min(start)),
                (None, Some(start)) => Some(start),
                (current, None) => current,
            };
            acc.last_used = match (acc.last_used, role.end_date) {
                (Some(current), Some(end)) => Some(current.max(end)),
                (None, Some(end)) => Some(end),
                (current, None) => current,
            };

            let weight = mention.source.evidence_weight();
            acc.evidence_score += weight;
            acc.evidence_sources.insert(mention.source);
            if mention.source == MentionSource::SkillsSection {
                acc.has_presence = true;
            }
            acc.refresh_evidence_strength();

            // 60% trust in the extractor's confidence, 40% in ours, scaled
            // by how load-bearing the source is.
            let blended = (0.6 * mention.confidence + 0.4 * matched.confidence) * weight;
            acc.confidence_scores.push(blended);
            acc.normalization_methods.push(matched.method);
            acc.normalization_confidence = acc.normalization_confidence.max(matched.confidence);
        }
    }

    /// Close out the accumulators: derive totals and mean confidence.
    pub fn finalize(mut self) -> BTreeMap<String, SkillMetrics> {
        for acc in self.map.values_mut() {
            acc.total_months = acc.junior_months + acc.mid_months + acc.senior_months;
            acc.match_confidence = if acc.confidence_scores.is_empty() {
                0.0
            } else {
                acc.confidence_scores.iter().sum::<f64>() / acc.confidence_scores.len() as f64
            };
        }
        self.map
    }
}

impl Default for SkillAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::errors::AiProviderError;
    use crate::profile::Mention;
    use crate::taxonomy::{MasterSkill, SkillTaxonomy, SkillType};
    use crate::vector_index::VectorIndex;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullEmbedder;

    #[async_trait]
    impl Embedder for NullEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>, AiProviderError> {
            Ok(vec![0.0; 4])
        }
    }

    fn master(id: i64, code: &str, name: &str) -> MasterSkill {
        MasterSkill {
            skill_id: id,
            skill_code: code.to_string(),
            skill_name: name.to_string(),
            skill_type: SkillType::Programming,
            category: None,
            parent_skill_id: None,
            aliases: vec![],
            tokens: vec![],
            disambiguation_rules: None,
        }
    }

    fn test_matcher() -> SkillMatcher {
        SkillMatcher::new(
            Arc::new(SkillTaxonomy::new(
                vec![master(1, "language_java", "Java"), master(2, "web_html", "HTML")],
                vec![],
            )),
            Arc::new(VectorIndex::new(vec![])),
        )
    }

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn java_role(title: &str, start: NaiveDate, end: NaiveDate, source: MentionSource) -> CandidateRole {
        CandidateRole {
            title: title.to_string(),
            verified_duration_months: crate::profile::calculate_duration(Some(start), Some(end)),
            start_date: Some(start),
            end_date: Some(end),
            raw_technologies: BTreeSet::new(),
            domains: vec![],
            mentions: vec![Mention {
                raw_name: "Java".to_string(),
                source,
                confidence: 1.0,
                context: String::new(),
            }],
        }
    }

    #[tokio::test]
    async fn test_senior_role_accrues_senior_months() {
        let matcher = test_matcher();
        let mut agg = SkillAggregator::new();
        let role = java_role(
            "Senior Java Developer",
            date(2022, 1),
            date(2024, 1),
            MentionSource::SkillsSection,
        );

        agg.process_role(&role, &matcher, &NullEmbedder).await;
        let skills = agg.finalize();

        let metrics = &skills["language_java"];
        assert_eq!(metrics.senior_months, 24);
        assert_eq!(metrics.junior_months, 0);
        assert_eq!(metrics.mid_months, 0);
        assert_eq!(metrics.total_months, 24);
        assert_eq!(metrics.first_used, Some(date(2022, 1)));
        assert_eq!(metrics.last_used, Some(date(2024, 1)));
        assert!(metrics.has_presence);
        assert_eq!(metrics.max_evidence_strength, 1);
        assert_eq!(metrics.evidence_sources, BTreeSet::from([MentionSource::SkillsSection]));
        assert_eq!(metrics.strongest_method(), Some(MatchMethod::Exact));
        assert!(metrics.validate("language_java").is_ok());
    }

    #[tokio::test]
    async fn test_multiple_roles_extend_usage_window() {
        let matcher = test_matcher();
        let mut agg = SkillAggregator::new();

        agg.process_role(
            &java_role("Java Developer", date(2018, 6), date(2020, 6), MentionSource::TechnologyList),
            &matcher,
            &NullEmbedder,
        )
        .await;
        agg.process_role(
            &java_role("Senior Java Developer", date(2022, 1), date(2024, 1), MentionSource::Responsibility),
            &matcher,
            &NullEmbedder,
        )
        .await;

        let skills = agg.finalize();
        let metrics = &skills["language_java"];
        assert_eq!(metrics.mid_months, 24);
        assert_eq!(metrics.senior_months, 24);
        assert_eq!(metrics.total_months, 48);
        assert_eq!(metrics.first_used, Some(date(2018, 6)));
        assert_eq!(metrics.last_used, Some(date(2024, 1)));
        // responsibility evidence outranks a technology list
        assert_eq!(metrics.max_evidence_strength, 3);
        assert_eq!(metrics.confidence_scores.len(), 2);
    }

    #[tokio::test]
    async fn test_implicit_mentions_accrue_months_but_no_evidence() {
        let matcher = test_matcher();
        let mut agg = SkillAggregator::new();
        let role = java_role("Java Developer", date(2022, 1), date(2023, 1), MentionSource::Implicit);

        agg.process_role(&role, &matcher, &NullEmbedder).await;
        let skills = agg.finalize();

        let metrics = &skills["language_java"];
        assert_eq!(metrics.total_months, 12);
        assert_eq!(metrics.evidence_score, 0.0);
        assert!(!metrics.has_presence);
        // Blended confidence is scaled by the zero source weight
        assert_eq!(metrics.confidence_scores, vec![0.0]);
        assert_eq!(metrics.match_confidence, 0.0);
    }

    #[tokio::test]
    async fn test_role_title_credit_grants_presence_without_months() {
        let matcher = test_matcher();
        let mut agg = SkillAggregator::new();
        let role = CandidateRole {
            title: "Java Developer".to_string(),
            verified_duration_months: 12,
            start_date: Some(date(2022, 1)),
            end_date: Some(date(2023, 1)),
            raw_technologies: BTreeSet::new(),
            domains: vec![],
            mentions: vec![],
        };

        agg.process_role(&role, &matcher, &NullEmbedder).await;
        let skills = agg.finalize();

        let metrics = &skills["language_java"];
        assert!(metrics.has_presence);
        assert_eq!(metrics.total_months, 0);
        assert_eq!(metrics.evidence_sources, BTreeSet::from([MentionSource::RoleTitle]));
        assert_eq!(metrics.max_evidence_strength, 2);
        assert!(metrics.validate("language_java").is_ok());
    }

    #[tokio::test]
    async fn test_unresolved_mentions_are_dropped() {
        let matcher = test_matcher();
        let mut agg = SkillAggregator::new();
        let mut role = java_role("Developer", date(2022, 1), date(2023, 1), MentionSource::SkillsSection);
        role.mentions.push(Mention {
            raw_name: "UnknownFrameworkXYZ".to_string(),
            source: MentionSource::SkillsSection,
            confidence: 1.0,
            context: String::new(),
        });

        agg.process_role(&role, &matcher, &NullEmbedder).await;
        let skills = agg.finalize();
        assert_eq!(skills.len(), 1);
        assert!(skills.contains_key("language_java"));
    }

    #[test]
    fn test_validate_rejects_reversed_dates() {
        let metrics = SkillMetrics {
            first_used: Some(date(2024, 1)),
            last_used: Some(date(2022, 1)),
            ..Default::default()
        };
        assert!(metrics.validate("language_java").is_err());
    }

    #[test]
    fn test_validate_rejects_band_sum_mismatch() {
        let metrics = SkillMetrics {
            junior_months: 6,
            total_months: 12,
            evidence_sources: BTreeSet::from([MentionSource::SkillsSection]),
            ..Default::default()
        };
        assert!(metrics.validate("language_java").is_err());
    }
}
