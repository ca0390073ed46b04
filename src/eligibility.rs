//! Eligibility gate: hard-filter candidates before any scoring
//!
//! A candidate must satisfy every hard requirement; soft requirements never
//! filter. Requirements the matcher cannot resolve are skipped, not failed:
//! a JD mentioning something unknown cannot exclude anyone.

use crate::errors::TalentMatchError;
use crate::jd::{JobSkillProfile, Requirement, RequirementLevel, SeniorityLevel};
use crate::matcher::{Embedder, MatchOutcome, SkillMatcher};
use crate::store::SkillStore;
use crate::taxonomy::SkillTaxonomy;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

/// Default window after which experience stops counting as current.
pub const RECENCY_MONTHS_LIMIT: i64 = 36;

/// Minimum months a candidate needs at each JD seniority level.
#[derive(Debug, Clone, Copy)]
pub struct SeniorityThresholds {
    pub min_total_months: i64,
    pub min_mid_months: i64,
    pub min_senior_months: i64,
}

pub fn thresholds_for(level: SeniorityLevel) -> SeniorityThresholds {
    match level {
        SeniorityLevel::Junior => SeniorityThresholds {
            min_total_months: 6,
            min_mid_months: 0,
            min_senior_months: 0,
        },
        SeniorityLevel::Mid => SeniorityThresholds {
            min_total_months: 18,
            min_mid_months: 12,
            min_senior_months: 0,
        },
        SeniorityLevel::Senior => SeniorityThresholds {
            min_total_months: 36,
            min_mid_months: 24,
            min_senior_months: 12,
        },
        SeniorityLevel::Lead => SeniorityThresholds {
            min_total_months: 60,
            min_mid_months: 36,
            min_senior_months: 24,
        },
    }
}

/// Hard requirements need evidence at role-title strength or better; soft
/// requirements accept a plain skills-section listing.
pub fn required_evidence_strength(level: RequirementLevel) -> i64 {
    match level {
        RequirementLevel::Hard => 2,
        RequirementLevel::Soft => 1,
    }
}

pub struct EligibilityGate<'a> {
    store: &'a dyn SkillStore,
    taxonomy: &'a SkillTaxonomy,
    matcher: &'a SkillMatcher,
}

impl<'a> EligibilityGate<'a> {
    pub fn new(
        store: &'a dyn SkillStore,
        taxonomy: &'a SkillTaxonomy,
        matcher: &'a SkillMatcher,
    ) -> Self {
        Self { store, taxonomy, matcher }
    }

    /// Candidate ids satisfying ALL hard JD requirements using the skill
    /// hierarchy, implications, evidence strength, seniority thresholds,
    /// and the recency constraint. The final set is the intersection across
    /// requirements; it returns early the moment it empties.
    pub async fn eligible_candidates(
        &self,
        jd: &JobSkillProfile,
        embedder: &dyn Embedder,
        reference_date: NaiveDate,
        recency_months_limit: i64,
    ) -> Result<HashSet<i64>, TalentMatchError> {
        let hard_requirements: Vec<&Requirement> =
            jd.requirements.iter().filter(|r| r.is_hard()).collect();

        if hard_requirements.is_empty() {
            return Ok(HashSet::new());
        }

        let thresholds = thresholds_for(jd.job_metadata.seniority_level);
        let recency_cutoff = reference_date - Duration::days(recency_months_limit * 30);

        let mut eligible: Option<HashSet<i64>> = None;

        for req in hard_requirements {
            let required_strength = required_evidence_strength(req.requirement_level());

            let candidate_ids = match req {
                Requirement::Skill(skill_req) => {
                    let outcome = self
                        .matcher
                        .resolve(&skill_req.raw_skill, &jd.role_context, false, embedder)
                        .await;

                    let matched = match outcome {
                        MatchOutcome::Match(m) => m,
                        _ => {
                            // Unknown to the taxonomy: skip rather than
                            // excluding every candidate.
                            log::info!(
                                "[EligibilityGate] Unresolved requirement {:?}; skipping",
                                skill_req.raw_skill
                            );
                            continue;
                        }
                    };

                    let acceptable_ids = self.taxonomy.acceptable_ids(&matched.skill_code);
                    self.store.query_eligible_candidates(
                        &acceptable_ids,
                        skill_req.min_months(),
                        required_strength,
                        thresholds.min_mid_months,
                        thresholds.min_senior_months,
                        recency_cutoff,
                    )?
                }
                Requirement::Category(category_req) => self.store.query_category_candidates(
                    &category_req.category,
                    category_req.min_required,
                    required_strength,
                    thresholds.min_mid_months,
                    thresholds.min_senior_months,
                    recency_cutoff,
                )?,
            };

            log::debug!(
                "[EligibilityGate] Requirement {:?} admits {} candidates",
                req.display_name(),
                candidate_ids.len()
            );

            eligible = Some(match eligible {
                None => candidate_ids,
                Some(current) => current.intersection(&candidate_ids).copied().collect(),
            });

            if eligible.as_ref().is_some_and(HashSet::is_empty) {
                return Ok(HashSet::new());
            }
        }

        Ok(eligible.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table() {
        let junior = thresholds_for(SeniorityLevel::Junior);
        assert_eq!((junior.min_total_months, junior.min_mid_months, junior.min_senior_months), (6, 0, 0));

        let mid = thresholds_for(SeniorityLevel::Mid);
        assert_eq!((mid.min_total_months, mid.min_mid_months, mid.min_senior_months), (18, 12, 0));

        let senior = thresholds_for(SeniorityLevel::Senior);
        assert_eq!((senior.min_total_months, senior.min_mid_months, senior.min_senior_months), (36, 24, 12));

        let lead = thresholds_for(SeniorityLevel::Lead);
        assert_eq!((lead.min_total_months, lead.min_mid_months, lead.min_senior_months), (60, 36, 24));
    }

    #[test]
    fn test_required_evidence_strength() {
        assert_eq!(required_evidence_strength(RequirementLevel::Hard), 2);
        assert_eq!(required_evidence_strength(RequirementLevel::Soft), 1);
    }
}
