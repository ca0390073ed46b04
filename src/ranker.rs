//! Deterministic weighted scoring of eligible candidates
//!
//! Scores are sums of per-requirement contributions normalized against the
//! maximum possible score for the JD, so a perfect candidate lands on 100
//! regardless of how many requirements the JD carries. Floating-point sums
//! run in requirement-declaration order and the final sort is stable, so a
//! given (JD, store snapshot) pair always ranks identically.

use crate::errors::TalentMatchError;
use crate::jd::{JobSkillProfile, Requirement, RequirementLevel};
use crate::matcher::{Embedder, MatchMethod, MatchOutcome, SkillMatcher};
use crate::profile::MentionSource;
use crate::store::{CandidateSkillRow, SkillStore};
use crate::taxonomy::SkillTaxonomy;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_RESULT_LIMIT: usize = 50;

const HARD_JD_WEIGHT: f64 = 1.0;
const SOFT_JD_WEIGHT: f64 = 0.4;
const VECTOR_NORM_PENALTY: f64 = 0.85;

/// Per-requirement entry in a candidate's score explanation.
#[derive(Debug, Clone, Serialize)]
pub struct SkillBreakdown {
    pub skill_name: String,
    /// "Skill" or "Category"
    pub requirement_kind: String,
    pub matched: bool,
    /// exact | alias | rule | vector | Unmatched
    pub match_type: String,
    pub experience_months: i64,
    pub last_used_date: Option<String>,
    /// Composite weight: jd_weight x role-adjusted skill-type weight
    pub weight: f64,
    /// Recency factor as a percentage
    pub recency_score: f64,
    /// Depth x recency competency as a percentage
    pub competency_score: f64,
    /// Share of the maximum possible score this requirement contributed
    pub contribution_to_total: f64,
    pub reason: String,
}

/// One ranked candidate in the §6 output schema.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub name: String,
    pub candidate_id: i64,
    pub score: f64,
    pub confidence: String,
    pub matches: Vec<String>,
    pub skill_breakdown: Vec<SkillBreakdown>,
    pub total_jd_skills: usize,
    pub matched_skill_count: usize,
    pub unmatched_skill_count: usize,
    pub unmatched_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub results: Vec<RankedCandidate>,
    pub role_context: String,
}

/// Confidence label by score band.
pub fn confidence_label(score: f64) -> &'static str {
    if score >= 80.0 {
        return "Strong Match";
    }
    if score >= 60.0 {
        return "Good Match";
    }
    if score >= 40.0 {
        return "Partial Match";
    }
    "Weak Match"
}

/// Experience factor: saturating log of months relative to the requirement.
fn experience_factor(total_months: i64, min_months: i64) -> f64 {
    (1.0 + total_months as f64 / min_months.max(1) as f64).ln().min(1.0)
}

/// Piecewise recency discount on months since last use.
fn recency_factor(months_since: f64) -> f64 {
    if months_since <= 12.0 {
        1.0
    } else if months_since <= 36.0 {
        0.8
    } else if months_since <= 60.0 {
        0.6
    } else {
        0.3
    }
}

fn months_since(reference_date: NaiveDate, last_used: Option<NaiveDate>) -> f64 {
    match last_used {
        Some(d) => (reference_date - d).num_days() as f64 / 30.0,
        // No recorded usage date reads as ancient
        None => f64::MAX,
    }
}

/// Competency reported in the breakdown for the UI: depth (36-month
/// saturation) x a coarser recency step. The raw contribution is what
/// ranks; this is the human-readable companion.
fn competency_score(
    total_months: i64,
    last_used: Option<NaiveDate>,
    reference_date: NaiveDate,
) -> f64 {
    let depth = (total_months as f64 / 36.0).min(1.0);
    let gap_months = match last_used {
        Some(d) => {
            (reference_date.year() as i64 - d.year() as i64) * 12
                + (reference_date.month() as i64 - d.month() as i64)
        }
        None => i64::MAX,
    };

    let recency = if gap_months < 12 {
        1.0
    } else if gap_months < 48 {
        0.6
    } else {
        0.25
    };

    depth * recency
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn format_last_used(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%m-%d-%Y").to_string())
}

/// Templated explanation for a matched row.
fn build_reason(row: &CandidateSkillRow) -> String {
    let mut reasons = vec![format!("{} months experience", row.total_months)];
    if row.senior_months > 0 {
        reasons.push("senior-level exposure".to_string());
    }
    if row.evidence_sources.contains(&MentionSource::SkillsSection) {
        reasons.push("explicitly listed by candidate".to_string());
    }
    if row.normalization_method == Some(MatchMethod::Vector) {
        reasons.push("semantic match".to_string());
    }
    reasons.join("; ")
}

pub struct Ranker<'a> {
    store: &'a dyn SkillStore,
    matcher: &'a SkillMatcher,
    taxonomy: &'a SkillTaxonomy,
    reference_date: NaiveDate,
}

struct ScoredCandidate {
    candidate: RankedCandidate,
    matched_months: i64,
    latest_last_used: Option<NaiveDate>,
}

impl<'a> Ranker<'a> {
    pub fn new(
        store: &'a dyn SkillStore,
        matcher: &'a SkillMatcher,
        taxonomy: &'a SkillTaxonomy,
        reference_date: NaiveDate,
    ) -> Self {
        Self { store, matcher, taxonomy, reference_date }
    }

    /// Theoretical maximum score for a JD, independent of any candidate.
    pub fn max_possible_score(
        jd: &JobSkillProfile,
        role_type_weights: &HashMap<String, f64>,
    ) -> f64 {
        let mut max_score = 0.0;
        for req in &jd.requirements {
            max_score += Self::composite_weight(req, role_type_weights);
        }
        round4(max_score)
    }

    fn jd_weight(level: RequirementLevel) -> f64 {
        match level {
            RequirementLevel::Hard => HARD_JD_WEIGHT,
            RequirementLevel::Soft => SOFT_JD_WEIGHT,
        }
    }

    fn composite_weight(req: &Requirement, role_type_weights: &HashMap<String, f64>) -> f64 {
        let skill_weight = match req {
            Requirement::Skill(r) => role_type_weights
                .get(r.skill_type_hint.as_str())
                .copied()
                .unwrap_or(1.0),
            // Category requirements score at framework weighting
            Requirement::Category(_) => {
                role_type_weights.get("framework").copied().unwrap_or(1.0)
            }
        };
        Self::jd_weight(req.requirement_level()) * skill_weight
    }

    /// Score the eligible candidates and emit the ranked, explainable list.
    pub async fn rank(
        &self,
        jd: &JobSkillProfile,
        eligible_ids: &HashSet<i64>,
        embedder: &dyn Embedder,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, TalentMatchError> {
        let role_type_weights = self.store.load_skill_type_weights(
            &jd.job_metadata.primary_domain,
            jd.job_metadata.seniority_level.as_str(),
        )?;
        let max_score = Self::max_possible_score(jd, &role_type_weights);

        let names = self.store.candidate_names(eligible_ids)?;

        // Resolve JD skill requirements once; every candidate is scored
        // against the same acceptable-code set (subtree + implications, so
        // an implying skill like ASP.NET scores a .NET requirement).
        let mut resolved_codes: Vec<Option<HashSet<String>>> =
            Vec::with_capacity(jd.requirements.len());
        for req in &jd.requirements {
            match req {
                Requirement::Skill(skill_req) => {
                    let outcome = self
                        .matcher
                        .resolve(&skill_req.raw_skill, &jd.role_context, false, embedder)
                        .await;
                    resolved_codes.push(match outcome {
                        MatchOutcome::Match(m) => {
                            let codes = self
                                .taxonomy
                                .acceptable_ids(&m.skill_code)
                                .iter()
                                .filter_map(|&id| self.taxonomy.get_by_id(id))
                                .map(|s| s.skill_code.clone())
                                .collect::<HashSet<String>>();
                            Some(codes)
                        }
                        _ => None,
                    });
                }
                Requirement::Category(_) => resolved_codes.push(None),
            }
        }

        let mut scored: Vec<ScoredCandidate> = Vec::with_capacity(eligible_ids.len());

        // Deterministic candidate visit order; the sort below decides the
        // final ranking.
        let mut ordered_ids: Vec<i64> = eligible_ids.iter().copied().collect();
        ordered_ids.sort_unstable();

        for candidate_id in ordered_ids {
            match self.score_candidate(candidate_id, jd, &resolved_codes, &role_type_weights, max_score, &names) {
                Ok(candidate) => scored.push(candidate),
                Err(e) => {
                    // A faulted candidate is dropped, never the whole rank
                    log::error!("[Ranker] Scoring candidate {} failed: {}", candidate_id, e);
                }
            }
        }

        scored.sort_by(|a, b| {
            b.candidate
                .score
                .partial_cmp(&a.candidate.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.matched_months.cmp(&a.matched_months))
                .then_with(|| b.latest_last_used.cmp(&a.latest_last_used))
        });

        Ok(scored.into_iter().take(limit).map(|s| s.candidate).collect())
    }

    fn score_candidate(
        &self,
        candidate_id: i64,
        jd: &JobSkillProfile,
        resolved_codes: &[Option<HashSet<String>>],
        role_type_weights: &HashMap<String, f64>,
        max_score: f64,
        names: &HashMap<i64, String>,
    ) -> Result<ScoredCandidate, TalentMatchError> {
        let rows = self.store.load_candidate_skills(candidate_id)?;
        let mut by_category: HashMap<&str, Vec<&CandidateSkillRow>> = HashMap::new();
        for row in &rows {
            if let Some(category) = &row.category {
                by_category.entry(category.as_str()).or_default().push(row);
            }
        }

        let mut total_score = 0.0;
        let mut matched_months = 0i64;
        let mut latest_last_used: Option<NaiveDate> = None;
        let mut breakdown = Vec::with_capacity(jd.requirements.len());
        let mut matches = Vec::new();
        let mut unmatched_skills = Vec::new();

        for (idx, req) in jd.requirements.iter().enumerate() {
            let weight = Self::composite_weight(req, role_type_weights);

            let (row, kind, min_months) = match req {
                Requirement::Skill(skill_req) => {
                    let row = resolved_codes[idx].as_ref().and_then(|codes| {
                        rows.iter()
                            .filter(|r| codes.contains(&r.skill_code))
                            .max_by_key(|r| (r.total_months, r.max_evidence_strength))
                    });
                    (row, "Skill", skill_req.min_months())
                }
                Requirement::Category(category_req) => {
                    // Strongest skill in the category wins: most months,
                    // then strongest evidence.
                    let best = by_category
                        .get(category_req.category.as_str())
                        .and_then(|rows| {
                            rows.iter()
                                .max_by_key(|r| (r.total_months, r.max_evidence_strength))
                                .copied()
                        });
                    (best, "Category", 0)
                }
            };

            let row = match row {
                Some(row) => row,
                None => {
                    unmatched_skills.push(req.display_name().to_string());
                    breakdown.push(SkillBreakdown {
                        skill_name: req.display_name().to_string(),
                        requirement_kind: kind.to_string(),
                        matched: false,
                        match_type: "Unmatched".to_string(),
                        experience_months: 0,
                        last_used_date: None,
                        weight: round4(weight),
                        recency_score: 0.0,
                        competency_score: 0.0,
                        contribution_to_total: 0.0,
                        reason: match req {
                            Requirement::Skill(_) => {
                                "Skill not present on candidate profile".to_string()
                            }
                            Requirement::Category(_) => {
                                "No skills in required category".to_string()
                            }
                        },
                    });
                    continue;
                }
            };

            let exp_factor = match req {
                Requirement::Skill(_) => experience_factor(row.total_months, min_months),
                Requirement::Category(_) => (1.0 + row.total_months as f64).ln().min(1.0),
            };
            let recency = recency_factor(months_since(self.reference_date, row.last_used));
            let evidence_factor = (row.max_evidence_strength as f64 / 3.0).min(1.0);
            let norm_penalty = if row.normalization_method == Some(MatchMethod::Vector) {
                VECTOR_NORM_PENALTY
            } else {
                1.0
            };

            let contribution = weight * exp_factor * recency * evidence_factor * norm_penalty;
            total_score += contribution;

            let competency = competency_score(row.total_months, row.last_used, self.reference_date);

            matched_months += row.total_months;
            latest_last_used = latest_last_used.max(row.last_used);

            let verified = row.evidence_sources.contains(&MentionSource::SkillsSection);
            matches.push(format!(
                "{} {}",
                req.display_name(),
                if verified { "(verified)" } else { "(inferred)" }
            ));

            let reason = match req {
                Requirement::Skill(_) => build_reason(row),
                Requirement::Category(category_req) => {
                    format!("Matched via {} ({})", row.skill_code, category_req.category)
                }
            };

            breakdown.push(SkillBreakdown {
                skill_name: req.display_name().to_string(),
                requirement_kind: kind.to_string(),
                matched: true,
                match_type: row
                    .normalization_method
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "Unmatched".to_string()),
                experience_months: row.total_months,
                last_used_date: format_last_used(row.last_used),
                weight: round4(weight),
                recency_score: round2(recency * 100.0),
                competency_score: round2((competency * 100.0).min(100.0)),
                contribution_to_total: if max_score > 0.0 {
                    round2(contribution * 100.0 / max_score)
                } else {
                    0.0
                },
                reason,
            });
        }

        let normalized = if max_score > 0.0 { total_score * 100.0 / max_score } else { 0.0 };
        let score = round4(normalized);
        let matched_skill_count = breakdown.iter().filter(|b| b.matched).count();

        Ok(ScoredCandidate {
            candidate: RankedCandidate {
                name: names
                    .get(&candidate_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Candidate {}", candidate_id)),
                candidate_id,
                score,
                confidence: confidence_label(score).to_string(),
                matches,
                total_jd_skills: jd.requirements.len(),
                matched_skill_count,
                unmatched_skill_count: jd.requirements.len() - matched_skill_count,
                unmatched_skills,
                skill_breakdown: breakdown,
            },
            matched_months,
            latest_last_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::SkillType;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn row(months: i64, last_used: NaiveDate, strength: i64, method: MatchMethod) -> CandidateSkillRow {
        CandidateSkillRow {
            skill_code: "language_java".to_string(),
            skill_type: SkillType::Programming,
            category: None,
            total_months: months,
            senior_months: 0,
            last_used: Some(last_used),
            max_evidence_strength: strength,
            normalization_method: Some(method),
            evidence_sources: vec![MentionSource::SkillsSection],
        }
    }

    #[test]
    fn test_experience_factor_saturates() {
        assert!(experience_factor(0, 12) < 0.1);
        assert_eq!(experience_factor(600, 12), 1.0);
        // min_months 0 is treated as 1
        assert_eq!(experience_factor(100, 0), 1.0);
    }

    #[test]
    fn test_recency_factor_steps() {
        assert_eq!(recency_factor(6.0), 1.0);
        assert_eq!(recency_factor(12.0), 1.0);
        assert_eq!(recency_factor(24.0), 0.8);
        assert_eq!(recency_factor(48.0), 0.6);
        assert_eq!(recency_factor(61.0), 0.3);
    }

    #[test]
    fn test_competency_score_bands() {
        let reference = date(2026, 1);
        // Fresh, saturated depth
        assert!((competency_score(48, Some(date(2025, 6)), reference) - 1.0).abs() < 1e-9);

        // Two-year gap lands in the 0.6 band
        assert!((competency_score(36, Some(date(2024, 1)), reference) - 0.6).abs() < 1e-9);

        // Five-year gap lands in the 0.25 band
        assert!((competency_score(36, Some(date(2021, 1)), reference) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_labels() {
        assert_eq!(confidence_label(95.0), "Strong Match");
        assert_eq!(confidence_label(80.0), "Strong Match");
        assert_eq!(confidence_label(65.0), "Good Match");
        assert_eq!(confidence_label(45.0), "Partial Match");
        assert_eq!(confidence_label(10.0), "Weak Match");
    }

    #[test]
    fn test_vector_penalty_lowers_contribution() {
        let reference = date(2026, 1);
        let exact_row = row(36, date(2025, 6), 3, MatchMethod::Exact);
        let vector_row = row(36, date(2025, 6), 3, MatchMethod::Vector);

        let factor = |r: &CandidateSkillRow| {
            let exp = experience_factor(r.total_months, 12);
            let rec = recency_factor(months_since(reference, r.last_used));
            let ev = (r.max_evidence_strength as f64 / 3.0).min(1.0);
            let pen = if r.normalization_method == Some(MatchMethod::Vector) { 0.85 } else { 1.0 };
            exp * rec * ev * pen
        };

        assert!(factor(&vector_row) < factor(&exact_row));
        assert!((factor(&vector_row) / factor(&exact_row) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_reason_template() {
        let mut r = row(24, date(2025, 6), 1, MatchMethod::Exact);
        r.senior_months = 12;
        let reason = build_reason(&r);
        assert!(reason.contains("24 months experience"));
        assert!(reason.contains("senior-level exposure"));
        assert!(reason.contains("explicitly listed by candidate"));
        assert!(!reason.contains("semantic match"));

        let r = row(24, date(2025, 6), 1, MatchMethod::Vector);
        assert!(build_reason(&r).contains("semantic match"));
    }
}
