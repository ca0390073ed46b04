//! Job description requirement model and deterministic post-processing
//!
//! The LLM produces a raw `JobSkillProfile`; everything after that is
//! deterministic. The post-processor normalizes malformed fields and
//! enforces schema invariants. It never adds, removes, or reinterprets
//! requirements.

use crate::errors::ValidationError;
use crate::taxonomy::SkillType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementLevel {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSource {
    Explicit,
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedEvidence {
    ResumeSkill,
    ExperienceRole,
    Project,
    Implicit,
}

/// Target seniority of the JD. Values are capitalized on the wire
/// ("Junior" | "Mid" | "Senior" | "Lead").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeniorityLevel {
    Junior,
    Mid,
    Senior,
    Lead,
}

impl SeniorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeniorityLevel::Junior => "Junior",
            SeniorityLevel::Mid => "Mid",
            SeniorityLevel::Senior => "Senior",
            SeniorityLevel::Lead => "Lead",
        }
    }
}

/// A requirement for one specific skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub raw_skill: String,
    pub source: SkillSource,
    pub requirement_level: RequirementLevel,
    pub skill_type_hint: SkillType,
    #[serde(default)]
    pub min_months: Option<i64>,
    #[serde(default)]
    pub skill_group_id: Option<String>,
    pub expected_evidence: ExpectedEvidence,
}

impl SkillRequirement {
    pub fn min_months(&self) -> i64 {
        self.min_months.unwrap_or(0)
    }
}

/// An "any-of-category" requirement: the JD asks for a capability, not a
/// specific brand. `category` must map to `MasterSkill.category`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequirement {
    pub group_id: String,
    #[serde(default)]
    pub group_type: Option<String>,
    pub category: String,
    pub min_required: i64,
    #[serde(default)]
    pub example_skills: Vec<String>,
    pub requirement_level: RequirementLevel,
    pub source: SkillSource,
}

/// Mixed requirement union. Untagged on the wire: a `raw_skill` field marks
/// a skill requirement, a `category` field marks a category requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    Skill(SkillRequirement),
    Category(CategoryRequirement),
}

impl Requirement {
    pub fn requirement_level(&self) -> RequirementLevel {
        match self {
            Requirement::Skill(r) => r.requirement_level,
            Requirement::Category(r) => r.requirement_level,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.requirement_level() == RequirementLevel::Hard
    }

    /// Display name used in breakdowns and unmatched lists.
    pub fn display_name(&self) -> &str {
        match self {
            Requirement::Skill(r) => &r.raw_skill,
            Requirement::Category(r) => &r.category,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub primary_domain: String,
    pub seniority_level: SeniorityLevel,
}

/// Structured requirement set parsed from a job description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSkillProfile {
    pub role_context: String,
    pub job_metadata: JobMetadata,
    pub requirements: Vec<Requirement>,
}

pub const GENERAL_DOMAIN: &str = "General";

impl JobSkillProfile {
    /// Schema invariant: at least one hard requirement.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.requirements.iter().any(|r| r.is_hard()) {
            return Err(ValidationError::BusinessRule(
                "Job profile must contain at least one hard requirement".to_string(),
            ));
        }
        Ok(())
    }

    /// Clamp the primary domain to the store-driven whitelist; unknown
    /// values fall back to "General".
    pub fn clamp_primary_domain(&mut self, allowed_domains: &[String]) {
        if !allowed_domains.iter().any(|d| d == &self.job_metadata.primary_domain) {
            log::warn!(
                "[JobSkillProfile] Unknown primary domain {:?}; falling back to {}",
                self.job_metadata.primary_domain,
                GENERAL_DOMAIN
            );
            self.job_metadata.primary_domain = GENERAL_DOMAIN.to_string();
        }
    }
}

/// Deterministic, non-inferential cleanup of an LLM-parsed JD profile.
///
/// This MUST NOT introduce new requirements, change hard/soft intent beyond
/// the tool downgrade below, infer skills, or rebalance experience
/// semantics. It MAY normalize malformed fields and enforce invariants.
pub fn post_process(mut jd: JobSkillProfile) -> JobSkillProfile {
    for req in &mut jd.requirements {
        match req {
            Requirement::Category(category) => {
                if category.min_required < 1 {
                    category.min_required = 1;
                }
            }
            Requirement::Skill(skill) => {
                if skill.min_months.is_none() {
                    skill.min_months = Some(0);
                }

                // Methodologies never gate eligibility
                if skill.skill_type_hint == SkillType::Methodology {
                    skill.min_months = Some(0);
                    skill.expected_evidence = ExpectedEvidence::Implicit;
                }

                // LLMs routinely over-promote tools to hard requirements
                if skill.skill_type_hint == SkillType::Tool
                    && skill.requirement_level == RequirementLevel::Hard
                {
                    skill.requirement_level = RequirementLevel::Soft;
                    skill.expected_evidence = ExpectedEvidence::Project;
                }
            }
        }
    }

    jd
}
