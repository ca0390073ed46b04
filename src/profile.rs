//! Profile builder: raw extracted experience -> structured candidate roles
//!
//! The LLM extractor transcribes dates and skill mentions; everything
//! time-related is computed here deterministically. Duration math never
//! trusts the model.

use crate::canonicalize::{canonicalize, canonicalize_job_title, split_composite};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a skill mention was observed in the resume. Ordering matters only
/// for stable serialization of evidence-source sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionSource {
    SkillsSection,
    TechnologyList,
    Responsibility,
    RoleTitle,
    Implicit,
}

impl MentionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentionSource::SkillsSection => "skills_section",
            MentionSource::TechnologyList => "technology_list",
            MentionSource::Responsibility => "responsibility",
            MentionSource::RoleTitle => "role_title",
            MentionSource::Implicit => "implicit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "skills_section" => Some(MentionSource::SkillsSection),
            "technology_list" => Some(MentionSource::TechnologyList),
            "responsibility" => Some(MentionSource::Responsibility),
            "role_title" => Some(MentionSource::RoleTitle),
            "implicit" => Some(MentionSource::Implicit),
            _ => None,
        }
    }

    /// Weight a mention contributes to `evidence_score` and the blended
    /// confidence. Implicit mentions are neutralized here rather than
    /// filtered, so they can still mark usage periods.
    pub fn evidence_weight(&self) -> f64 {
        match self {
            MentionSource::SkillsSection => 1.0,
            MentionSource::TechnologyList => 0.9,
            MentionSource::Responsibility => 0.7,
            MentionSource::RoleTitle => 0.0,
            MentionSource::Implicit => 0.0,
        }
    }

    /// Ordinal strength of the evidence: a skill exercised in a
    /// responsibility outranks one merely listed.
    pub fn evidence_strength(&self) -> i64 {
        match self {
            MentionSource::Responsibility => 3,
            MentionSource::RoleTitle => 2,
            MentionSource::SkillsSection => 1,
            MentionSource::TechnologyList => 1,
            MentionSource::Implicit => 0,
        }
    }
}

/// A skill mention as tagged by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSkill {
    pub raw_name: String,
    pub source: MentionSource,
    #[serde(default = "default_mention_confidence")]
    pub confidence: f64,
}

fn default_mention_confidence() -> f64 {
    1.0
}

/// One work-experience entry as extracted from a resume (ingestion input
/// contract). Dates arrive as raw strings; "Present" and null are legal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExperienceItem {
    pub job_title: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub start_date_raw: Option<String>,
    #[serde(default)]
    pub end_date_raw: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub extracted_skills: Vec<ExtractedSkill>,
}

/// Candidate identity recovered from the resume header/footer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

/// A single skill mention queued for normalization.
#[derive(Debug, Clone)]
pub struct Mention {
    pub raw_name: String,
    pub source: MentionSource,
    pub confidence: f64,
    pub context: String,
}

/// A verified role: deterministic duration, resolved dates, canonicalized
/// technology set, and the mentions to aggregate.
#[derive(Debug, Clone)]
pub struct CandidateRole {
    pub title: String,
    pub verified_duration_months: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub raw_technologies: BTreeSet<String>,
    pub domains: Vec<String>,
    pub mentions: Vec<Mention>,
}

/// Seniority band inferred from a role title. Bands partition experience
/// months in the per-skill accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeniorityBand {
    Junior,
    Mid,
    Senior,
}

/// Band from title keywords: intern/trainee/junior/associate -> junior,
/// senior/lead/principal -> senior, everything else -> mid.
pub fn seniority_band_from_title(title: &str) -> SeniorityBand {
    let t = title.to_lowercase();
    if ["intern", "trainee", "junior", "associate"].iter().any(|k| t.contains(k)) {
        return SeniorityBand::Junior;
    }
    if ["senior", "lead", "principal"].iter().any(|k| t.contains(k)) {
        return SeniorityBand::Senior;
    }
    SeniorityBand::Mid
}

/// Parse the date formats resumes actually contain. Day-less formats
/// resolve to the first of the month/year.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%B %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }

    // Month-year forms: 2022-01, 01/2022, Jan 2022, January 2022.
    // Prefix a day so the formats parse to the first of the month.
    let with_day = format!("1 {}", raw);
    for fmt in ["%d %Y-%m", "%d %m/%Y", "%d %b %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&with_day, fmt) {
            return Some(d);
        }
    }

    // Bare year
    if let Ok(year) = raw.parse::<i32>() {
        if (1900..=2100).contains(&year) {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }

    None
}

/// Whether a raw end date means "still in this role".
fn is_ongoing(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    lower.contains("present") || raw == "N/A" || lower == "n/a" || lower == "current"
}

/// Resolve a raw end date. Missing or ongoing dates resolve to the
/// configured reference date so tests are deterministic.
pub fn resolve_end_date(raw: Option<&str>, reference_date: NaiveDate) -> Option<NaiveDate> {
    match raw {
        None => Some(reference_date),
        Some(r) if is_ongoing(r) => Some(reference_date),
        Some(r) => parse_flexible_date(r),
    }
}

/// Whole months between two dates: `(end.year - start.year) * 12 +
/// (end.month - start.month)`. Unparseable dates yield 0 with a warning
/// from the caller.
pub fn calculate_duration(start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
    match (start, end) {
        (Some(s), Some(e)) => {
            let months =
                (e.year() as i64 - s.year() as i64) * 12 + (e.month() as i64 - s.month() as i64);
            months.max(0)
        }
        _ => 0,
    }
}

/// Collect validated skill mentions for a role. Composite mentions
/// ("HTML/CSS") split into atomic skills before matching; the role's
/// responsibilities become the disambiguation context.
pub fn collect_role_mentions(item: &RawExperienceItem) -> Vec<Mention> {
    let context = item.responsibilities.join(" ");
    let mut mentions = Vec::new();

    for skill in &item.extracted_skills {
        for part in split_composite(&skill.raw_name) {
            mentions.push(Mention {
                raw_name: part,
                source: skill.source,
                confidence: skill.confidence,
                context: context.clone(),
            });
        }
    }

    mentions
}

/// Build verified candidate roles from raw extracted experience.
pub fn build_candidate_roles(
    raw_experience: &[RawExperienceItem],
    reference_date: NaiveDate,
) -> Vec<CandidateRole> {
    let mut roles = Vec::with_capacity(raw_experience.len());

    for item in raw_experience {
        let start_date = item.start_date_raw.as_deref().and_then(parse_flexible_date);
        let end_date = resolve_end_date(item.end_date_raw.as_deref(), reference_date);

        if start_date.is_none() {
            log::warn!(
                "[ProfileBuilder] Unparseable start date {:?} for role {:?}; duration is 0",
                item.start_date_raw,
                item.job_title
            );
        }

        let raw_technologies = item
            .technologies
            .iter()
            .map(|t| canonicalize(t))
            .filter(|t| !t.is_empty())
            .collect();

        roles.push(CandidateRole {
            title: item.job_title.clone(),
            verified_duration_months: calculate_duration(start_date, end_date),
            start_date,
            end_date,
            raw_technologies,
            domains: item.domains.clone(),
            mentions: collect_role_mentions(item),
        });
    }

    roles
}

/// Fixed map from canonicalized role-title keys to skill codes. Broad
/// stacks (".NET developer") often appear only in the title, never in the
/// experience detail; the aggregator grants presence (not months) for
/// these.
pub const ROLE_TITLE_SKILL_MAP: [(&str, &[&str]); 3] = [
    ("dot net developer", &["framework_dotnet"]),
    ("python developer", &["language_python"]),
    ("frontend developer", &["web_html", "web_css", "language_javascript"]),
];

/// Skill codes credited by a role title, if any.
pub fn role_title_skill_codes(title: &str) -> Vec<&'static str> {
    let normalized = canonicalize_job_title(title);
    let mut codes = Vec::new();
    for (key, skill_codes) in ROLE_TITLE_SKILL_MAP {
        if normalized.contains(key) {
            codes.extend_from_slice(skill_codes);
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_flexible_date_formats() {
        assert_eq!(parse_flexible_date("2022-01-15"), Some(date(2022, 1, 15)));
        assert_eq!(parse_flexible_date("2022-01"), Some(date(2022, 1, 1)));
        assert_eq!(parse_flexible_date("01/2022"), Some(date(2022, 1, 1)));
        assert_eq!(parse_flexible_date("Jan 2022"), Some(date(2022, 1, 1)));
        assert_eq!(parse_flexible_date("January 2022"), Some(date(2022, 1, 1)));
        assert_eq!(parse_flexible_date("2022"), Some(date(2022, 1, 1)));
        assert_eq!(parse_flexible_date("not a date"), None);
    }

    #[test]
    fn test_resolve_end_date_present_variants() {
        let reference = date(2026, 1, 1);
        assert_eq!(resolve_end_date(None, reference), Some(reference));
        assert_eq!(resolve_end_date(Some("Present"), reference), Some(reference));
        assert_eq!(resolve_end_date(Some("present (ongoing)"), reference), Some(reference));
        assert_eq!(resolve_end_date(Some("N/A"), reference), Some(reference));
        assert_eq!(resolve_end_date(Some("2024-06"), reference), Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_calculate_duration() {
        assert_eq!(calculate_duration(Some(date(2022, 1, 1)), Some(date(2024, 1, 1))), 24);
        assert_eq!(calculate_duration(Some(date(2022, 3, 1)), Some(date(2022, 9, 15))), 6);
        assert_eq!(calculate_duration(None, Some(date(2024, 1, 1))), 0);
        // End before start clamps to zero rather than going negative
        assert_eq!(calculate_duration(Some(date(2024, 1, 1)), Some(date(2022, 1, 1))), 0);
    }

    #[test]
    fn test_seniority_band_from_title() {
        assert_eq!(seniority_band_from_title("Software Engineering Intern"), SeniorityBand::Junior);
        assert_eq!(seniority_band_from_title("Associate Developer"), SeniorityBand::Junior);
        assert_eq!(seniority_band_from_title("Senior Java Developer"), SeniorityBand::Senior);
        assert_eq!(seniority_band_from_title("Principal Engineer"), SeniorityBand::Senior);
        assert_eq!(seniority_band_from_title("Software Developer"), SeniorityBand::Mid);
    }

    #[test]
    fn test_collect_role_mentions_splits_composites() {
        let item = RawExperienceItem {
            job_title: "Frontend Developer".to_string(),
            organization: None,
            start_date_raw: Some("2022-01".to_string()),
            end_date_raw: Some("2023-01".to_string()),
            technologies: vec![],
            domains: vec!["frontend".to_string()],
            responsibilities: vec!["Built responsive UIs".to_string()],
            extracted_skills: vec![ExtractedSkill {
                raw_name: "HTML/CSS".to_string(),
                source: MentionSource::SkillsSection,
                confidence: 1.0,
            }],
        };

        let mentions = collect_role_mentions(&item);
        let names: Vec<&str> = mentions.iter().map(|m| m.raw_name.as_str()).collect();
        assert_eq!(names, vec!["html", "css"]);
        assert!(mentions.iter().all(|m| m.context == "Built responsive UIs"));
    }

    #[test]
    fn test_role_title_skill_codes() {
        assert_eq!(role_title_skill_codes(".NET Developer"), vec!["framework_dotnet"]);
        assert_eq!(role_title_skill_codes("Senior DotNet Developer"), vec!["framework_dotnet"]);
        assert_eq!(
            role_title_skill_codes("Frontend Developer"),
            vec!["web_html", "web_css", "language_javascript"]
        );
        assert!(role_title_skill_codes("Database Administrator").is_empty());
    }

    #[test]
    fn test_build_candidate_roles_reference_date() {
        let items = vec![RawExperienceItem {
            job_title: "Senior Java Developer".to_string(),
            organization: Some("Acme".to_string()),
            start_date_raw: Some("2022-01".to_string()),
            end_date_raw: Some("Present".to_string()),
            technologies: vec!["React.js".to_string()],
            domains: vec!["backend".to_string()],
            responsibilities: vec![],
            extracted_skills: vec![],
        }];

        let roles = build_candidate_roles(&items, date(2026, 1, 1));
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].verified_duration_months, 48);
        assert_eq!(roles[0].end_date, Some(date(2026, 1, 1)));
        assert!(roles[0].raw_technologies.contains("reactjs"));
    }
}
