//! Structured extraction prompts
//!
//! The LLM is used strictly as a transcriber: identity recovery, raw
//! experience extraction, and JD requirement parsing. All duration math and
//! all ranking stay in the deterministic core.

use crate::ai::provider::AiProvider;
use crate::errors::TalentMatchError;
use crate::jd::JobSkillProfile;
use crate::profile::{CandidateIdentity, RawExperienceItem};

/// Consolidate header/footer text to find the candidate's name and links.
pub async fn recover_identity(
    provider: &dyn AiProvider,
    contact_text: &str,
) -> Result<CandidateIdentity, TalentMatchError> {
    let prompt = format!(
        r#"You are an Identity Recovery Agent. Look at this text from a resume.

### TASK:
Extract the candidate's full name.
CLUE: If not explicitly stated, check the usernames in LinkedIn/GitHub links or the Personal Website URL.

### TEXT:
{contact_text}

### RETURN JSON ONLY:
{{
  "full_name": "extracted name",
  "email": "extracted email or null",
  "linkedin": "url or null",
  "github": "url or null"
}}"#
    );

    let value = provider.chat_json(&prompt).await?;
    let identity: CandidateIdentity = serde_json::from_value(value)?;
    if identity.full_name.trim().is_empty() {
        return Err(TalentMatchError::Extraction(
            "identity recovery produced an empty name".to_string(),
        ));
    }
    Ok(identity)
}

/// Extract raw roles, dates, and tagged skill mentions from the combined
/// experience text. Dates are transcribed, never calculated.
pub async fn extract_raw_experience(
    provider: &dyn AiProvider,
    experience_text: &str,
) -> Result<Vec<RawExperienceItem>, TalentMatchError> {
    let prompt = format!(
        r#"You are a Chronological Reconstruction Specialist for an ATS.

### LOGIC RULES:
1. DATE INHERITANCE: If a project or role is listed without specific dates, infer them from the preceding section.
2. ONGOING STATUS: If a role is the first one listed and lacks an end date, or its content suggests current involvement, mark end_date_raw as 'Present'.
3. RAW TRANSCRIPTION: Extract 'start_date_raw' and 'end_date_raw' as found or inferred. Do NOT calculate months.
4. While assigning domains, infer from technologies and responsibilities.
5. Do not guess or invent information not present in the text. Use null or an empty list where nothing is available.
6. end_date_raw must be a date string, "Present", or null.
7. Follow the OUTPUT SCHEMA strictly. Return JSON only.

### SKILL EXTRACTION RULES:
- Extract ALL mentioned technologies, tools, languages, frameworks, platforms, and methodologies.
- Do NOT normalize names. Use the exact spelling as found in text.
- Do NOT infer skills.
- Attach a source tag: technology_list | skills_section | responsibility

### INPUT TEXT:
{experience_text}

### OUTPUT SCHEMA (JSON):
{{
  "experience": [
    {{
      "job_title": string,
      "organization": string | null,
      "start_date_raw": string | null,
      "end_date_raw": string | "Present" | null,
      "technologies": [string],
      "domains": [string],
      "responsibilities": [string],
      "extracted_skills": [
        {{"raw_name": string, "source": "technology_list" | "skills_section" | "responsibility", "confidence": number}}
      ]
    }}
  ]
}}"#
    );

    let value = provider.chat_json(&prompt).await?;

    // Accept either the wrapped object or a bare array; models alternate
    // between the two.
    let items_value = if value.is_array() {
        value
    } else {
        value
            .get("experience")
            .cloned()
            .ok_or_else(|| {
                TalentMatchError::Extraction("response is missing the experience list".to_string())
            })?
    };

    let items: Vec<RawExperienceItem> = serde_json::from_value(items_value)?;
    if items.is_empty() {
        return Err(TalentMatchError::Extraction(
            "no work experience could be extracted".to_string(),
        ));
    }
    Ok(items)
}

/// Parse a job description into a structured requirement set. The allowed
/// primary domains come from the store; the engine clamps unknown values
/// afterwards.
pub async fn parse_job_profile(
    provider: &dyn AiProvider,
    jd_text: &str,
    primary_domains: &[String],
) -> Result<JobSkillProfile, TalentMatchError> {
    let domains = primary_domains.join(" | ");
    let prompt = format!(
        r#"You are an expert technical job description parser.

Analyze the Job Description and extract a structured JobSkillProfile in STRICT JSON.

### INPUT
Job Description:
{jd_text}

### OUTPUT FORMAT (STRICT)
Return ONLY a valid JSON object:
{{
  "role_context": string,
  "job_metadata": {{
    "primary_domain": string,
    "seniority_level": "Junior" | "Mid" | "Senior" | "Lead"
  }},
  "requirements": [ SkillRequirement | CategoryRequirement ]
}}

### PRIMARY DOMAIN
Choose EXACTLY ONE from: {domains}
If the JD is generic or unclear, use "General".

### TYPE 1: SkillRequirement (EXACT SKILL)
Use when the JD clearly requires a SPECIFIC skill or technology:
{{
  "raw_skill": string,
  "source": "explicit" | "inferred",
  "requirement_level": "hard" | "soft",
  "skill_type_hint": "programming" | "framework" | "cloud" | "database" | "tool" | "platform" | "methodology" | "other",
  "min_months": number,
  "expected_evidence": "resume_skill" | "experience_role" | "project" | "implicit"
}}
Use min_months = 0 if no duration is specified. Use "hard" only if the skill is mandatory.

### TYPE 2: CategoryRequirement (FLEXIBLE / ONE-OF)
Use ONLY for flexible wording like "at least one of", "such as", "or similar":
{{
  "group_id": string,
  "group_type": "category_any_of",
  "category": string,
  "min_required": number,
  "example_skills": [string],
  "requirement_level": "hard" | "soft",
  "source": "explicit" | "inferred"
}}
example_skills are illustrative only. min_required is usually 1. Do NOT create separate SkillRequirements for the example skills.

### GENERAL RULES
- At least ONE requirement must be "hard".
- Be conservative: do NOT infer skills unless strongly implied.
- Do NOT guess experience durations.
- Return valid JSON only, no explanations or markdown."#
    );

    let value = provider.chat_json(&prompt).await?;
    let profile: JobSkillProfile = serde_json::from_value(value)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock_provider::MockProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_recover_identity() {
        let provider = MockProvider::new();
        provider.push_chat_response(json!({
            "full_name": "Jane Doe",
            "email": "jane@example.com",
            "linkedin": null,
            "github": "https://github.com/janedoe"
        }));

        let identity = recover_identity(&provider, "header text").await.unwrap();
        assert_eq!(identity.full_name, "Jane Doe");
        assert_eq!(identity.github.as_deref(), Some("https://github.com/janedoe"));
    }

    #[tokio::test]
    async fn test_recover_identity_rejects_empty_name() {
        let provider = MockProvider::new();
        provider.push_chat_response(json!({"full_name": ""}));
        assert!(recover_identity(&provider, "header").await.is_err());
    }

    #[tokio::test]
    async fn test_extract_raw_experience_accepts_bare_array() {
        let provider = MockProvider::new();
        provider.push_chat_response(json!([{
            "job_title": "Senior Java Developer",
            "start_date_raw": "2022-01",
            "end_date_raw": "Present",
            "domains": ["backend"],
            "extracted_skills": [
                {"raw_name": "Java", "source": "skills_section", "confidence": 1.0}
            ]
        }]));

        let items = extract_raw_experience(&provider, "text").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].job_title, "Senior Java Developer");
        assert_eq!(items[0].extracted_skills.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_raw_experience_rejects_empty() {
        let provider = MockProvider::new();
        provider.push_chat_response(json!({"experience": []}));
        assert!(extract_raw_experience(&provider, "text").await.is_err());
    }

    #[tokio::test]
    async fn test_parse_job_profile() {
        let provider = MockProvider::new();
        provider.push_chat_response(json!({
            "role_context": "Senior backend engineer for a payments platform",
            "job_metadata": {"primary_domain": "Backend", "seniority_level": "Senior"},
            "requirements": [{
                "raw_skill": "Java",
                "source": "explicit",
                "requirement_level": "hard",
                "skill_type_hint": "programming",
                "min_months": 24,
                "expected_evidence": "resume_skill"
            }]
        }));

        let profile = parse_job_profile(&provider, "jd text", &["Backend".to_string()])
            .await
            .unwrap();
        assert_eq!(profile.job_metadata.primary_domain, "Backend");
        assert_eq!(profile.requirements.len(), 1);
    }
}
