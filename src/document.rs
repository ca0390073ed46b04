// Resume document handling: PDF text extraction and section bucketing

use crate::errors::TalentMatchError;
use std::path::Path;

/// Extract text from a PDF file
pub fn extract_text_from_pdf(file_path: &Path) -> Result<String, TalentMatchError> {
    let bytes = std::fs::read(file_path).map_err(|e| {
        TalentMatchError::Application(format!(
            "Failed to read PDF file {}: {}",
            file_path.to_string_lossy(),
            e
        ))
    })?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        TalentMatchError::Extraction(format!(
            "Failed to parse PDF file {}: {}",
            file_path.to_string_lossy(),
            e
        ))
    })?;

    Ok(text)
}

/// Resume text bucketed into the sections the extractor prompts care about.
#[derive(Debug, Default)]
pub struct DocumentSections {
    pub contact_info: String,
    pub experience: String,
    pub skills: String,
    pub other: String,
}

const EXPERIENCE_HEADERS: [&str; 5] = [
    "experience",
    "work experience",
    "employment history",
    "professional background",
    "career history",
];

const SKILLS_HEADERS: [&str; 4] = ["skills", "technical skills", "technologies", "expertise"];

fn header_bucket(line: &str) -> Option<&'static str> {
    let lower = line.trim().trim_end_matches(':').to_lowercase();
    // Headers are short; a long line containing "experience" is body text
    if lower.len() > 40 {
        return None;
    }
    if EXPERIENCE_HEADERS.iter().any(|h| lower == *h) {
        return Some("experience");
    }
    if SKILLS_HEADERS.iter().any(|h| lower == *h) {
        return Some("skills");
    }
    None
}

/// Bucket raw resume text by section headers. Everything before the first
/// recognized header counts as contact info (names and links live at the
/// top); unrecognized sections go to `other`. Section headers are kept in
/// the bucketed text so role titles and dates survive for the extractor.
pub fn bucket_sections(text: &str) -> DocumentSections {
    let mut sections = DocumentSections::default();
    let mut current = "contact_info";

    for line in text.lines() {
        if let Some(bucket) = header_bucket(line) {
            current = bucket;
        } else if line.trim().is_empty() {
            // keep paragraph breaks
        } else if current == "contact_info" && sections.contact_info.len() > 600 {
            // A resume that never declares sections: stop treating the
            // whole document as contact info
            current = "other";
        }

        let target = match current {
            "experience" => &mut sections.experience,
            "skills" => &mut sections.skills,
            "other" => &mut sections.other,
            _ => &mut sections.contact_info,
        };
        target.push_str(line);
        target.push('\n');
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_sections_basic() {
        let text = "Jane Doe\njane@example.com\n\nWork Experience\nSenior Java Developer\n2022 - Present\n\nTechnical Skills\nJava, Spring Boot";
        let sections = bucket_sections(text);

        assert!(sections.contact_info.contains("jane@example.com"));
        assert!(sections.experience.contains("Senior Java Developer"));
        assert!(sections.experience.contains("2022 - Present"));
        assert!(sections.skills.contains("Spring Boot"));
    }

    #[test]
    fn test_bucket_sections_headers_survive() {
        let text = "Jane Doe\n\nExperience\nDeveloper at Acme";
        let sections = bucket_sections(text);
        // The header line itself stays with the section body
        assert!(sections.experience.contains("Experience"));
    }

    #[test]
    fn test_long_line_is_not_a_header() {
        let line = "I have a lot of experience building things over many years of work";
        assert!(header_bucket(line).is_none());
        assert_eq!(header_bucket("Skills"), Some("skills"));
        assert_eq!(header_bucket("  EMPLOYMENT HISTORY:  "), Some("experience"));
    }
}
