//! Deterministic text canonicalization for skill matching
//!
//! Everything in this module is a pure function. Canonicalization is NOT
//! inference: it folds spelling variants of the same term onto one form so
//! the matcher can compare strings directly.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn separator_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[_\-/]+").unwrap())
}

fn suffix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:programming|language|framework)\b").unwrap())
}

fn html_version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bhtml\s*5\b").unwrap())
}

fn css_version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bcss\s*3\b").unwrap())
}

fn whitespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_alnum_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s]").unwrap())
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9+#.]+").unwrap())
}

/// Canonicalize raw skill text before matching.
///
/// Examples:
/// - "React.js" -> "reactjs"
/// - "HTML5" -> "html"
/// - "C Sharp" -> "c#"
/// - "Java programming language" -> "java"
pub fn canonicalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut t = raw.to_lowercase().trim().to_string();

    // react.js -> reactjs
    t = t.replace('.', "");
    t = separator_pattern().replace_all(&t, " ").into_owned();

    // Decorative suffix words carry no signal
    t = suffix_pattern().replace_all(&t, "").into_owned();

    // Version suffixes
    t = html_version_pattern().replace_all(&t, "html").into_owned();
    t = css_version_pattern().replace_all(&t, "css").into_owned();

    // C# spellings
    t = t.replace("c sharp", "c#");
    t = t.replace("csharp", "c#");

    whitespace_pattern().replace_all(&t, " ").trim().to_string()
}

/// Canonicalize a job title for deterministic matching against the
/// role-title skill map. This is NOT inference.
pub fn canonicalize_job_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }

    let mut t = title.to_lowercase();
    t = separator_pattern().replace_all(&t, " ").into_owned();

    // Spell out .NET variants so "Dot Net Developer" and ".NET Developer"
    // collapse to the same key. Order matters: ".net" rewrites the tail of
    // "asp.net" as well.
    t = t.replace(".net", " dot net ");
    t = t.replace("dotnet", " dot net ");

    t = non_alnum_pattern().replace_all(&t, "").into_owned();
    whitespace_pattern().replace_all(&t, " ").trim().to_string()
}

const COMPOSITE_SEPARATORS: [&str; 6] = ["/", "\\", ",", " & ", " and ", "+"];

/// Split explicit composite skill mentions into atomic skills
/// ("HTML/CSS" -> ["html", "css"]). This is NOT inference.
pub fn split_composite(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut text = raw.to_lowercase().trim().to_string();
    for sep in COMPOSITE_SEPARATORS {
        text = text.replace(sep, "|");
    }

    text.split('|')
        .map(str::trim)
        .filter(|p| p.len() >= 2)
        .map(str::to_string)
        .collect()
}

/// Tokenize text into lowercase word-like tokens (`[a-z0-9+#.]+`).
pub fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_drops_periods() {
        assert_eq!(canonicalize("React.js"), "reactjs");
        assert_eq!(canonicalize("Node.js"), "nodejs");
    }

    #[test]
    fn test_canonicalize_separators_and_suffixes() {
        assert_eq!(canonicalize("java_programming"), "java");
        assert_eq!(canonicalize("Java programming language"), "java");
        assert_eq!(canonicalize("spring-framework"), "spring");
    }

    #[test]
    fn test_canonicalize_versions() {
        assert_eq!(canonicalize("HTML5"), "html");
        assert_eq!(canonicalize("HTML 5"), "html");
        assert_eq!(canonicalize("CSS3"), "css");
    }

    #[test]
    fn test_canonicalize_c_sharp() {
        assert_eq!(canonicalize("C Sharp"), "c#");
        assert_eq!(canonicalize("CSharp"), "c#");
        assert_eq!(canonicalize("C#"), "c#");
    }

    #[test]
    fn test_canonicalize_idempotent() {
        for raw in ["React.js", "HTML5", "C Sharp", "ASP.NET MVC", "  Python  "] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_canonicalize_job_title_dot_net() {
        assert_eq!(canonicalize_job_title(".NET Developer"), "dot net developer");
        assert_eq!(canonicalize_job_title("DotNet Developer"), "dot net developer");
        assert_eq!(canonicalize_job_title("Senior Java/J2EE Engineer"), "senior java j2ee engineer");
    }

    #[test]
    fn test_split_composite_html_css() {
        assert_eq!(split_composite("HTML/CSS"), vec!["html", "css"]);
        assert_eq!(split_composite("HTML, CSS and JavaScript"), vec!["html", "css", "javascript"]);
    }

    #[test]
    fn test_split_composite_drops_short_fragments() {
        // "C++/CLI" -> the "c" fragment (len 1) is dropped
        assert_eq!(split_composite("C++/CLI"), vec!["cli"]);
        assert!(split_composite("").is_empty());
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("asp dotnet mvc c#");
        assert!(tokens.contains("asp"));
        assert!(tokens.contains("dotnet"));
        assert!(tokens.contains("mvc"));
        assert!(tokens.contains("c#"));
        assert_eq!(tokens.len(), 4);
    }
}
