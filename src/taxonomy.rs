//! Master skill taxonomy
//!
//! Master skills form a DAG via `parent_skill_id`; implications form a
//! separate directed graph. Both are held in arena-style storage (one
//! contiguous list of skills addressed by integer ids) and subtree expansion
//! walks iteratively with an explicit stack.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Taxonomy-level classification of a master skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Programming,
    Framework,
    Cloud,
    Database,
    Tool,
    Platform,
    Methodology,
    Other,
}

impl SkillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillType::Programming => "programming",
            SkillType::Framework => "framework",
            SkillType::Cloud => "cloud",
            SkillType::Database => "database",
            SkillType::Tool => "tool",
            SkillType::Platform => "platform",
            SkillType::Methodology => "methodology",
            SkillType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "programming" => SkillType::Programming,
            "framework" => SkillType::Framework,
            "cloud" => SkillType::Cloud,
            "database" => SkillType::Database,
            "tool" => SkillType::Tool,
            "platform" => SkillType::Platform,
            "methodology" => SkillType::Methodology,
            _ => SkillType::Other,
        }
    }
}

/// Block/allow guards stored per master skill as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisambiguationRules {
    #[serde(default)]
    pub block_if_contains: Vec<String>,
    #[serde(default)]
    pub allow_if_contains: Vec<String>,
}

/// One node of the master skill taxonomy.
#[derive(Debug, Clone)]
pub struct MasterSkill {
    pub skill_id: i64,
    pub skill_code: String,
    pub skill_name: String,
    pub skill_type: SkillType,
    pub category: Option<String>,
    pub parent_skill_id: Option<i64>,
    pub aliases: Vec<String>,
    /// All tokens must appear in a mention for a rule match.
    pub tokens: Vec<String>,
    pub disambiguation_rules: Option<DisambiguationRules>,
}

/// Directed edge: demonstrated experience in `from` implies credit for `to`.
#[derive(Debug, Clone)]
pub struct SkillImplication {
    pub from_skill_code: String,
    pub to_skill_code: String,
}

/// Arena of master skills with id/code lookup, child links, and the
/// implication graph. Loaded once at engine construction and immutable
/// afterwards.
pub struct SkillTaxonomy {
    skills: Vec<MasterSkill>,
    by_id: HashMap<i64, usize>,
    by_code: HashMap<String, usize>,
    children: HashMap<i64, Vec<i64>>,
    implied: HashMap<String, Vec<i64>>,
}

impl SkillTaxonomy {
    pub fn new(skills: Vec<MasterSkill>, implications: Vec<SkillImplication>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_code = HashMap::new();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();

        for (idx, skill) in skills.iter().enumerate() {
            by_id.insert(skill.skill_id, idx);
            by_code.insert(skill.skill_code.clone(), idx);
            if let Some(parent) = skill.parent_skill_id {
                children.entry(parent).or_default().push(skill.skill_id);
            }
        }

        let mut implied: HashMap<String, Vec<i64>> = HashMap::new();
        for imp in implications {
            if let Some(&idx) = by_code.get(&imp.to_skill_code) {
                implied
                    .entry(imp.from_skill_code)
                    .or_default()
                    .push(skills[idx].skill_id);
            } else {
                log::warn!(
                    "[SkillTaxonomy] Implication target {} is not a known skill code",
                    imp.to_skill_code
                );
            }
        }

        Self { skills, by_id, by_code, children, implied }
    }

    pub fn skills(&self) -> &[MasterSkill] {
        &self.skills
    }

    pub fn get_by_id(&self, skill_id: i64) -> Option<&MasterSkill> {
        self.by_id.get(&skill_id).map(|&idx| &self.skills[idx])
    }

    pub fn get_by_code(&self, skill_code: &str) -> Option<&MasterSkill> {
        self.by_code.get(skill_code).map(|&idx| &self.skills[idx])
    }

    /// All skill ids in the subtree rooted at `skill_code` (inclusive).
    /// Iterative walk with an explicit stack; the visited set guards against
    /// malformed parent links.
    pub fn subtree_ids(&self, skill_code: &str) -> HashSet<i64> {
        let mut result = HashSet::new();
        let root = match self.get_by_code(skill_code) {
            Some(s) => s.skill_id,
            None => return result,
        };

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !result.insert(id) {
                continue;
            }
            if let Some(kids) = self.children.get(&id) {
                stack.extend(kids.iter().copied());
            }
        }
        result
    }

    /// Skill ids implied by `skill_code` (direct edges only).
    pub fn implied_ids(&self, skill_code: &str) -> HashSet<i64> {
        self.implied
            .get(skill_code)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Subtree plus implication targets: the full acceptable-id set the
    /// eligibility gate filters candidate skills against.
    pub fn acceptable_ids(&self, skill_code: &str) -> HashSet<i64> {
        let mut ids = self.subtree_ids(skill_code);
        ids.extend(self.implied_ids(skill_code));
        ids
    }
}
