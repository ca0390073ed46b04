//! Persistence interface for the matching engine
//!
//! A narrow contract over the skill graph, candidate metrics, weight
//! tables, and the embedding cache. The engine only ever talks to
//! `SkillStore`; `SqliteStore` is the shipped implementation.

use crate::aggregator::SkillMetrics;
use crate::errors::DatabaseError;
use crate::matcher::MatchMethod;
use crate::profile::MentionSource;
use crate::taxonomy::{DisambiguationRules, MasterSkill, SkillImplication, SkillType};
use crate::vector_index::VectorEntry;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One candidate-skill row as the ranker consumes it.
#[derive(Debug, Clone)]
pub struct CandidateSkillRow {
    pub skill_code: String,
    pub skill_type: SkillType,
    pub category: Option<String>,
    pub total_months: i64,
    pub senior_months: i64,
    pub last_used: Option<NaiveDate>,
    pub max_evidence_strength: i64,
    pub normalization_method: Option<MatchMethod>,
    pub evidence_sources: Vec<MentionSource>,
}

/// Abstract store for master skills, candidate skills, weight tables, and
/// the embedding cache.
pub trait SkillStore: Send + Sync {
    fn load_master_skills(&self) -> Result<Vec<MasterSkill>, DatabaseError>;
    fn load_skill_implications(&self) -> Result<Vec<SkillImplication>, DatabaseError>;
    fn load_vector_index(&self) -> Result<Vec<VectorEntry>, DatabaseError>;
    fn load_base_weights(&self) -> Result<HashMap<String, f64>, DatabaseError>;
    /// Role-adjusted skill-type multipliers for a (domain, seniority) pair,
    /// including rows whose seniority is the wildcard 'any'.
    fn load_skill_type_weights(
        &self,
        primary_domain: &str,
        seniority_level: &str,
    ) -> Result<HashMap<String, f64>, DatabaseError>;
    /// Distinct primary domains known to the weight tables; drives the JD
    /// parser's whitelist.
    fn load_primary_domains(&self) -> Result<Vec<String>, DatabaseError>;

    fn insert_candidate(&self, full_name: &str, experience_json: &str)
        -> Result<i64, DatabaseError>;
    fn candidate_names(&self, ids: &HashSet<i64>) -> Result<HashMap<i64, String>, DatabaseError>;
    /// Replace all skill rows for a candidate. Re-ingesting the same resume
    /// yields identical rows.
    fn upsert_candidate_skills(
        &self,
        candidate_id: i64,
        skills: &BTreeMap<String, SkillMetrics>,
    ) -> Result<(), DatabaseError>;
    fn load_candidate_skills(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<CandidateSkillRow>, DatabaseError>;

    /// Candidates holding any acceptable skill at the required evidence,
    /// seniority, and recency bar.
    fn query_eligible_candidates(
        &self,
        acceptable_skill_ids: &HashSet<i64>,
        min_months: i64,
        required_strength: i64,
        mid_threshold: i64,
        senior_threshold: i64,
        recency_cutoff: NaiveDate,
    ) -> Result<HashSet<i64>, DatabaseError>;

    /// Candidates holding at least `min_required` distinct skills in a
    /// category at the same bar.
    fn query_category_candidates(
        &self,
        category: &str,
        min_required: i64,
        required_strength: i64,
        mid_threshold: i64,
        senior_threshold: i64,
        recency_cutoff: NaiveDate,
    ) -> Result<HashSet<i64>, DatabaseError>;

    fn embedding_cache_get(&self, text: &str) -> Result<Option<Vec<f64>>, DatabaseError>;
    fn embedding_cache_put(&self, text: &str, embedding: &[f64]) -> Result<(), DatabaseError>;
}

/// SQLite-backed store. The connection is mutex-guarded; every call is a
/// short transaction-free statement, so contention is negligible next to
/// the LLM round-trips.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    pub fn open_default() -> Result<Self, DatabaseError> {
        let conn = crate::db::get_connection()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(conn))
    }
}

fn parse_json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn input_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl SkillStore for SqliteStore {
    fn load_master_skills(&self) -> Result<Vec<MasterSkill>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT skill_id, skill_code, skill_name, skill_type, category,
                    parent_skill_id, aliases, tokens, disambiguation_rules
             FROM master_skills
             ORDER BY skill_id",
        )?;

        let skills = stmt
            .query_map([], |row| {
                let rules_raw: Option<String> = row.get(8)?;
                Ok(MasterSkill {
                    skill_id: row.get(0)?,
                    skill_code: row.get(1)?,
                    skill_name: row.get(2)?,
                    skill_type: SkillType::parse(&row.get::<_, String>(3)?),
                    category: row.get(4)?,
                    parent_skill_id: row.get(5)?,
                    aliases: parse_json_list(row.get(6)?),
                    tokens: parse_json_list(row.get(7)?),
                    // Malformed rules fail open: the matcher treats None as
                    // "no guard".
                    disambiguation_rules: rules_raw
                        .and_then(|s| serde_json::from_str::<DisambiguationRules>(&s).ok()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(skills)
    }

    fn load_skill_implications(&self) -> Result<Vec<SkillImplication>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT from_skill_code, to_skill_code FROM skill_implications")?;
        let implications = stmt
            .query_map([], |row| {
                Ok(SkillImplication {
                    from_skill_code: row.get(0)?,
                    to_skill_code: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(implications)
    }

    fn load_vector_index(&self) -> Result<Vec<VectorEntry>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT skill_id, skill_vector FROM master_skills WHERE skill_vector IS NOT NULL",
        )?;

        let entries = stmt
            .query_map([], |row| {
                let skill_id: i64 = row.get(0)?;
                let raw: String = row.get(1)?;
                Ok((skill_id, raw))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|(skill_id, raw)| {
                match serde_json::from_str::<Vec<f64>>(&raw) {
                    Ok(embedding) => Some(VectorEntry { skill_id, embedding }),
                    Err(e) => {
                        log::warn!("[SqliteStore] Bad skill_vector for skill {}: {}", skill_id, e);
                        None
                    }
                }
            })
            .collect();

        Ok(entries)
    }

    fn load_base_weights(&self) -> Result<HashMap<String, f64>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT skill_type, base_weight FROM skill_type_weights")?;
        let weights = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(weights)
    }

    fn load_skill_type_weights(
        &self,
        primary_domain: &str,
        seniority_level: &str,
    ) -> Result<HashMap<String, f64>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT skill_type, weight_multiplier
             FROM role_skill_type_weights
             WHERE primary_domain = ?
             AND (seniority_level = ? OR seniority_level = 'any')",
        )?;
        let weights = stmt
            .query_map(params![primary_domain, seniority_level], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(weights)
    }

    fn load_primary_domains(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT primary_domain
             FROM role_skill_type_weights
             WHERE primary_domain IS NOT NULL
             ORDER BY primary_domain",
        )?;
        let domains = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(domains)
    }

    fn insert_candidate(
        &self,
        full_name: &str,
        experience_json: &str,
    ) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO candidates (full_name, experience_json, created_at)
             VALUES (?, ?, datetime('now'))",
            params![full_name, experience_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn candidate_names(&self, ids: &HashSet<i64>) -> Result<HashMap<i64, String>, DatabaseError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!(
            "SELECT candidate_id, full_name FROM candidates WHERE candidate_id IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&query)?;
        let id_params: Vec<i64> = ids.iter().copied().collect();
        let names = stmt
            .query_map(rusqlite::params_from_iter(id_params), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(names)
    }

    fn upsert_candidate_skills(
        &self,
        candidate_id: i64,
        skills: &BTreeMap<String, SkillMetrics>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM candidate_skills WHERE candidate_id = ?", params![candidate_id])?;

        for (skill_code, metrics) in skills {
            let master_id: Option<i64> = conn
                .query_row(
                    "SELECT skill_id FROM master_skills WHERE skill_code = ?",
                    params![skill_code],
                    |row| row.get(0),
                )
                .ok();

            let master_id = match master_id {
                Some(id) => id,
                None => {
                    log::warn!("[SqliteStore] No master skill for code {}", skill_code);
                    continue;
                }
            };

            // Evidence sources persist as a sorted, comma-joined list so
            // rows compare equal across runs.
            let evidence_sources = metrics
                .evidence_sources
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let method = metrics
                .strongest_method()
                .map(|m| m.as_str())
                .unwrap_or("none");

            conn.execute(
                "INSERT INTO candidate_skills (
                    candidate_id, master_skill_id, total_months, junior_months,
                    mid_months, senior_months, first_used_date, last_used_date,
                    evidence_score, evidence_sources, max_evidence_strength,
                    match_confidence, normalization_confidence,
                    normalization_method, has_presence
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    candidate_id,
                    master_id,
                    metrics.total_months,
                    metrics.junior_months,
                    metrics.mid_months,
                    metrics.senior_months,
                    format_date(metrics.first_used),
                    format_date(metrics.last_used),
                    metrics.evidence_score,
                    evidence_sources,
                    metrics.max_evidence_strength,
                    metrics.match_confidence,
                    metrics.normalization_confidence,
                    method,
                    metrics.has_presence as i64,
                ],
            )?;
        }

        Ok(())
    }

    fn load_candidate_skills(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<CandidateSkillRow>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ms.skill_code, ms.skill_type, ms.category,
                    cs.total_months, cs.senior_months, cs.last_used_date,
                    cs.max_evidence_strength, cs.normalization_method,
                    cs.evidence_sources
             FROM candidate_skills cs
             JOIN master_skills ms ON ms.skill_id = cs.master_skill_id
             WHERE cs.candidate_id = ?
             ORDER BY ms.skill_code",
        )?;

        let rows = stmt
            .query_map(params![candidate_id], |row| {
                let method_raw: Option<String> = row.get(7)?;
                let sources_raw: Option<String> = row.get(8)?;
                Ok(CandidateSkillRow {
                    skill_code: row.get(0)?,
                    skill_type: SkillType::parse(&row.get::<_, String>(1)?),
                    category: row.get(2)?,
                    total_months: row.get(3)?,
                    senior_months: row.get(4)?,
                    last_used: parse_date(row.get(5)?),
                    max_evidence_strength: row.get(6)?,
                    normalization_method: method_raw.as_deref().and_then(MatchMethod::parse),
                    evidence_sources: sources_raw
                        .unwrap_or_default()
                        .split(", ")
                        .filter_map(MentionSource::parse)
                        .collect(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn query_eligible_candidates(
        &self,
        acceptable_skill_ids: &HashSet<i64>,
        min_months: i64,
        required_strength: i64,
        mid_threshold: i64,
        senior_threshold: i64,
        recency_cutoff: NaiveDate,
    ) -> Result<HashSet<i64>, DatabaseError> {
        if acceptable_skill_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; acceptable_skill_ids.len()].join(", ");
        let query = format!(
            "SELECT DISTINCT cs.candidate_id
             FROM candidate_skills cs
             WHERE cs.master_skill_id IN ({})
             AND (cs.total_months >= ? OR cs.max_evidence_strength >= ?)
             AND cs.mid_months >= ?
             AND cs.senior_months >= ?
             AND cs.last_used_date >= ?",
            placeholders
        );

        let mut stmt = conn.prepare(&query)?;
        let mut query_params: Vec<rusqlite::types::Value> = acceptable_skill_ids
            .iter()
            .map(|&id| rusqlite::types::Value::from(id))
            .collect();
        query_params.push(min_months.into());
        query_params.push(required_strength.into());
        query_params.push(mid_threshold.into());
        query_params.push(senior_threshold.into());
        query_params.push(recency_cutoff.format(DATE_FORMAT).to_string().into());

        let ids = stmt
            .query_map(rusqlite::params_from_iter(query_params), |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn query_category_candidates(
        &self,
        category: &str,
        min_required: i64,
        required_strength: i64,
        mid_threshold: i64,
        senior_threshold: i64,
        recency_cutoff: NaiveDate,
    ) -> Result<HashSet<i64>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT cs.candidate_id
             FROM candidate_skills cs
             JOIN master_skills ms ON ms.skill_id = cs.master_skill_id
             WHERE ms.category = ?
             AND (cs.total_months > 0 OR cs.max_evidence_strength >= ?)
             AND cs.mid_months >= ?
             AND cs.senior_months >= ?
             AND cs.last_used_date >= ?
             GROUP BY cs.candidate_id
             HAVING COUNT(DISTINCT cs.master_skill_id) >= ?",
        )?;

        let ids = stmt
            .query_map(
                params![
                    category,
                    required_strength,
                    mid_threshold,
                    senior_threshold,
                    recency_cutoff.format(DATE_FORMAT).to_string(),
                    min_required,
                ],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn embedding_cache_get(&self, text: &str) -> Result<Option<Vec<f64>>, DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let hash = input_hash(text);

        let cached: Option<String> = conn
            .query_row(
                "SELECT embedding FROM embedding_cache WHERE input_hash = ?",
                params![hash],
                |row| row.get(0),
            )
            .ok();

        let raw = match cached {
            Some(raw) => raw,
            None => return Ok(None),
        };

        conn.execute(
            "UPDATE embedding_cache
             SET accessed_at = datetime('now'), access_count = access_count + 1
             WHERE input_hash = ?",
            params![hash],
        )?;

        match serde_json::from_str::<Vec<f64>>(&raw) {
            Ok(embedding) => Ok(Some(embedding)),
            Err(e) => {
                log::warn!("[SqliteStore] Corrupt cached embedding for {:?}: {}", text, e);
                Ok(None)
            }
        }
    }

    fn embedding_cache_put(&self, text: &str, embedding: &[f64]) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap();
        let encoded = serde_json::to_string(embedding)
            .map_err(|e| DatabaseError::InvalidData(e.to_string()))?;

        // Concurrent puts for the same key: first insert wins, the rest
        // are no-ops.
        conn.execute(
            "INSERT OR IGNORE INTO embedding_cache
                (input_hash, input_text, embedding, created_at, accessed_at, access_count)
             VALUES (?, ?, ?, datetime('now'), datetime('now'), 0)",
            params![input_hash(text), text, encoded],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .unwrap();
        db::run_migrations(&conn).unwrap();
        SqliteStore::new(conn)
    }

    fn seed_skill(store: &SqliteStore, code: &str, name: &str, category: Option<&str>) -> i64 {
        let conn = store.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO master_skills (skill_code, skill_name, skill_type, category, aliases, tokens)
             VALUES (?, ?, 'framework', ?, '[]', '[]')",
            params![code, name, category],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = test_store();
        seed_skill(&store, "language_java", "Java", None);
        let candidate_id = store.insert_candidate("Test Candidate", "[]").unwrap();

        let mut skills = BTreeMap::new();
        skills.insert(
            "language_java".to_string(),
            SkillMetrics {
                senior_months: 24,
                total_months: 24,
                first_used: Some(date(2022, 1)),
                last_used: Some(date(2024, 1)),
                evidence_score: 1.0,
                evidence_sources: std::collections::BTreeSet::from([MentionSource::SkillsSection]),
                normalization_methods: vec![MatchMethod::Exact],
                has_presence: true,
                ..Default::default()
            },
        );

        store.upsert_candidate_skills(candidate_id, &skills).unwrap();
        let first = store.load_candidate_skills(candidate_id).unwrap();
        store.upsert_candidate_skills(candidate_id, &skills).unwrap();
        let second = store.load_candidate_skills(candidate_id).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].skill_code, second[0].skill_code);
        assert_eq!(first[0].total_months, second[0].total_months);
        assert_eq!(first[0].last_used, second[0].last_used);
        assert_eq!(first[0].normalization_method, Some(MatchMethod::Exact));
        assert_eq!(first[0].evidence_sources, vec![MentionSource::SkillsSection]);
    }

    #[test]
    fn test_eligible_candidates_query_filters() {
        let store = test_store();
        let java_id = seed_skill(&store, "language_java", "Java", None);
        let candidate_id = store.insert_candidate("Test Candidate", "[]").unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO candidate_skills
                    (candidate_id, master_skill_id, total_months, mid_months,
                     senior_months, last_used_date, max_evidence_strength)
                 VALUES (?, ?, 40, 40, 0, '2025-06-01', 1)",
                params![candidate_id, java_id],
            )
            .unwrap();
        }

        let acceptable = HashSet::from([java_id]);

        // Passes a Mid bar
        let eligible = store
            .query_eligible_candidates(&acceptable, 24, 2, 12, 0, date(2023, 1))
            .unwrap();
        assert!(eligible.contains(&candidate_id));

        // Fails a Senior bar: senior_months 0 < 12
        let eligible = store
            .query_eligible_candidates(&acceptable, 24, 2, 24, 12, date(2023, 1))
            .unwrap();
        assert!(eligible.is_empty());

        // Fails recency
        let eligible = store
            .query_eligible_candidates(&acceptable, 24, 2, 12, 0, date(2025, 12))
            .unwrap();
        assert!(eligible.is_empty());
    }

    #[test]
    fn test_category_candidates_query() {
        let store = test_store();
        let angular_id = seed_skill(&store, "framework_angular", "Angular", Some("Frontend Framework"));
        let candidate_id = store.insert_candidate("Frontend Dev", "[]").unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO candidate_skills
                    (candidate_id, master_skill_id, total_months, mid_months,
                     senior_months, last_used_date, max_evidence_strength)
                 VALUES (?, ?, 20, 20, 0, '2025-07-01', 1)",
                params![candidate_id, angular_id],
            )
            .unwrap();
        }

        let eligible = store
            .query_category_candidates("Frontend Framework", 1, 2, 12, 0, date(2023, 1))
            .unwrap();
        assert!(eligible.contains(&candidate_id));

        let eligible = store
            .query_category_candidates("Frontend Framework", 2, 2, 12, 0, date(2023, 1))
            .unwrap();
        assert!(eligible.is_empty());
    }

    #[test]
    fn test_embedding_cache_round_trip() {
        let store = test_store();
        assert!(store.embedding_cache_get("react").unwrap().is_none());

        store.embedding_cache_put("react", &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(store.embedding_cache_get("react").unwrap(), Some(vec![0.1, 0.2, 0.3]));

        // Duplicate put is a no-op, not an error
        store.embedding_cache_put("react", &[0.9, 0.9, 0.9]).unwrap();
        assert_eq!(store.embedding_cache_get("react").unwrap(), Some(vec![0.1, 0.2, 0.3]));
    }
}
