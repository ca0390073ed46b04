use rusqlite::{Connection, Result};
use std::path::PathBuf;

/// Get the app data directory (where the database, logs, and temp uploads
/// are stored).
///
/// In development this is `.talentmatch` in the current directory; all
/// state stays local to the machine running the service. Only LLM prompts
/// leave the process, and only toward the configured Ollama host.
pub fn get_app_data_dir() -> PathBuf {
    let app_data_dir = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".talentmatch");
    std::fs::create_dir_all(&app_data_dir).expect("Failed to create app data directory");
    app_data_dir
}

pub fn get_db_path() -> PathBuf {
    get_app_data_dir().join("talentmatch.db")
}

pub fn get_connection() -> Result<Connection> {
    let db_path = get_db_path();
    Connection::open(db_path)
}

pub fn init_database() -> Result<()> {
    let conn = get_connection()?;

    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    run_migrations(&conn)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Run migration 001
    let migration_name = "001_skill_graph";
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM migrations WHERE name = ?")?;
    let count: i64 = stmt.query_row([migration_name], |row| row.get(0))?;

    if count == 0 {
        log::info!("[db] Running migration: {}", migration_name);
        migration_001_skill_graph(conn)?;
        conn.execute(
            "INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))",
            [migration_name],
        )?;
    }

    // Run migration 002
    let migration_name = "002_candidates";
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM migrations WHERE name = ?")?;
    let count: i64 = stmt.query_row([migration_name], |row| row.get(0))?;

    if count == 0 {
        log::info!("[db] Running migration: {}", migration_name);
        migration_002_candidates(conn)?;
        conn.execute(
            "INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))",
            [migration_name],
        )?;
    }

    // Run migration 003
    let migration_name = "003_embedding_cache";
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM migrations WHERE name = ?")?;
    let count: i64 = stmt.query_row([migration_name], |row| row.get(0))?;

    if count == 0 {
        log::info!("[db] Running migration: {}", migration_name);
        migration_003_embedding_cache(conn)?;
        conn.execute(
            "INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))",
            [migration_name],
        )?;
    }

    // Run migration 004
    let migration_name = "004_jobs";
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM migrations WHERE name = ?")?;
    let count: i64 = stmt.query_row([migration_name], |row| row.get(0))?;

    if count == 0 {
        log::info!("[db] Running migration: {}", migration_name);
        migration_004_jobs(conn)?;
        conn.execute(
            "INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))",
            [migration_name],
        )?;
    }

    Ok(())
}

/// Master taxonomy, implications, and weight tables. Aliases, tokens,
/// disambiguation rules, and the skill vector are JSON-encoded columns.
pub fn migration_001_skill_graph(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS master_skills (
            skill_id INTEGER PRIMARY KEY AUTOINCREMENT,
            skill_code TEXT NOT NULL UNIQUE,
            skill_name TEXT NOT NULL,
            skill_type TEXT NOT NULL,
            category TEXT,
            parent_skill_id INTEGER REFERENCES master_skills(skill_id),
            aliases TEXT,
            tokens TEXT,
            disambiguation_rules TEXT,
            skill_vector TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS skill_implications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_skill_code TEXT NOT NULL,
            to_skill_code TEXT NOT NULL,
            UNIQUE(from_skill_code, to_skill_code)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS skill_type_weights (
            skill_type TEXT PRIMARY KEY,
            base_weight REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS role_skill_type_weights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            primary_domain TEXT NOT NULL,
            seniority_level TEXT NOT NULL,
            skill_type TEXT NOT NULL,
            weight_multiplier REAL NOT NULL,
            UNIQUE(primary_domain, seniority_level, skill_type)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_master_skills_category
         ON master_skills (category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_skill_implications_from
         ON skill_implications (from_skill_code)",
        [],
    )?;

    Ok(())
}

/// Candidates and the per-candidate x master-skill metric rows the
/// eligibility gate and ranker query.
pub fn migration_002_candidates(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS candidates (
            candidate_id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            experience_json TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS candidate_skills (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            candidate_id INTEGER NOT NULL,
            master_skill_id INTEGER NOT NULL,
            total_months INTEGER NOT NULL DEFAULT 0,
            junior_months INTEGER NOT NULL DEFAULT 0,
            mid_months INTEGER NOT NULL DEFAULT 0,
            senior_months INTEGER NOT NULL DEFAULT 0,
            first_used_date TEXT,
            last_used_date TEXT,
            evidence_score REAL NOT NULL DEFAULT 0,
            evidence_sources TEXT,
            max_evidence_strength INTEGER NOT NULL DEFAULT 1,
            match_confidence REAL NOT NULL DEFAULT 0,
            normalization_confidence REAL NOT NULL DEFAULT 0,
            normalization_method TEXT,
            has_presence INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (candidate_id) REFERENCES candidates(candidate_id),
            FOREIGN KEY (master_skill_id) REFERENCES master_skills(skill_id),
            UNIQUE(candidate_id, master_skill_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_candidate_skills_master
         ON candidate_skills (master_skill_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_candidate_skills_candidate
         ON candidate_skills (candidate_id)",
        [],
    )?;

    Ok(())
}

/// Input-text keyed embedding cache with access statistics for eviction.
pub fn migration_003_embedding_cache(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS embedding_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            input_hash TEXT NOT NULL UNIQUE,
            input_text TEXT NOT NULL,
            embedding TEXT NOT NULL,
            created_at TEXT NOT NULL,
            accessed_at TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_embedding_cache_accessed_at
         ON embedding_cache (accessed_at ASC)",
        [],
    )?;

    Ok(())
}

/// Background job records for the HTTP surface.
pub fn migration_004_jobs(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            job_type TEXT NOT NULL,
            status TEXT NOT NULL,
            progress INTEGER NOT NULL DEFAULT 0,
            message TEXT NOT NULL DEFAULT '',
            input_data TEXT,
            result TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_status
         ON jobs (status, created_at DESC)",
        [],
    )?;

    Ok(())
}
