//! Script to populate the TalentMatch database with a starter taxonomy
//!
//! Usage:
//!   cargo run --bin populate_test_data
//!
//! Seeds master skills, implications, and weight tables so the end-to-end
//! flow can be exercised. Skill vectors are left NULL; the vector tier
//! activates once embeddings are generated against a live embedding model.

use rusqlite::{params, Connection};
use talentmatch::db;

fn clear_database(conn: &Connection) -> Result<(), Box<dyn std::error::Error>> {
    println!("Clearing existing taxonomy...");

    // Delete in reverse order of dependencies
    conn.execute("DELETE FROM candidate_skills", [])?;
    conn.execute("DELETE FROM candidates", [])?;
    conn.execute("DELETE FROM skill_implications", [])?;
    conn.execute("DELETE FROM master_skills", [])?;
    conn.execute("DELETE FROM skill_type_weights", [])?;
    conn.execute("DELETE FROM role_skill_type_weights", [])?;
    conn.execute("DELETE FROM embedding_cache", [])?;

    println!("Database cleared.");
    Ok(())
}

struct SeedSkill {
    code: &'static str,
    name: &'static str,
    skill_type: &'static str,
    category: Option<&'static str>,
    parent_code: Option<&'static str>,
    aliases: &'static str,
    tokens: &'static str,
    rules: Option<&'static str>,
}

fn seed_skills() -> Vec<SeedSkill> {
    vec![
        SeedSkill {
            code: "language_java",
            name: "Java",
            skill_type: "programming",
            category: Some("Programming Language"),
            parent_code: None,
            aliases: r#"["Java SE", "Java EE", "J2EE"]"#,
            tokens: "[]",
            rules: Some(r#"{"block_if_contains": ["javascript"]}"#),
        },
        SeedSkill {
            code: "language_javascript",
            name: "JavaScript",
            skill_type: "programming",
            category: Some("Programming Language"),
            parent_code: None,
            aliases: r#"["JS", "ECMAScript", "JScript"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "language_python",
            name: "Python",
            skill_type: "programming",
            category: Some("Programming Language"),
            parent_code: None,
            aliases: r#"["Python 3"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "language_csharp",
            name: "C#",
            skill_type: "programming",
            category: Some("Programming Language"),
            parent_code: None,
            aliases: r#"["C Sharp", "CSharp"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "language_c",
            name: "C",
            skill_type: "programming",
            category: Some("Programming Language"),
            parent_code: None,
            aliases: "[]",
            tokens: r#"["c"]"#,
            rules: None,
        },
        SeedSkill {
            code: "framework_dotnet",
            name: ".NET",
            skill_type: "framework",
            category: Some("Backend Framework"),
            parent_code: None,
            aliases: r#"["dotnet", ".NET Framework", ".NET Core"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "framework_aspnet",
            name: "ASP.NET",
            skill_type: "framework",
            category: Some("Backend Framework"),
            parent_code: Some("framework_dotnet"),
            aliases: r#"["ASP.NET Core", "ASP.NET MVC"]"#,
            tokens: r#"["aspnet"]"#,
            rules: None,
        },
        SeedSkill {
            code: "framework_react",
            name: "React",
            skill_type: "framework",
            category: Some("Frontend Framework"),
            parent_code: None,
            aliases: r#"["React.js", "ReactJS"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "framework_angular",
            name: "Angular",
            skill_type: "framework",
            category: Some("Frontend Framework"),
            parent_code: None,
            aliases: r#"["AngularJS", "Angular 2+"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "framework_spring",
            name: "Spring Boot",
            skill_type: "framework",
            category: Some("Backend Framework"),
            parent_code: None,
            aliases: r#"["Spring", "Spring Framework"]"#,
            tokens: r#"["spring"]"#,
            rules: None,
        },
        SeedSkill {
            code: "web_html",
            name: "HTML",
            skill_type: "other",
            category: Some("Web Technology"),
            parent_code: None,
            aliases: r#"["HTML5"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "web_css",
            name: "CSS",
            skill_type: "other",
            category: Some("Web Technology"),
            parent_code: None,
            aliases: r#"["CSS3"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "database_sqlserver",
            name: "SQL Server",
            skill_type: "database",
            category: Some("Database"),
            parent_code: None,
            aliases: r#"["MSSQL", "Microsoft SQL Server"]"#,
            tokens: r#"["sql", "server"]"#,
            rules: None,
        },
        SeedSkill {
            code: "database_postgresql",
            name: "PostgreSQL",
            skill_type: "database",
            category: Some("Database"),
            parent_code: None,
            aliases: r#"["Postgres"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "cloud_aws",
            name: "AWS",
            skill_type: "cloud",
            category: Some("Cloud"),
            parent_code: None,
            aliases: r#"["Amazon Web Services"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "cloud_azure",
            name: "Azure",
            skill_type: "cloud",
            category: Some("Cloud"),
            parent_code: None,
            aliases: r#"["Microsoft Azure"]"#,
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "tool_docker",
            name: "Docker",
            skill_type: "tool",
            category: Some("DevOps Tool"),
            parent_code: None,
            aliases: "[]",
            tokens: "[]",
            rules: None,
        },
        SeedSkill {
            code: "methodology_agile",
            name: "Agile",
            skill_type: "methodology",
            category: None,
            parent_code: None,
            aliases: r#"["Scrum", "Kanban"]"#,
            tokens: "[]",
            rules: None,
        },
    ]
}

fn populate_taxonomy(conn: &Connection) -> Result<(), Box<dyn std::error::Error>> {
    println!("Populating master skills...");

    for skill in seed_skills() {
        let parent_id: Option<i64> = match skill.parent_code {
            Some(code) => Some(conn.query_row(
                "SELECT skill_id FROM master_skills WHERE skill_code = ?",
                params![code],
                |row| row.get(0),
            )?),
            None => None,
        };

        conn.execute(
            "INSERT INTO master_skills
                (skill_code, skill_name, skill_type, category, parent_skill_id,
                 aliases, tokens, disambiguation_rules)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                skill.code,
                skill.name,
                skill.skill_type,
                skill.category,
                parent_id,
                skill.aliases,
                skill.tokens,
                skill.rules,
            ],
        )?;
    }

    println!("Populating skill implications...");
    conn.execute(
        "INSERT INTO skill_implications (from_skill_code, to_skill_code)
         VALUES ('framework_aspnet', 'framework_dotnet')",
        [],
    )?;
    conn.execute(
        "INSERT INTO skill_implications (from_skill_code, to_skill_code)
         VALUES ('framework_spring', 'language_java')",
        [],
    )?;

    println!("Populating weight tables...");
    let base_weights = [
        ("programming", 1.0),
        ("framework", 0.9),
        ("cloud", 0.8),
        ("database", 0.8),
        ("platform", 0.7),
        ("tool", 0.5),
        ("methodology", 0.3),
        ("other", 0.5),
    ];
    for (skill_type, weight) in base_weights {
        conn.execute(
            "INSERT INTO skill_type_weights (skill_type, base_weight) VALUES (?, ?)",
            params![skill_type, weight],
        )?;
    }

    let role_weights = [
        ("Backend", "any", "programming", 1.2),
        ("Backend", "any", "framework", 1.1),
        ("Backend", "any", "database", 1.0),
        ("Backend", "Senior", "cloud", 1.0),
        ("Frontend", "any", "framework", 1.2),
        ("Frontend", "any", "programming", 1.0),
        ("Web", "any", "framework", 1.1),
        ("Web", "any", "programming", 1.0),
        ("Fullstack", "any", "programming", 1.1),
        ("Fullstack", "any", "framework", 1.1),
        ("General", "any", "programming", 1.0),
        ("General", "any", "framework", 1.0),
    ];
    for (domain, seniority, skill_type, weight) in role_weights {
        conn.execute(
            "INSERT INTO role_skill_type_weights
                (primary_domain, seniority_level, skill_type, weight_multiplier)
             VALUES (?, ?, ?, ?)",
            params![domain, seniority, skill_type, weight],
        )?;
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    db::init_database()?;
    let conn = db::get_connection()?;

    clear_database(&conn)?;
    populate_taxonomy(&conn)?;

    let skill_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM master_skills", [], |row| row.get(0))?;
    println!("Done. {} master skills seeded at {}", skill_count, db::get_db_path().display());

    Ok(())
}
