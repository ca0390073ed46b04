//! The matching engine: both pipelines over one shared skill graph
//!
//! Construction loads the master skill list and vector index once; they are
//! immutable for the life of the engine. All dependencies (store, AI
//! provider, config) are injected explicitly at the process entry point.

use crate::aggregator::{SkillAggregator, SkillMetrics};
use crate::ai::errors::AiProviderError;
use crate::ai::extractor;
use crate::ai::provider::AiProvider;
use crate::config::EngineConfig;
use crate::eligibility::EligibilityGate;
use crate::errors::TalentMatchError;
use crate::jd::{post_process, JobSkillProfile};
use crate::matcher::{Embedder, SkillMatcher};
use crate::profile::{build_candidate_roles, CandidateIdentity, RawExperienceItem};
use crate::ranker::{MatchReport, Ranker};
use crate::store::SkillStore;
use crate::taxonomy::SkillTaxonomy;
use crate::vector_index::VectorIndex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Summary of one completed ingestion.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub candidate_id: i64,
    pub full_name: String,
    pub role_count: usize,
    pub skill_count: usize,
    /// Finalized accumulators, keyed by skill code
    #[serde(skip)]
    pub skills: BTreeMap<String, SkillMetrics>,
}

/// Embedding source that consults the persistent cache before calling the
/// provider. Cache writes are best-effort; a failed put never fails the
/// lookup.
struct CachedEmbedder<'a> {
    store: &'a dyn SkillStore,
    provider: &'a dyn AiProvider,
}

#[async_trait::async_trait]
impl Embedder for CachedEmbedder<'_> {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, AiProviderError> {
        match self.store.embedding_cache_get(text) {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => log::warn!("[CachedEmbedder] Cache read failed for {:?}: {}", text, e),
        }

        let embedding = self.provider.embed(text).await?;

        if let Err(e) = self.store.embedding_cache_put(text, &embedding) {
            log::warn!("[CachedEmbedder] Cache write failed for {:?}: {}", text, e);
        }
        Ok(embedding)
    }
}

pub struct MatchingEngine {
    store: Arc<dyn SkillStore>,
    provider: Arc<dyn AiProvider>,
    taxonomy: Arc<SkillTaxonomy>,
    matcher: SkillMatcher,
    config: EngineConfig,
}

impl MatchingEngine {
    /// Load the skill graph and build the matcher. Fails fast on a broken
    /// store; a process without a taxonomy cannot do anything useful.
    pub fn new(
        store: Arc<dyn SkillStore>,
        provider: Arc<dyn AiProvider>,
        config: EngineConfig,
    ) -> Result<Self, TalentMatchError> {
        let skills = store.load_master_skills()?;
        let implications = store.load_skill_implications()?;
        let vector_entries = store.load_vector_index()?;

        log::info!(
            "[MatchingEngine] Loaded {} master skills, {} implications, {} vectors",
            skills.len(),
            implications.len(),
            vector_entries.len()
        );

        let taxonomy = Arc::new(SkillTaxonomy::new(skills, implications));
        let vector_index = Arc::new(VectorIndex::new(vector_entries));
        let matcher = SkillMatcher::with_threshold(
            Arc::clone(&taxonomy),
            Arc::clone(&vector_index),
            config.vector_threshold,
        );

        Ok(Self { store, provider, taxonomy, matcher, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn AiProvider {
        self.provider.as_ref()
    }

    fn embedder(&self) -> CachedEmbedder<'_> {
        CachedEmbedder { store: self.store.as_ref(), provider: self.provider.as_ref() }
    }

    /// Candidate ingestion: fold raw extracted experience into per-skill
    /// metrics and persist them. Re-ingesting the same resume for a
    /// candidate overwrites that candidate's rows.
    pub async fn ingest_resume(
        &self,
        identity: &CandidateIdentity,
        raw_experience: &[RawExperienceItem],
    ) -> Result<IngestReport, TalentMatchError> {
        let roles = build_candidate_roles(raw_experience, self.config.reference_date);
        log::info!(
            "[MatchingEngine] Ingesting {} roles for {}",
            roles.len(),
            identity.full_name
        );

        let embedder = self.embedder();
        let mut aggregator = SkillAggregator::new();
        for role in &roles {
            aggregator.process_role(role, &self.matcher, &embedder).await;
        }
        let skills = aggregator.finalize();

        // An accumulator in an impossible state is a programmer error;
        // abort this candidate and let the caller continue with others.
        for (skill_code, metrics) in &skills {
            metrics.validate(skill_code).map_err(|violation| {
                log::error!("[MatchingEngine] {}", violation);
                TalentMatchError::Invariant(violation)
            })?;
        }

        let experience_json = serde_json::to_string(raw_experience)
            .map_err(|e| TalentMatchError::Application(e.to_string()))?;
        let candidate_id = self.store.insert_candidate(&identity.full_name, &experience_json)?;
        self.store.upsert_candidate_skills(candidate_id, &skills)?;

        log::info!(
            "[MatchingEngine] Sync complete for {}: {} skills",
            identity.full_name,
            skills.len()
        );

        Ok(IngestReport {
            candidate_id,
            full_name: identity.full_name.clone(),
            role_count: roles.len(),
            skill_count: skills.len(),
            skills,
        })
    }

    /// Parse, clamp, validate, and post-process a job description.
    pub async fn parse_job_description(
        &self,
        jd_text: &str,
    ) -> Result<JobSkillProfile, TalentMatchError> {
        let primary_domains = self.store.load_primary_domains()?;
        let mut profile =
            extractor::parse_job_profile(self.provider.as_ref(), jd_text, &primary_domains).await?;

        profile.clamp_primary_domain(&primary_domains);
        profile.validate()?;
        Ok(post_process(profile))
    }

    /// Employer matching: parse the JD, gate, then score. Deterministic for
    /// a given (JD, store snapshot) pair.
    pub async fn rank_candidates(
        &self,
        jd_text: &str,
        limit: usize,
    ) -> Result<MatchReport, TalentMatchError> {
        let jd_profile = self.parse_job_description(jd_text).await?;
        self.rank_with_profile(&jd_profile, limit).await
    }

    /// Rank against an already-parsed profile (used by tests and by callers
    /// that cache the parse).
    pub async fn rank_with_profile(
        &self,
        jd_profile: &JobSkillProfile,
        limit: usize,
    ) -> Result<MatchReport, TalentMatchError> {
        let embedder = self.embedder();

        let gate = EligibilityGate::new(self.store.as_ref(), &self.taxonomy, &self.matcher);
        let eligible = gate
            .eligible_candidates(
                jd_profile,
                &embedder,
                self.config.reference_date,
                self.config.recency_months_limit,
            )
            .await?;

        log::info!("[MatchingEngine] {} eligible candidates", eligible.len());

        if eligible.is_empty() {
            return Ok(MatchReport {
                results: vec![],
                role_context: jd_profile.role_context.clone(),
            });
        }

        let ranker =
            Ranker::new(self.store.as_ref(), &self.matcher, &self.taxonomy, self.config.reference_date);
        let results = ranker.rank(jd_profile, &eligible, &embedder, limit).await?;

        Ok(MatchReport { results, role_context: jd_profile.role_context.clone() })
    }
}
