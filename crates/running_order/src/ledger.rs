use std::collections::HashMap;

use db::{EventRepository, JudgeRepository, PerformanceRepository, ScoreRepository, ScoreWrite};
use events::{Event, EventBus, EventEnvelope};
use showrunner_core::{
    sort_rankings, Caller, JudgePerformanceView, Performance, PerformanceStatus, RankingEntry,
    Score, ScoreDeletionRecord, ScoreDimensions, ScoringStatus, SubmitScoreRequest,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, ServiceError};
use crate::locks::EventLocks;

/// Per-judge scores and everything derived from them.
#[derive(Clone)]
pub struct ScoreLedger {
    events: EventRepository,
    performances: PerformanceRepository,
    scores: ScoreRepository,
    judges: JudgeRepository,
    bus: EventBus,
    locks: EventLocks,
}

impl ScoreLedger {
    pub fn new(
        events: EventRepository,
        performances: PerformanceRepository,
        scores: ScoreRepository,
        judges: JudgeRepository,
        bus: EventBus,
        locks: EventLocks,
    ) -> Self {
        Self {
            events,
            performances,
            scores,
            judges,
            bus,
            locks,
        }
    }

    /// Stores or overwrites the judge's score.
    ///
    /// All five dimensions are validated before anything is written. A
    /// performance withdrawn before the write commits rejects the score.
    pub async fn submit(
        &self,
        caller: &Caller,
        performance_id: Uuid,
        judge_id: Uuid,
        request: SubmitScoreRequest,
    ) -> Result<Score> {
        caller.require_judge(judge_id)?;
        let dimensions = ScoreDimensions::try_from_values(&request.dimensions)?;
        let score = Score::new(performance_id, judge_id, dimensions, request.comments);

        let performance = self.performance(performance_id).await?;
        let _guard = self.locks.acquire(performance.event_id).await;

        match self.scores.upsert_if_judgeable(&score).await? {
            ScoreWrite::Stored { event_id, revision } => {
                debug!(
                    performance_id = %performance_id,
                    judge_id = %judge_id,
                    total = score.total,
                    "Score stored"
                );
                self.bus.publish(EventEnvelope::for_revision(
                    revision,
                    Event::ScoreSubmitted {
                        event_id,
                        performance_id,
                        judge_id,
                        total: score.total,
                    },
                ));
                Ok(score)
            }
            ScoreWrite::Withdrawn => {
                debug!(
                    performance_id = %performance_id,
                    judge_id = %judge_id,
                    "Score rejected: performance withdrawn"
                );
                Err(ServiceError::Withdrawn(performance_id))
            }
            ScoreWrite::PerformanceMissing => Err(ServiceError::performance_not_found(performance_id)),
        }
    }

    /// Completion against the performance's roster, computed on every read.
    pub async fn status(&self, performance_id: Uuid) -> Result<ScoringStatus> {
        self.performance(performance_id).await?;
        let roster = self.judges.roster_for_performance(performance_id).await?;
        let scored = self.scores.scored_judge_ids(performance_id).await?;
        Ok(ScoringStatus::compute(performance_id, &roster, &scored))
    }

    pub async fn get(&self, caller: &Caller, performance_id: Uuid, judge_id: Uuid) -> Result<Score> {
        caller.require_judge(judge_id)?;
        self.scores
            .find(performance_id, judge_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Score not found for performance {} and judge {}",
                    performance_id, judge_id
                ))
            })
    }

    pub async fn list(&self, caller: &Caller, performance_id: Uuid) -> Result<Vec<Score>> {
        caller.require_admin()?;
        self.performance(performance_id).await?;
        Ok(self.scores.find_by_performance(performance_id).await?)
    }

    /// Admin override. Other judges' scores, the item number and the status
    /// are left alone.
    pub async fn delete(
        &self,
        caller: &Caller,
        performance_id: Uuid,
        judge_id: Uuid,
        reason: &str,
    ) -> Result<Score> {
        caller.require_admin()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::Validation(
                "a reason is required to delete a score".to_string(),
            ));
        }

        let performance = self.performance(performance_id).await?;
        let _guard = self.locks.acquire(performance.event_id).await;

        let Some(deletion) = self
            .scores
            .delete_with_audit(performance_id, judge_id, reason, caller.actor_id)
            .await?
        else {
            return Err(ServiceError::NotFound(format!(
                "Score not found for performance {} and judge {}",
                performance_id, judge_id
            )));
        };

        warn!(
            performance_id = %performance_id,
            judge_id = %judge_id,
            reason,
            "Score deleted by admin"
        );
        self.bus.publish(EventEnvelope::for_revision(
            deletion.revision,
            Event::ScoreDeleted {
                event_id: deletion.event_id,
                performance_id,
                judge_id,
            },
        ));

        Ok(deletion.score)
    }

    pub async fn deletions(
        &self,
        caller: &Caller,
        performance_id: Uuid,
    ) -> Result<Vec<ScoreDeletionRecord>> {
        caller.require_admin()?;
        Ok(self.scores.audit_for_performance(performance_id).await?)
    }

    /// Ranked performances of the event. Withdrawn and cancelled
    /// performances are left out.
    pub async fn rankings(&self, caller: &Caller, event_id: Uuid) -> Result<Vec<RankingEntry>> {
        caller.require_staff()?;
        self.ensure_event(event_id).await?;

        let performances = self.performances.find_by_event(event_id, None).await?;
        let mut totals: HashMap<Uuid, Vec<(Uuid, u32)>> = HashMap::new();
        for (performance_id, judge_id, total) in self.scores.totals_for_event(event_id).await? {
            totals.entry(performance_id).or_default().push((judge_id, total));
        }

        let mut entries = Vec::new();
        for performance in performances.into_iter().filter(is_ranked) {
            let scored = totals.remove(&performance.id).unwrap_or_default();
            let roster = self.judges.roster_for_performance(performance.id).await?;
            let judge_ids: Vec<Uuid> = scored.iter().map(|(judge_id, _)| *judge_id).collect();
            let points: Vec<u32> = scored.iter().map(|(_, total)| *total).collect();

            entries.push(RankingEntry::new(
                performance.id,
                performance.item_number,
                performance.title,
                &points,
                ScoringStatus::compute(performance.id, &roster, &judge_ids),
            ));
        }

        sort_rankings(&mut entries);
        info!(event_id = %event_id, ranked = entries.len(), "Rankings computed");
        Ok(entries)
    }

    /// Judge dashboard. Withdrawn performances never appear, whatever the
    /// filter.
    pub async fn judge_performances(
        &self,
        caller: &Caller,
        event_id: Uuid,
        judge_id: Uuid,
        status: Option<PerformanceStatus>,
    ) -> Result<Vec<JudgePerformanceView>> {
        caller.require_judge(judge_id)?;
        self.ensure_event(event_id).await?;
        Ok(self
            .performances
            .find_for_judge(event_id, judge_id, status)
            .await?)
    }

    async fn performance(&self, performance_id: Uuid) -> Result<Performance> {
        self.performances
            .find_by_id(performance_id)
            .await?
            .ok_or_else(|| ServiceError::performance_not_found(performance_id))
    }

    async fn ensure_event(&self, event_id: Uuid) -> Result<()> {
        match self.events.find_by_id(event_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::event_not_found(event_id)),
        }
    }
}

fn is_ranked(performance: &Performance) -> bool {
    !performance.withdrawn_from_judging && performance.status != PerformanceStatus::Cancelled
}
