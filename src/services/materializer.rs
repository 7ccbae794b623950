//! Instance materialization service
//!
//! Turns recurrence patterns into concrete instance rows over a rolling
//! lookahead window. Materialization is idempotent: instance ids are
//! derived from (template, occurrence instant), so re-running a window
//! can only create missing rows or refresh display fields, never
//! duplicate an occurrence or disturb its registrations.

use std::collections::HashSet;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use crate::config::settings::EngineConfig;
use crate::database::repositories::{TemplateRepository, InstanceRepository, RegistrationRepository, UpsertOutcome};
use crate::models::instance::{EventInstance, CreateInstanceRequest};
use crate::models::template::{EventTemplate, RecurrencePattern, CreateTemplateRequest, UpdateTemplateRequest};
use crate::recurrence::{occurrences_in_window, Occurrence};
use crate::utils::errors::{RepriseError, Result};
use crate::utils::logging::log_materialization;
use crate::utils::time::{format_local_time, format_day_of_week, format_date_display};

/// What a materialization run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializationReport {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
}

impl MaterializationReport {
    pub fn total(&self) -> u32 {
        self.created + self.updated + self.unchanged
    }
}

/// How a pattern edit treats future instances that already carry
/// registrations but no longer occur under the new pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternConflictPolicy {
    /// Refuse the edit and leave everything untouched
    Reject,
    /// Apply the edit, cancelling the conflicting instances and their
    /// registrations
    CancelInstances,
}

#[derive(Clone)]
pub struct InstanceMaterializer {
    templates: TemplateRepository,
    instances: InstanceRepository,
    registrations: RegistrationRepository,
    lookahead_days: i64,
}

impl InstanceMaterializer {
    pub fn new(
        templates: TemplateRepository,
        instances: InstanceRepository,
        registrations: RegistrationRepository,
        config: &EngineConfig,
    ) -> Self {
        Self {
            templates,
            instances,
            registrations,
            lookahead_days: config.lookahead_days,
        }
    }

    /// Create a template and materialize its initial window
    pub async fn create_template(&self, request: CreateTemplateRequest, now: DateTime<Utc>) -> Result<(EventTemplate, MaterializationReport)> {
        request.pattern.validate()?;
        let template = self.templates.create(request).await?;
        let report = self.materialize(template.id, now).await?;
        Ok((template, report))
    }

    /// Update template display fields (never the pattern)
    pub async fn update_template(&self, template_id: Uuid, request: UpdateTemplateRequest) -> Result<EventTemplate> {
        self.templates.update(template_id, request).await
    }

    /// Materialize the lookahead window of one template
    ///
    /// Occurrences that lose a concurrent id race are logged and left
    /// for the next scheduled run.
    #[instrument(skip(self), fields(template_id = %template_id))]
    pub async fn materialize(&self, template_id: Uuid, now: DateTime<Utc>) -> Result<MaterializationReport> {
        let template = self
            .templates
            .find_by_id(template_id)
            .await?
            .ok_or(RepriseError::TemplateNotFound { template_id })?;

        if !template.is_active {
            info!(template_id = %template_id, "Template inactive, nothing to materialize");
            return Ok(MaterializationReport::default());
        }

        let window_end = now + Duration::days(self.lookahead_days);
        let occurrences = occurrences_in_window(&template.pattern, now, window_end)?;

        let mut report = MaterializationReport::default();
        for occurrence in occurrences {
            match self.instances.upsert(instance_request(&template, &occurrence)).await {
                Ok((_, UpsertOutcome::Created)) => report.created += 1,
                Ok((_, UpsertOutcome::Refreshed)) => report.updated += 1,
                Ok((_, UpsertOutcome::Unchanged)) => report.unchanged += 1,
                Err(RepriseError::StaleMaterialization { template_id, detail }) => {
                    warn!(template_id = %template_id, detail = %detail, "Skipping stale occurrence");
                }
                Err(err) => return Err(err),
            }
        }

        log_materialization(template_id, report.created, report.updated, report.unchanged);
        Ok(report)
    }

    /// Materialize every active template
    ///
    /// Per-template failures are collected, not fatal: one bad pattern
    /// must not starve the rest of the roll-forward.
    pub async fn materialize_all(&self, now: DateTime<Utc>) -> Result<(MaterializationReport, u32, Vec<String>)> {
        let templates = self.templates.list_active().await?;
        let scanned = templates.len() as u32;

        let mut combined = MaterializationReport::default();
        let mut errors = Vec::new();
        for template in templates {
            match self.materialize(template.id, now).await {
                Ok(report) => {
                    combined.created += report.created;
                    combined.updated += report.updated;
                    combined.unchanged += report.unchanged;
                }
                Err(err) => {
                    warn!(template_id = %template.id, error = %err, "Materialization failed for template");
                    errors.push(format!("template {}: {}", template.id, err));
                }
            }
        }

        Ok((combined, scanned, errors))
    }

    /// Replace a template's recurrence pattern
    ///
    /// Future instances that no longer occur under the new pattern are
    /// checked for active registrations before anything is written.
    /// With [`PatternConflictPolicy::Reject`] a conflict aborts the
    /// edit; with [`PatternConflictPolicy::CancelInstances`] the
    /// conflicting instances and their registrations are cancelled.
    #[instrument(skip(self, pattern), fields(template_id = %template_id))]
    pub async fn update_pattern(
        &self,
        template_id: Uuid,
        pattern: RecurrencePattern,
        policy: PatternConflictPolicy,
        now: DateTime<Utc>,
    ) -> Result<(EventTemplate, MaterializationReport)> {
        pattern.validate()?;

        if self.templates.find_by_id(template_id).await?.is_none() {
            return Err(RepriseError::TemplateNotFound { template_id });
        }

        let existing_future: Vec<EventInstance> = self
            .instances
            .list_future_for_template(template_id, now)
            .await?
            .into_iter()
            .filter(|instance| !instance.is_cancelled)
            .collect();

        // Evaluate the new pattern over a window wide enough to cover
        // every already-materialized future instance
        let mut window_end = now + Duration::days(self.lookahead_days);
        if let Some(last) = existing_future.last() {
            window_end = window_end.max(last.event_date);
        }
        let expected: HashSet<Uuid> = occurrences_in_window(&pattern, now, window_end)?
            .into_iter()
            .map(|occurrence| EventInstance::deterministic_id(template_id, occurrence.utc))
            .collect();

        let dropped: Vec<&EventInstance> = existing_future
            .iter()
            .filter(|instance| !expected.contains(&instance.id))
            .collect();

        if !dropped.is_empty() {
            let active_counts = self
                .registrations
                .active_counts_for_future_instances(template_id, now)
                .await?;

            let dropped_ids: HashSet<Uuid> = dropped.iter().map(|instance| instance.id).collect();
            let conflicts: Vec<(Uuid, i64)> = active_counts
                .into_iter()
                .filter(|(instance_id, _)| dropped_ids.contains(instance_id))
                .collect();

            if let Some(&(instance_id, active_registrations)) = conflicts.first() {
                if policy == PatternConflictPolicy::Reject {
                    return Err(RepriseError::RegisteredInstanceConflict {
                        instance_id,
                        active_registrations,
                    });
                }
            }

            let conflict_ids: HashSet<Uuid> = conflicts.iter().map(|(id, _)| *id).collect();

            // Instances nobody registered for are just window padding
            let deletable: Vec<Uuid> = dropped
                .iter()
                .filter(|instance| !conflict_ids.contains(&instance.id))
                .map(|instance| instance.id)
                .collect();
            let deleted = self.instances.delete_by_ids(&deletable).await?;

            let mut cancelled = 0u64;
            for instance_id in conflict_ids {
                let (_, registrations) = self
                    .registrations
                    .cancel_instance_with_registrations(instance_id, now)
                    .await?;
                cancelled += registrations;
            }

            info!(
                template_id = %template_id,
                deleted = deleted,
                cancelled_registrations = cancelled,
                "Dropped instances no longer produced by the pattern"
            );
        }

        // Pattern write happens only after the conflict check passed
        let template = self.templates.update_pattern(template_id, &pattern).await?;

        let report = self.materialize(template_id, now).await?;
        Ok((template, report))
    }

    /// Upcoming instances across all templates
    pub async fn list_upcoming(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<EventInstance>> {
        self.instances.list_upcoming(now, limit).await
    }
}

fn instance_request(template: &EventTemplate, occurrence: &Occurrence) -> CreateInstanceRequest {
    let local_date = occurrence.local.date();
    let zoned = occurrence.utc.with_timezone(&template.pattern.timezone);

    CreateInstanceRequest {
        id: EventInstance::deterministic_id(template.id, occurrence.utc),
        template_id: template.id,
        event_date: occurrence.utc,
        local_time: format_local_time(occurrence.local.time()),
        timezone_abbr: zoned.format("%Z").to_string(),
        day_of_week: format_day_of_week(local_date),
        date_display: format_date_display(local_date),
        max_attendees: template.max_attendees,
        price_minor: template.price_minor,
    }
}
