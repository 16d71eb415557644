use crate::ai::{prompts, RequestTracker, TextCompletion};
use crate::errors::{AppError, AppResult};
use crate::kpi;
use crate::models::{
    AppSettings, ArtifactKind, CalendarEvent, CreateDeliveryPayload, CreateEventPayload,
    CreateLeadPayload, CreativeDelivery, DashboardSummary, DeliveryStatus, EventType, Lead,
    MonthlyFinance, Persona, PipelineStage, RoiReport, SaveArtifactPayload, SavedArtifact,
    UpdateLeadPayload, ALL_DAY,
};
use crate::pipeline::PipelineEngine;
use crate::repository::Repository;
use crate::store::CollectionStore;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const DB_FILE: &str = "command-center.db";
const LEADS_KEY: &str = "rgp_leads";
const EVENTS_KEY: &str = "rgp_calendar_events";
const DELIVERIES_KEY: &str = "rgp_deliveries";
const FINANCE_SERIES_KEY: &str = "rgp_finance_series";

static DATE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date key regex"));

/// Owns the store, the repositories and the AI gateway; every user-facing
/// operation of the command center goes through here. Mutations complete
/// their persistence before returning.
pub struct CenterCore {
    store: Arc<CollectionStore>,
    leads: Arc<Repository<Lead>>,
    events: Arc<Repository<CalendarEvent>>,
    deliveries: Arc<Repository<CreativeDelivery>>,
    finance_series: Arc<Repository<MonthlyFinance>>,
    artifacts: HashMap<ArtifactKind, Arc<Repository<SavedArtifact>>>,
    pipeline: PipelineEngine,
    gateway: Arc<dyn TextCompletion>,
    tracker: RequestTracker,
}

impl CenterCore {
    pub fn new(data_dir: &Path, gateway: Arc<dyn TextCompletion>) -> AppResult<Self> {
        let store = Arc::new(CollectionStore::new(&data_dir.join(DB_FILE))?);
        seed_finance_series(&store)?;

        let leads = Arc::new(Repository::open(store.clone(), LEADS_KEY)?);
        let events = Arc::new(Repository::open(store.clone(), EVENTS_KEY)?);
        let deliveries = Arc::new(Repository::open(store.clone(), DELIVERIES_KEY)?);
        let finance_series = Arc::new(Repository::open(store.clone(), FINANCE_SERIES_KEY)?);

        let mut artifacts = HashMap::new();
        for kind in ArtifactKind::ALL {
            artifacts.insert(
                kind,
                Arc::new(Repository::open(store.clone(), kind.collection_key())?),
            );
        }

        let pipeline = PipelineEngine::new(leads.clone());

        Ok(Self {
            store,
            leads,
            events,
            deliveries,
            finance_series,
            artifacts,
            pipeline,
            gateway,
            tracker: RequestTracker::new(),
        })
    }

    // ── Leads ───────────────────────────────────────────────────────────

    pub fn list_leads(&self) -> AppResult<Vec<Lead>> {
        self.leads.list()
    }

    pub fn leads_in_stage(&self, stage: PipelineStage) -> AppResult<Vec<Lead>> {
        self.pipeline.leads_in_stage(stage)
    }

    pub fn create_lead(&self, payload: CreateLeadPayload) -> AppResult<Lead> {
        let name = payload.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("lead name is required".to_string()));
        }
        if !payload.value.is_finite() || payload.value < 0.0 {
            return Err(AppError::Validation(
                "lead value must be zero or a positive amount".to_string(),
            ));
        }

        let lead = self.leads.add(Lead {
            id: String::new(),
            name,
            company: payload.company,
            value: payload.value,
            status: payload.status.unwrap_or(PipelineStage::Prospecting),
            email: payload.email,
            phone: payload.phone,
            location: payload.location,
            source: payload.source,
        })?;
        tracing::info!(lead_id = %lead.id, stage = lead.status.as_str(), "lead created");
        Ok(lead)
    }

    pub fn update_lead(&self, lead_id: &str, patch: UpdateLeadPayload) -> AppResult<Lead> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("lead name is required".to_string()));
            }
        }
        if let Some(value) = patch.value {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Validation(
                    "lead value must be zero or a positive amount".to_string(),
                ));
            }
        }

        self.leads.update_with(lead_id, |lead| {
            if let Some(name) = patch.name {
                lead.name = name.trim().to_string();
            }
            if let Some(value) = patch.value {
                lead.value = value;
            }
            if let Some(status) = patch.status {
                lead.status = status;
            }
            if patch.company.is_some() {
                lead.company = patch.company;
            }
            if patch.email.is_some() {
                lead.email = patch.email;
            }
            if patch.phone.is_some() {
                lead.phone = patch.phone;
            }
            if patch.location.is_some() {
                lead.location = patch.location;
            }
            if patch.source.is_some() {
                lead.source = patch.source;
            }
        })
    }

    pub fn move_lead(&self, lead_id: &str, target: PipelineStage) -> AppResult<Lead> {
        self.pipeline.move_to_stage(lead_id, target)
    }

    pub fn delete_lead(&self, lead_id: &str) -> AppResult<bool> {
        self.leads.remove(lead_id)
    }

    pub fn dashboard_summary(&self) -> AppResult<DashboardSummary> {
        let leads = self.leads.list()?;
        let settings = self.store.get_settings()?;

        let pipeline_total = kpi::pipeline_total(&leads);
        let closed_total = kpi::closed_total(&leads);
        Ok(DashboardSummary {
            pipeline_total,
            closed_total,
            monthly_goal: settings.monthly_goal,
            goal_progress_percent: kpi::goal_progress_percent(closed_total, settings.monthly_goal),
            stage_totals: self.pipeline.stage_totals()?,
        })
    }

    /// ROI calculator: tax and fee rates come from settings rather than the
    /// form, matching how the agency configures them once.
    pub fn roi_report(&self, revenue: f64, cost: f64) -> AppResult<RoiReport> {
        let settings = self.store.get_settings()?;
        let net_profit = kpi::net_profit(
            revenue,
            cost,
            settings.tax_rate_percent,
            settings.fee_rate_percent,
        );
        Ok(RoiReport {
            revenue,
            cost,
            net_profit,
            roi_percent: kpi::roi(net_profit, cost),
            roas: kpi::roas(revenue, cost),
        })
    }

    // ── Calendar ────────────────────────────────────────────────────────

    pub fn list_events(&self) -> AppResult<Vec<CalendarEvent>> {
        self.events.list()
    }

    pub fn events_on(&self, date: &str) -> AppResult<Vec<CalendarEvent>> {
        validate_date_key(date)?;
        let mut events = self.events.list()?;
        events.retain(|event| event.date == date);
        Ok(events)
    }

    /// Month view: events grouped by their lexically sortable day key.
    pub fn events_by_day(&self) -> AppResult<BTreeMap<String, Vec<CalendarEvent>>> {
        let mut grouped: BTreeMap<String, Vec<CalendarEvent>> = BTreeMap::new();
        for event in self.events.list()? {
            grouped.entry(event.date.clone()).or_default().push(event);
        }
        Ok(grouped)
    }

    pub fn create_event(&self, payload: CreateEventPayload) -> AppResult<CalendarEvent> {
        validate_date_key(&payload.date)?;
        let title = payload.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("event title is required".to_string()));
        }

        let time = payload
            .time
            .map(|time| time.trim().to_string())
            .filter(|time| !time.is_empty())
            .unwrap_or_else(|| ALL_DAY.to_string());

        self.events.add(CalendarEvent {
            id: String::new(),
            date: payload.date,
            title,
            time,
            event_type: payload.event_type.unwrap_or(EventType::Meeting),
        })
    }

    /// Events are never edited in place; the panel deletes and recreates.
    pub fn delete_event(&self, event_id: &str) -> AppResult<bool> {
        self.events.remove(event_id)
    }

    // ── Creative deliveries ─────────────────────────────────────────────

    pub fn list_deliveries(&self) -> AppResult<Vec<CreativeDelivery>> {
        self.deliveries.list()
    }

    pub fn create_delivery(&self, payload: CreateDeliveryPayload) -> AppResult<CreativeDelivery> {
        let client = payload.client.trim().to_string();
        if client.is_empty() {
            return Err(AppError::Validation("delivery client is required".to_string()));
        }

        self.deliveries.add(CreativeDelivery {
            id: String::new(),
            client,
            work_type: payload.work_type,
            deadline: payload.deadline,
            status: payload.status.unwrap_or(DeliveryStatus::Pending),
        })
    }

    pub fn set_delivery_status(
        &self,
        delivery_id: &str,
        status: DeliveryStatus,
    ) -> AppResult<CreativeDelivery> {
        self.deliveries
            .update_with(delivery_id, |delivery| delivery.status = status)
    }

    pub fn delete_delivery(&self, delivery_id: &str) -> AppResult<bool> {
        self.deliveries.remove(delivery_id)
    }

    // ── Saved artifacts ─────────────────────────────────────────────────

    pub fn list_artifacts(&self, kind: ArtifactKind) -> AppResult<Vec<SavedArtifact>> {
        self.artifact_repo(kind)?.list()
    }

    /// Explicit "save" on a displayed AI result. Prepended: newest-first.
    pub fn save_artifact(&self, payload: SaveArtifactPayload) -> AppResult<SavedArtifact> {
        let title = payload.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("artifact title is required".to_string()));
        }

        self.artifact_repo(payload.kind)?.add_first(SavedArtifact {
            id: String::new(),
            title,
            content: payload.content,
            date: Utc::now(),
            niche: payload.niche,
        })
    }

    pub fn delete_artifact(&self, kind: ArtifactKind, artifact_id: &str) -> AppResult<bool> {
        self.artifact_repo(kind)?.remove(artifact_id)
    }

    fn artifact_repo(&self, kind: ArtifactKind) -> AppResult<&Arc<Repository<SavedArtifact>>> {
        self.artifacts
            .get(&kind)
            .ok_or_else(|| AppError::Internal(format!("no repository for {}", kind.as_str())))
    }

    // ── Finance series ──────────────────────────────────────────────────

    pub fn finance_series(&self) -> AppResult<Vec<MonthlyFinance>> {
        self.finance_series.list()
    }

    pub fn upsert_month(&self, entry: MonthlyFinance) -> AppResult<MonthlyFinance> {
        if entry.month.trim().is_empty() {
            return Err(AppError::Validation("month label is required".to_string()));
        }
        let (revenue, spend) = (entry.revenue, entry.spend);
        let updated = self.finance_series.update_with(&entry.month, |month| {
            month.revenue = revenue;
            month.spend = spend;
        });
        match updated {
            Ok(updated) => Ok(updated),
            Err(AppError::NotFound(_)) => self.finance_series.add(entry),
            Err(error) => Err(error),
        }
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn settings(&self) -> AppResult<AppSettings> {
        self.store.get_settings()
    }

    pub fn update_settings(&self, patch: serde_json::Value) -> AppResult<AppSettings> {
        self.store.update_settings(patch)
    }

    // ── Persona AI operations ───────────────────────────────────────────

    /// Sofia analyzes the stored revenue-vs-spend series.
    pub async fn finance_insights(&self) -> AppResult<Option<String>> {
        let series = self.finance_series.list()?;
        let prompt = prompts::finance_insights(&serde_json::to_string(&series)?);
        self.generate(Persona::Sofia, prompt).await
    }

    /// Brenner writes objection-handling scripts for the pipeline panel.
    pub async fn sales_objection_script(&self, objection: &str) -> AppResult<Option<String>> {
        let objection = objection.trim();
        if objection.is_empty() {
            return Err(AppError::Validation("objection text is required".to_string()));
        }
        self.generate(Persona::Brenner, prompts::sales_objection_script(objection))
            .await
    }

    /// Dante turns a briefing into a persuasion structure.
    pub async fn copy_strategy(&self, context: &str) -> AppResult<Option<String>> {
        let context = context.trim();
        if context.is_empty() {
            return Err(AppError::Validation("briefing context is required".to_string()));
        }
        self.generate(Persona::Dante, prompts::copy_strategy(context)).await
    }

    /// Rubens brainstorms creative concepts for a client or niche.
    pub async fn creative_ideas(
        &self,
        client_or_niche: &str,
        goal: Option<&str>,
    ) -> AppResult<Option<String>> {
        let client_or_niche = client_or_niche.trim();
        if client_or_niche.is_empty() {
            return Err(AppError::Validation("client or niche is required".to_string()));
        }
        self.generate(
            Persona::Rubens,
            prompts::creative_ideas(client_or_niche, goal.unwrap_or("Geral")),
        )
        .await
    }

    /// `Ok(None)` means a newer request for the same persona superseded this
    /// one while it was in flight; the caller simply drops the result. The
    /// gateway never mutates any collection.
    async fn generate(&self, persona: Persona, prompt: String) -> AppResult<Option<String>> {
        let token = self.tracker.begin(persona)?;
        let outcome = self.gateway.complete(&prompt, persona.role_label()).await;

        if !self.tracker.is_current(persona, token)? {
            tracing::debug!(persona = persona.as_str(), token, "discarding stale completion");
            return Ok(None);
        }

        match outcome {
            Ok(text) => Ok(Some(text)),
            Err(error) => {
                tracing::warn!(persona = persona.as_str(), error = %error, "completion failed");
                Err(error.into())
            }
        }
    }
}

fn validate_date_key(date: &str) -> AppResult<()> {
    if !DATE_KEY_RE.is_match(date) {
        return Err(AppError::Validation(format!(
            "date must be zero-padded YYYY-MM-DD, got {date:?}"
        )));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{date:?} is not a calendar date")))?;
    Ok(())
}

/// First-run defaults for the Sofia panel, matching the series its chart
/// ships with. Only seeded while the collection key has never been written.
fn seed_finance_series(store: &Arc<CollectionStore>) -> AppResult<()> {
    if store.has_collection(FINANCE_SERIES_KEY)? {
        return Ok(());
    }

    let defaults = [
        ("Jan", 45_000.0, 12_000.0),
        ("Fev", 52_000.0, 15_000.0),
        ("Mar", 48_000.0, 14_000.0),
        ("Abr", 61_000.0, 18_000.0),
        ("Mai", 59_000.0, 17_500.0),
        ("Jun", 72_000.0, 22_000.0),
    ];
    let series: Vec<MonthlyFinance> = defaults
        .iter()
        .map(|&(month, revenue, spend)| MonthlyFinance {
            month: month.to_string(),
            revenue,
            spend,
        })
        .collect();
    store.save(FINANCE_SERIES_KEY, &series)
}

#[cfg(test)]
mod tests {
    use super::CenterCore;
    use crate::ai::{AiError, TextCompletion};
    use crate::errors::AppError;
    use crate::models::{
        ArtifactKind, CreateDeliveryPayload, CreateEventPayload, CreateLeadPayload,
        DeliveryStatus, PipelineStage, SaveArtifactPayload, UpdateLeadPayload,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FakeGateway {
        reply: &'static str,
    }

    #[async_trait]
    impl TextCompletion for FakeGateway {
        async fn complete(&self, _prompt: &str, _role: &str) -> Result<String, AiError> {
            Ok(self.reply.to_string())
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl TextCompletion for FailingGateway {
        async fn complete(&self, _prompt: &str, _role: &str) -> Result<String, AiError> {
            Err(AiError::Network("connection refused".to_string()))
        }
    }

    fn center(dir: &tempfile::TempDir) -> CenterCore {
        CenterCore::new(dir.path(), Arc::new(FakeGateway { reply: "ok" })).expect("center")
    }

    fn lead_payload(name: &str, value: f64) -> CreateLeadPayload {
        CreateLeadPayload {
            name: name.to_string(),
            company: None,
            value,
            status: None,
            email: None,
            phone: None,
            location: None,
            source: None,
        }
    }

    #[test]
    fn lead_without_a_name_is_rejected_before_any_mutation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let result = center.create_lead(lead_payload("   ", 5000.0));
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(center.list_leads().expect("list").is_empty());
    }

    #[test]
    fn lead_value_must_be_a_finite_non_negative_amount() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        assert!(matches!(
            center.create_lead(lead_payload("Acme", -1.0)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            center.create_lead(lead_payload("Acme", f64::NAN)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn update_patch_only_touches_supplied_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let mut payload = lead_payload("João Silva", 5000.0);
        payload.company = Some("Tech Solutions".to_string());
        let lead = center.create_lead(payload).expect("create");

        let updated = center
            .update_lead(
                &lead.id,
                UpdateLeadPayload {
                    value: Some(7500.0),
                    status: Some(PipelineStage::Qualification),
                    ..UpdateLeadPayload::default()
                },
            )
            .expect("update");

        assert_eq!(updated.value, 7500.0);
        assert_eq!(updated.status, PipelineStage::Qualification);
        assert_eq!(updated.name, "João Silva");
        assert_eq!(updated.company.as_deref(), Some("Tech Solutions"));
    }

    #[test]
    fn summary_tracks_goal_progress() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        center
            .update_settings(serde_json::json!({ "monthlyGoal": 15000.0 }))
            .expect("set goal");
        let lead = center.create_lead(lead_payload("Ana Costa", 15000.0)).expect("create");
        center.move_lead(&lead.id, PipelineStage::Closed).expect("close");

        let summary = center.dashboard_summary().expect("summary");
        assert_eq!(summary.closed_total, 15000.0);
        assert_eq!(summary.goal_progress_percent, Some(100.0));
    }

    #[test]
    fn event_dates_must_be_zero_padded_calendar_dates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let bad_format = center.create_event(CreateEventPayload {
            date: "2026-8-3".to_string(),
            title: "Kickoff".to_string(),
            time: None,
            event_type: None,
        });
        assert!(matches!(bad_format, Err(AppError::Validation(_))));

        let bad_date = center.create_event(CreateEventPayload {
            date: "2026-02-30".to_string(),
            title: "Kickoff".to_string(),
            time: None,
            event_type: None,
        });
        assert!(matches!(bad_date, Err(AppError::Validation(_))));
    }

    #[test]
    fn event_time_defaults_to_all_day() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let event = center
            .create_event(CreateEventPayload {
                date: "2026-08-30".to_string(),
                title: "Planejamento".to_string(),
                time: Some("  ".to_string()),
                event_type: None,
            })
            .expect("create event");
        assert_eq!(event.time, "Dia todo");

        let on_day = center.events_on("2026-08-30").expect("events on day");
        assert_eq!(on_day.len(), 1);
    }

    #[test]
    fn artifacts_are_listed_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        for title in ["primeiro", "segundo"] {
            center
                .save_artifact(SaveArtifactPayload {
                    kind: ArtifactKind::SalesScript,
                    title: title.to_string(),
                    content: "…".to_string(),
                    niche: None,
                })
                .expect("save");
        }

        let scripts = center.list_artifacts(ArtifactKind::SalesScript).expect("list");
        assert_eq!(scripts[0].title, "segundo");
        assert_eq!(scripts[1].title, "primeiro");

        // Kinds are independent collections.
        assert!(center.list_artifacts(ArtifactKind::Copy).expect("copies").is_empty());
    }

    #[test]
    fn delivery_status_moves_through_the_board() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let delivery = center
            .create_delivery(CreateDeliveryPayload {
                client: "Master Fit".to_string(),
                work_type: "Pack de Anúncios (5)".to_string(),
                deadline: "22/05".to_string(),
                status: None,
            })
            .expect("create");
        assert_eq!(delivery.status, DeliveryStatus::Pending);

        let updated = center
            .set_delivery_status(&delivery.id, DeliveryStatus::InProduction)
            .expect("set status");
        assert_eq!(updated.status, DeliveryStatus::InProduction);
    }

    #[test]
    fn finance_series_is_seeded_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let series = center.finance_series().expect("series");
        assert_eq!(series.len(), 6);
        assert_eq!(series[0].month, "Jan");
        assert_eq!(series[5].revenue, 72_000.0);

        // Clearing the series must survive a reopen; the seed is first-run only.
        center.finance_series.replace_all(Vec::new()).expect("clear");
        drop(center);

        let reopened =
            CenterCore::new(dir.path(), Arc::new(FakeGateway { reply: "ok" })).expect("reopen");
        assert!(reopened.finance_series().expect("series").is_empty());
    }

    #[tokio::test]
    async fn persona_operations_return_generated_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = CenterCore::new(
            dir.path(),
            Arc::new(FakeGateway { reply: "1) Mostre o ROI" }),
        )
        .expect("center");

        let script = center
            .sales_objection_script("Tá caro")
            .await
            .expect("script")
            .expect("not stale");
        assert_eq!(script, "1) Mostre o ROI");
    }

    #[tokio::test]
    async fn gateway_failures_surface_as_ai_errors_without_mutation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = CenterCore::new(dir.path(), Arc::new(FailingGateway)).expect("center");
        center.create_lead(lead_payload("Acme", 5000.0)).expect("create");

        let result = center.copy_strategy("E-mail frio para clínicas").await;
        assert!(matches!(result, Err(AppError::Ai(_))));
        assert_eq!(center.list_leads().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn blank_objection_is_rejected_before_calling_the_gateway() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = center(&dir);

        let result = center.sales_objection_script("  ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
