use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// All-day marker used when an event has no explicit time.
pub const ALL_DAY: &str = "Dia todo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    #[serde(rename = "PROSPECÇÃO")]
    Prospecting,
    #[serde(rename = "QUALIFICAÇÃO")]
    Qualification,
    #[serde(rename = "PROPOSTA")]
    Proposal,
    #[serde(rename = "FECHAMENTO")]
    Closed,
}

impl PipelineStage {
    /// Board order. Display-only: a lead may move between any two stages.
    pub const ALL: [PipelineStage; 4] = [
        Self::Prospecting,
        Self::Qualification,
        Self::Proposal,
        Self::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "PROSPECÇÃO",
            Self::Qualification => "QUALIFICAÇÃO",
            Self::Proposal => "PROPOSTA",
            Self::Closed => "FECHAMENTO",
        }
    }
}

/// Accepts numbers, numeric strings, or garbage; anything non-numeric
/// aggregates as 0 so board totals never go NaN.
fn lenient_money<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let value = match raw {
        Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(text)) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub value: f64,
    pub status: PipelineStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub value: f64,
    /// Defaults to the column the user was viewing; PROSPECTING otherwise.
    #[serde(default)]
    pub status: Option<PipelineStage>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Edit-modal patch: only supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub status: Option<PipelineStage>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "reuniao")]
    Meeting,
    #[serde(rename = "entrega")]
    Delivery,
    #[serde(rename = "lembrete")]
    Reminder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    /// Zero-padded `YYYY-MM-DD` so day grouping sorts lexically.
    pub date: String,
    pub title: String,
    pub time: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub event_type: Option<EventType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    SalesScript,
    Copy,
    CreativeIdea,
    FinanceReport,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        Self::SalesScript,
        Self::Copy,
        Self::CreativeIdea,
        Self::FinanceReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SalesScript => "sales-script",
            Self::Copy => "copy",
            Self::CreativeIdea => "creative-idea",
            Self::FinanceReport => "finance-report",
        }
    }

    pub fn collection_key(self) -> &'static str {
        match self {
            Self::SalesScript => "rgp_sales_scripts",
            Self::Copy => "rgp_copy_library",
            Self::CreativeIdea => "rgp_creative_ideas",
            Self::FinanceReport => "rgp_finance_reports",
        }
    }
}

/// Named snapshot of a generated AI text. Immutable once saved except via
/// delete; stored newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArtifact {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niche: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveArtifactPayload {
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub niche: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "EM_PRODUCAO")]
    InProduction,
    #[serde(rename = "REVISAO")]
    Review,
    #[serde(rename = "ENTREGUE")]
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDENTE",
            Self::InProduction => "EM_PRODUCAO",
            Self::Review => "REVISAO",
            Self::Delivered => "ENTREGUE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeDelivery {
    pub id: String,
    pub client: String,
    #[serde(rename = "type")]
    pub work_type: String,
    pub deadline: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryPayload {
    pub client: String,
    #[serde(rename = "type")]
    pub work_type: String,
    pub deadline: String,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
}

/// One month of the revenue-vs-spend series fed into Sofia's analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyFinance {
    pub month: String,
    pub revenue: f64,
    pub spend: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona {
    Sofia,
    Brenner,
    Dante,
    Rubens,
}

impl Persona {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sofia => "sofia",
            Self::Brenner => "brenner",
            Self::Dante => "dante",
            Self::Rubens => "rubens",
        }
    }

    /// Role label sent alongside every gateway request.
    pub fn role_label(self) -> &'static str {
        match self {
            Self::Sofia => "Sofia (Financeiro)",
            Self::Brenner => "Brenner (Vendas)",
            Self::Dante => "Dante (Copywriter)",
            Self::Rubens => "Rubens (Criativo)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub monthly_goal: f64,
    pub tax_rate_percent: f64,
    pub fee_rate_percent: f64,
    pub ai_model: String,
    pub ai_max_tokens: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            monthly_goal: 50_000.0,
            tax_rate_percent: 8.0,
            fee_rate_percent: 5.0,
            ai_model: "gpt-4o-mini".to_string(),
            ai_max_tokens: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTotal {
    pub stage: PipelineStage,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub pipeline_total: f64,
    pub closed_total: f64,
    pub monthly_goal: f64,
    /// Raw percentage; may exceed 100 and callers clamp for display.
    pub goal_progress_percent: Option<f64>,
    pub stage_totals: Vec<StageTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiReport {
    pub revenue: f64,
    pub cost: f64,
    pub net_profit: f64,
    pub roi_percent: Option<f64>,
    pub roas: Option<f64>,
}

macro_rules! impl_entity {
    ($($record:ty),+ $(,)?) => {
        $(impl crate::repository::Entity for $record {
            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })+
    };
}

impl_entity!(Lead, CalendarEvent, SavedArtifact, CreativeDelivery);

/// Finance months key on the month label rather than an id.
impl crate::repository::Entity for MonthlyFinance {
    fn id(&self) -> &str {
        &self.month
    }

    fn set_id(&mut self, id: String) {
        self.month = id;
    }
}
