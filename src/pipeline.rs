use crate::errors::AppResult;
use crate::kpi;
use crate::models::{Lead, PipelineStage, StageTotal};
use crate::repository::Repository;
use std::sync::Arc;

/// Sales-pipeline domain logic over the leads collection. Gesture handling
/// stays in the UI layer; a completed drag lands here as a single
/// `move_to_stage` call.
pub struct PipelineEngine {
    leads: Arc<Repository<Lead>>,
}

impl PipelineEngine {
    pub fn new(leads: Arc<Repository<Lead>>) -> Self {
        Self { leads }
    }

    /// Column contents, preserving repository (insertion) order.
    pub fn leads_in_stage(&self, stage: PipelineStage) -> AppResult<Vec<Lead>> {
        let mut leads = self.leads.list()?;
        leads.retain(|lead| lead.status == stage);
        Ok(leads)
    }

    /// The authoritative drag-and-drop mutation. Idempotent: dropping a card
    /// on its own column succeeds and changes nothing. No transition rules
    /// are enforced; any stage can move to any stage.
    pub fn move_to_stage(&self, lead_id: &str, target: PipelineStage) -> AppResult<Lead> {
        let moved = self.leads.update_with(lead_id, |lead| lead.status = target)?;
        tracing::info!(lead_id, stage = target.as_str(), "lead moved");
        Ok(moved)
    }

    /// Sum of lead values in one stage, or across the whole board. Invalid
    /// values already aggregate as 0, so the result is never NaN.
    pub fn total_value(&self, stage: Option<PipelineStage>) -> AppResult<f64> {
        let leads = self.leads.list()?;
        Ok(match stage {
            Some(stage) => kpi::stage_total(&leads, stage),
            None => kpi::pipeline_total(&leads),
        })
    }

    /// Per-column card count and monetary total, in board order.
    pub fn stage_totals(&self) -> AppResult<Vec<StageTotal>> {
        let leads = self.leads.list()?;
        Ok(PipelineStage::ALL
            .iter()
            .map(|&stage| StageTotal {
                stage,
                count: leads.iter().filter(|lead| lead.status == stage).count(),
                total: kpi::stage_total(&leads, stage),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineEngine;
    use crate::models::{Lead, PipelineStage};
    use crate::repository::Repository;
    use crate::store::CollectionStore;
    use std::sync::Arc;

    fn lead(name: &str, value: f64, status: PipelineStage) -> Lead {
        Lead {
            id: String::new(),
            name: name.to_string(),
            company: None,
            value,
            status,
            email: None,
            phone: None,
            location: None,
            source: None,
        }
    }

    fn engine(dir: &tempfile::TempDir) -> (Arc<Repository<Lead>>, PipelineEngine) {
        let store = Arc::new(CollectionStore::new(&dir.path().join("test.db")).expect("store"));
        let leads = Arc::new(Repository::open(store, "rgp_leads").expect("repo"));
        (leads.clone(), PipelineEngine::new(leads))
    }

    #[test]
    fn stage_totals_sum_to_the_overall_total() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (leads, engine) = engine(&dir);

        leads.add(lead("João Silva", 5000.0, PipelineStage::Prospecting)).expect("add");
        leads.add(lead("Maria Santos", 12000.0, PipelineStage::Qualification)).expect("add");
        leads.add(lead("Ricardo Oliveira", 8000.0, PipelineStage::Proposal)).expect("add");
        leads.add(lead("Ana Costa", 15000.0, PipelineStage::Closed)).expect("add");

        let by_stage: f64 = PipelineStage::ALL
            .iter()
            .map(|&stage| engine.total_value(Some(stage)).expect("stage total"))
            .sum();
        let overall = engine.total_value(None).expect("overall total");
        assert_eq!(by_stage, overall);
        assert_eq!(overall, 40000.0);
    }

    #[test]
    fn move_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (leads, engine) = engine(&dir);

        let saved = leads
            .add(lead("Maria Santos", 12000.0, PipelineStage::Qualification))
            .expect("add");

        engine.move_to_stage(&saved.id, PipelineStage::Proposal).expect("first move");
        let again = engine.move_to_stage(&saved.id, PipelineStage::Proposal).expect("second move");

        assert_eq!(again.status, PipelineStage::Proposal);
        assert_eq!(engine.total_value(None).expect("total"), 12000.0);
        assert_eq!(
            engine.total_value(Some(PipelineStage::Proposal)).expect("stage total"),
            12000.0
        );
    }

    #[test]
    fn add_then_close_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (leads, engine) = engine(&dir);

        let saved = leads
            .add(lead("Acme Corp", 5000.0, PipelineStage::Prospecting))
            .expect("add");
        engine.move_to_stage(&saved.id, PipelineStage::Closed).expect("move");

        assert_eq!(engine.total_value(Some(PipelineStage::Closed)).expect("closed"), 5000.0);
        assert_eq!(
            engine.total_value(Some(PipelineStage::Prospecting)).expect("prospecting"),
            0.0
        );
    }

    #[test]
    fn columns_preserve_insertion_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (leads, engine) = engine(&dir);

        leads.add(lead("first", 1.0, PipelineStage::Prospecting)).expect("add");
        leads.add(lead("second", 2.0, PipelineStage::Closed)).expect("add");
        leads.add(lead("third", 3.0, PipelineStage::Prospecting)).expect("add");

        let column = engine.leads_in_stage(PipelineStage::Prospecting).expect("column");
        let names: Vec<&str> = column.iter().map(|lead| lead.name.as_str()).collect();
        assert_eq!(names, vec!["first", "third"]);
    }
}
