use async_trait::async_trait;
use growth_command_center::ai::{AiError, TextCompletion};
use growth_command_center::models::{
    ArtifactKind, CreateEventPayload, CreateLeadPayload, PipelineStage, SaveArtifactPayload,
};
use growth_command_center::CenterCore;
use std::sync::Arc;

struct CannedGateway;

#[async_trait]
impl TextCompletion for CannedGateway {
    async fn complete(&self, _prompt: &str, _role: &str) -> Result<String, AiError> {
        Ok("- ângulo: antes/depois\n- CTA: agende hoje".to_string())
    }
}

fn open_center(dir: &tempfile::TempDir) -> CenterCore {
    CenterCore::new(dir.path(), Arc::new(CannedGateway)).expect("center")
}

fn lead(name: &str, value: f64, status: Option<PipelineStage>) -> CreateLeadPayload {
    CreateLeadPayload {
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

#[test]
fn full_session_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let acme_id = {
        let center = open_center(&dir);

        let acme = center
            .create_lead(lead("Acme Corp", 5000.0, Some(PipelineStage::Prospecting)))
            .expect("create acme");
        let health = center
            .create_lead(lead("Health & Co", 12000.0, Some(PipelineStage::Qualification)))
            .expect("create health");

        center.move_lead(&acme.id, PipelineStage::Closed).expect("close acme");
        assert!(center.delete_lead(&health.id).expect("delete health"));
        assert!(!center.delete_lead("does-not-exist").expect("missing delete is a no-op"));

        center
            .create_event(CreateEventPayload {
                date: "2026-09-01".to_string(),
                title: "Reunião de pipeline".to_string(),
                time: Some("14:00".to_string()),
                event_type: None,
            })
            .expect("create event");

        center
            .save_artifact(SaveArtifactPayload {
                kind: ArtifactKind::CreativeIdea,
                title: "Reels clínica".to_string(),
                content: "- ângulo: antes/depois".to_string(),
                niche: Some("estética".to_string()),
            })
            .expect("save artifact");

        acme.id
    };

    // Fresh process over the same data dir.
    let center = open_center(&dir);

    let leads = center.list_leads().expect("leads");
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].id, acme_id);
    assert_eq!(leads[0].status, PipelineStage::Closed);

    let summary = center.dashboard_summary().expect("summary");
    assert_eq!(summary.closed_total, 5000.0);
    assert_eq!(summary.pipeline_total, 5000.0);
    let by_stage: f64 = summary.stage_totals.iter().map(|stage| stage.total).sum();
    assert_eq!(by_stage, summary.pipeline_total);

    let events = center.events_on("2026-09-01").expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].time, "14:00");

    let ideas = center.list_artifacts(ArtifactKind::CreativeIdea).expect("ideas");
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0].niche.as_deref(), Some("estética"));
}

#[test]
fn unique_ids_hold_across_many_adds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let center = open_center(&dir);

    for index in 0..25 {
        center
            .create_lead(lead(&format!("Lead {index}"), 100.0, None))
            .expect("create");
    }

    let leads = center.list_leads().expect("leads");
    let mut ids: Vec<&str> = leads.iter().map(|lead| lead.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 25);
}

#[tokio::test]
async fn generated_ideas_can_be_saved_and_reloaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let center = open_center(&dir);

    let ideas = center
        .creative_ideas("Clínica Sorriso", None)
        .await
        .expect("generate")
        .expect("not stale");

    center
        .save_artifact(SaveArtifactPayload {
            kind: ArtifactKind::CreativeIdea,
            title: "Brainstorm agosto".to_string(),
            content: ideas.clone(),
            niche: None,
        })
        .expect("save");

    drop(center);
    let center = open_center(&dir);
    let saved = center.list_artifacts(ArtifactKind::CreativeIdea).expect("list");
    assert_eq!(saved[0].content, ideas);
}
