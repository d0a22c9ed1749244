use archcanvas_core::{
    completion_score, layout, project_summary, render_svg, CanvasError, CanvasOptions,
    CanvasStore, ConnectionDraft, Cost, Domain, Effectiveness, ExportDocument, Impact,
    InteractionType, MitigationDraft, ProjectDraft, ProjectStatus, RiskDraft,
};

#[test]
fn architect_builds_a_project_end_to_end() {
    let store = CanvasStore::seeded();

    store
        .write_library(|lib| {
            lib.upsert_risk(RiskDraft {
                id: "ADV006".into(),
                description: "Insider exfiltrates customer records".into(),
                impact: Impact::Critical,
                likelihood: None,
                domain: Some(Domain::Data),
                category: None,
            })?;
            lib.upsert_mitigation(MitigationDraft {
                id: "MIT006".into(),
                description: "Data loss prevention".into(),
                effectiveness: Effectiveness::Medium,
                cost: Cost::High,
                domain: Some(Domain::Data),
                mitigation_type: None,
                mapped_risks: vec!["ADV006".into()],
            })
        })
        .unwrap();

    store
        .create_project(ProjectDraft {
            name: "Customer Portal".into(),
            description: "Portal security architecture".into(),
            owner: "Robin".into(),
            status: ProjectStatus::InProgress,
        })
        .unwrap();

    store
        .with_project_mut("Customer Portal", |p, lib| {
            p.add_element(Domain::Data, "Customer DB")?;
            p.add_element(Domain::Applications, "Portal")?;
            p.assign_risks(Domain::Data, vec!["ADV006".into(), "ADV004".into()], lib)?;
            p.assign_mitigations(Domain::Data, vec!["MIT006".into()], lib)?;
            p.add_connection(
                ConnectionDraft {
                    source: Domain::Applications,
                    target: Domain::Data,
                    interaction: InteractionType::Uses,
                    risk_id: Some("ADV006".into()),
                    mitigation_id: Some("MIT006".into()),
                },
                lib,
            )?;
            Ok(())
        })
        .unwrap();

    // ADV006 is mapped by MIT006 now, so it cannot be removed.
    let refused = store.write_library(|lib| lib.delete_risk("ADV006"));
    assert!(matches!(refused, Err(CanvasError::RiskInUse { .. })));

    let project = store.project("Customer Portal").unwrap();
    // 3 populated domains (9) + 1 connection (5) + 2 risks (6) + 1 mitigation (3).
    assert_eq!(completion_score(&project), 23);

    let summary = store
        .with_project("Customer Portal", project_summary)
        .unwrap();
    assert_eq!(summary.coverage.covered_risks, 1);
    assert_eq!(summary.coverage.uncovered_risk_details[0].id, "ADV004");
    assert_eq!(summary.coverage.coverage_percentage, 50.0);

    let svg = render_svg(&layout(&project, &CanvasOptions::default()));
    assert!(svg.contains("stroke-dasharray"));

    let doc = store
        .with_project("Customer Portal", ExportDocument::new)
        .unwrap();
    let restored = ExportDocument::from_json(&doc.to_json().unwrap())
        .unwrap()
        .into_store()
        .unwrap();
    let summary_again = restored
        .with_project("Customer Portal", project_summary)
        .unwrap();
    assert_eq!(summary_again.completion, summary.completion);
    assert_eq!(summary_again.coverage.covered_risks, 1);
}
