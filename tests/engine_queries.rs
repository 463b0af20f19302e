use csv_reports::{ErrorKind, MemoryStore, Report, ReportEngine, Upload, UNCATEGORIZED};
use std::sync::Arc;

const ALICE: u64 = 1;
const BOB: u64 = 2;

async fn ingest(
    engine: &ReportEngine<MemoryStore>,
    owner: u64,
    name: &str,
    body: &str,
    category: Option<&str>,
    is_public: bool,
) -> anyhow::Result<Report> {
    let upload = Upload::new(name, body.as_bytes().to_vec());
    Ok(engine
        .ingest(upload, owner, category, Some("2024-01"), is_public)
        .await?)
}

#[tokio::test]
async fn private_reports_are_owner_only() -> anyhow::Result<()> {
    let engine = ReportEngine::new(MemoryStore::new());
    let private = ingest(&engine, ALICE, "p.csv", "a\n1\n", None, false).await?;
    let public = ingest(&engine, ALICE, "q.csv", "a\n1\n", None, true).await?;

    assert_eq!(engine.get(&private.id, Some(ALICE)).await?.id, private.id);

    let err = engine.get(&private.id, Some(BOB)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(err.is_hidden());
    let err = engine.get(&private.id, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert_eq!(engine.get(&public.id, None).await?.id, public.id);
    assert_eq!(engine.get(&public.id, Some(BOB)).await?.id, public.id);

    let err = engine.get("no-such-id", Some(ALICE)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.is_hidden());
    Ok(())
}

#[tokio::test]
async fn deleted_reports_are_gone_for_everyone() -> anyhow::Result<()> {
    let engine = ReportEngine::new(MemoryStore::new());
    let report = ingest(&engine, ALICE, "p.csv", "a\n1\n", None, true).await?;

    let err = engine.delete(&report.id, BOB).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(engine.get(&report.id, None).await.is_ok());

    engine.delete(&report.id, ALICE).await?;
    for requester in [Some(ALICE), Some(BOB), None] {
        let err = engine.get(&report.id, requester).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    let err = engine.delete(&report.id, ALICE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn listing_is_public_or_owned_newest_first() -> anyhow::Result<()> {
    let engine = ReportEngine::new(MemoryStore::new());
    let mine = ingest(&engine, ALICE, "a.csv", "x\n1\n", None, false).await?;
    let bobs_public = ingest(&engine, BOB, "b.csv", "x\n1\n", None, true).await?;
    ingest(&engine, BOB, "c.csv", "x\n1\n", None, false).await?;

    let listed = engine.list_for_user(ALICE).await?;
    let mut ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    let mut expected = vec![mine.id.as_str(), bobs_public.id.as_str()];
    expected.sort_unstable();
    assert_eq!(ids, expected);
    assert!(listed
        .windows(2)
        .all(|w| w[0].uploaded_at >= w[1].uploaded_at));
    Ok(())
}

#[tokio::test]
async fn stats_and_categories() -> anyhow::Result<()> {
    let engine = ReportEngine::new(MemoryStore::new());
    let noisy_label = Some(" Incidentes\u{200B} ");
    ingest(&engine, ALICE, "a.csv", "tipo,zona\nrobo,norte\nhurto,sur\n", noisy_label, true).await?;
    ingest(&engine, ALICE, "b.csv", "tipo;prioridad\nrobo;alta\n", Some("Incidentes"), false).await?;
    ingest(&engine, ALICE, "c.csv", "otra\n1\n2\n3\n", None, false).await?;
    let bobs = ingest(&engine, BOB, "d.csv", "tipo\nfraude\n", Some("Fraudes"), true).await?;

    let stats = engine.user_stats(ALICE).await?;
    assert_eq!(stats.total_reports, 3);
    assert_eq!(stats.total_categories, 1);
    assert_eq!(stats.public_reports, 1);
    assert_eq!(stats.private_reports, 2);
    assert_eq!(stats.reports_by_category["Incidentes"], 2);
    assert_eq!(stats.reports_by_category[UNCATEGORIZED], 1);
    assert_eq!(stats.total_rows, 6);
    assert_eq!(stats.available_columns, vec!["tipo", "zona", "prioridad", "otra"]);

    let categories = engine.categories_with_periods(ALICE).await?;
    assert_eq!(categories["Incidentes"].len(), 2);
    assert_eq!(categories[UNCATEGORIZED].len(), 1);
    assert_eq!(categories["Fraudes"][0].report_id, bobs.id);
    assert_eq!(categories["Fraudes"][0].period.as_deref(), Some("2024-01"));
    Ok(())
}

#[tokio::test]
async fn column_analysis_counts_owned_samples() -> anyhow::Result<()> {
    let engine = ReportEngine::new(MemoryStore::new());
    ingest(&engine, ALICE, "a.csv", "tipo\nrobo\nhurto\nrobo\n\n", None, false).await?;
    ingest(&engine, ALICE, "b.csv", "tipo,n\n,1\nrobo,2\n", None, false).await?;
    ingest(&engine, ALICE, "c.csv", "otra\nrobo\n", None, false).await?;
    ingest(&engine, BOB, "d.csv", "tipo\nrobo\n", None, true).await?;

    let analysis = engine.column_analysis(ALICE, "tipo").await?;
    assert_eq!(analysis.column_name, "tipo");
    assert_eq!(analysis.value_counts[0].value, "robo");
    assert_eq!(analysis.value_counts[0].count, 3);
    assert_eq!(analysis.value_counts[1].value, "hurto");
    assert_eq!(analysis.total_unique_values, 2);
    assert_eq!(analysis.processed_values, 4);
    assert_eq!(analysis.total_values, 5);
    assert!(!analysis.is_limited);

    let json = serde_json::to_value(&analysis)?;
    assert_eq!(json["totalUniqueValues"], 2);
    assert_eq!(json["isLimited"], false);
    Ok(())
}

#[tokio::test]
async fn column_with_many_values_is_truncated_to_twenty() -> anyhow::Result<()> {
    let engine = ReportEngine::new(MemoryStore::new());
    let mut body = String::from("codigo\n");
    for i in 0..25 {
        body.push_str(&format!("C{i:02}\n"));
    }
    ingest(&engine, ALICE, "codes.csv", &body, None, false).await?;

    let analysis = engine.column_analysis(ALICE, "codigo").await?;
    assert_eq!(analysis.value_counts.len(), 20);
    assert_eq!(analysis.unique_values, 20);
    assert_eq!(analysis.total_unique_values, 25);
    assert!(analysis.is_limited);
    Ok(())
}

#[tokio::test]
async fn concurrent_ingestions_are_independent() -> anyhow::Result<()> {
    let engine = Arc::new(ReportEngine::new(MemoryStore::new()));
    let uploads = (0..8).map(|i| {
        let engine = Arc::clone(&engine);
        async move {
            let body = format!("n\n{}", "1\n".repeat(i + 1));
            ingest(&engine, ALICE, &format!("f{i}.csv"), &body, None, false).await
        }
    });
    let reports = futures::future::try_join_all(uploads).await?;

    let mut ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(engine.user_stats(ALICE).await?.total_rows, (1..=8).sum::<u64>());
    Ok(())
}
