use clap::{Arg, ArgAction, Command};
use csv_reports::{EngineConfig, IngestConfig, MemoryStore, ReportEngine, Upload};
use env_logger::Env;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let matches = Command::new("ingest")
        .about("Ingests one delimited file and prints the report, stats and column analyses as JSON")
        .arg(Arg::new("path").long("path").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("owner").long("owner").default_value("1").value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("category").long("category"))
        .arg(Arg::new("period").long("period"))
        .arg(Arg::new("public").long("public").help("Mark the report as public").action(ArgAction::SetTrue))
        .arg(Arg::new("column").long("column").help("Column to analyse (repeatable)").action(ArgAction::Append))
        .arg(Arg::new("sample-cap").long("sample-cap").help("Rows kept per report").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("sample").long("sample").help("Include the sampled rows in the output").action(ArgAction::SetTrue))
        .get_matches();

    let Some(path) = matches.get_one::<PathBuf>("path") else {
        anyhow::bail!("Provide --path <file>");
    };
    let owner = matches.get_one::<u64>("owner").copied().unwrap_or(1);
    let category = matches.get_one::<String>("category").map(String::as_str);
    let period = matches.get_one::<String>("period").map(String::as_str);

    let mut ingest = IngestConfig::default();
    if let Some(cap) = matches.get_one::<usize>("sample-cap") {
        ingest.sample_cap = *cap;
    }
    let engine = ReportEngine::with_config(
        MemoryStore::new(),
        EngineConfig {
            ingest,
            ..Default::default()
        },
    );

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = tokio::fs::read(path).await?;

    let start = Instant::now();
    let report = engine
        .ingest(Upload::new(name, bytes), owner, category, period, matches.get_flag("public"))
        .await?;
    let elapsed = start.elapsed().as_secs_f64();

    let mut analyses = Vec::new();
    if let Some(columns) = matches.get_many::<String>("column") {
        for column in columns {
            analyses.push(engine.column_analysis(owner, column).await?);
        }
    }
    let stats = engine.user_stats(owner).await?;

    let mut out = json!({
        "reportId": report.id,
        "fileName": report.original_file_name,
        "encoding": report.encoding,
        "delimiter": report.delimiter.to_string(),
        "headers": report.headers,
        "rowCount": report.row_count,
        "metadata": report.metadata,
        "stats": stats,
        "columns": analyses,
        "elapsedSecs": elapsed,
    });
    if matches.get_flag("sample") {
        out["sampleRows"] = serde_json::to_value(&report.sample_rows)?;
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
