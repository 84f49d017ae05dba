use std::{env, fs::File, io::BufWriter};

use anyhow::{bail, Context, Result};
use dashboard_service::{
    api::parse_day,
    config::AppConfig,
    export,
    filter::MetricKind,
    history::{load_history, FetchMode, HistoryFilter, HistoryLimits},
    observability,
};
use monitor_client::{DocumentStore, PgDocumentStore};
use sqlx::postgres::PgPoolOptions;

const USAGE: &str = "usage: machine_history <machine_id> [--date YYYY-MM-DD] [--from YYYY-MM-DD] \
[--to YYYY-MM-DD] [--metric temperature|vibration] [--apply] [--export <csv_path>]";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(machine_id) = args.first().filter(|a| !a.starts_with("--")).cloned() else {
        bail!(USAGE);
    };

    let cfg = AppConfig::load()?;
    let mut filter = HistoryFilter::new(cfg.history.local_offset()?).with_machine(machine_id.clone());
    let mut mode = FetchMode::Initial;
    let mut export_path = None;

    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        let mut value = || rest.next().with_context(|| format!("{flag} needs a value\n{USAGE}"));
        filter = match flag.as_str() {
            "--date" => filter.with_quick_date(parse_day(Some(value()?.as_str())).map_err(anyhow::Error::msg)?),
            "--from" => filter.with_from_date(parse_day(Some(value()?.as_str())).map_err(anyhow::Error::msg)?),
            "--to" => filter.with_to_date(parse_day(Some(value()?.as_str())).map_err(anyhow::Error::msg)?),
            "--metric" => filter.with_metric(value()?.parse::<MetricKind>().map_err(anyhow::Error::msg)?),
            "--apply" => {
                mode = FetchMode::ApplyFilters;
                filter
            }
            "--export" => {
                export_path = Some(value()?.clone());
                filter
            }
            other => bail!("unknown argument '{other}'\n{USAGE}"),
        };
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.store.max_connections)
        .connect(&cfg.store.uri)
        .await?;
    let store = PgDocumentStore::new(pool);

    let view = load_history(&store, &filter, HistoryLimits::from(&cfg.history), mode).await?;
    tracing::info!(
        machine_id = %view.machine_id,
        total_records = view.total_records,
        valid_records = view.valid_records,
        alert_level = view.evaluation.alert_level.as_str(),
        "machine history loaded"
    );
    println!("{}", serde_json::to_string_pretty(&view)?);

    if let Some(path) = export_path {
        if view.readings.is_empty() {
            tracing::warn!(machine_id = %machine_id, "no valid readings to export");
            return Ok(());
        }

        let company = store
            .fetch_machines()
            .await?
            .into_iter()
            .find(|m| m.id == machine_id)
            .map(|m| m.company)
            .unwrap_or_default();

        let file = File::create(&path).with_context(|| format!("failed to create '{path}'"))?;
        export::write_history_csv(BufWriter::new(file), &view.readings, &machine_id, &company)?;
        tracing::info!(path = %path, rows = view.readings.len(), "history exported");
    }

    Ok(())
}
