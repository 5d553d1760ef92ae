pub mod metrics;

use std::{
	collections::HashSet,
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use docket_service::DocketService;
use docket_storage::{Store, db::Db, search::SearchFilters};

#[derive(Debug, Parser)]
#[command(
	version = docket_cli::VERSION,
	rename_all = "kebab",
	styles = docket_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON gold set: queries with the documents each should retrieve.
	#[arg(long, short = 'g', value_name = "FILE")]
	pub gold: PathBuf,
	/// Overrides every query's `top_k`.
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GoldSet {
	pub name: Option<String>,
	#[serde(default)]
	pub defaults: GoldDefaults,
	pub queries: Vec<GoldQuery>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GoldDefaults {
	pub tenant_id: Option<String>,
	pub category: Option<String>,
	pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GoldQuery {
	pub id: Option<String>,
	pub query: String,
	pub keyword: Option<String>,
	pub category: Option<String>,
	pub tenant_id: Option<String>,
	pub top_k: Option<u32>,
	#[serde(default)]
	pub expected_doc_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct EvalReport {
	pub gold_set: String,
	pub summary: EvalSummary,
	pub queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
	pub query_count: usize,
	/// Queries with at least one expected document. Only these carry metrics.
	pub scored_count: usize,
	pub mean_recall_at_k: Option<f64>,
	pub mean_ndcg: Option<f64>,
	pub latency_ms_p50: f64,
	pub latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
	pub id: String,
	pub query: String,
	pub top_k: u32,
	pub expected_doc_ids: Vec<Uuid>,
	pub retrieved_doc_ids: Vec<Uuid>,
	pub recall_at_k: Option<f64>,
	pub ndcg: Option<f64>,
	pub latency_ms: f64,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = docket_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let gold = load_gold_set(&args.gold)?;
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.storage.postgres.fulltext_index).await?;

	let store: Arc<dyn Store> = Arc::new(db);
	let service = DocketService::new(config, store)?;
	let report = evaluate(&service, &gold, args.top_k).await?;
	let json = serde_json::to_string_pretty(&report)?;

	println!("{json}");

	Ok(())
}

pub fn load_gold_set(path: &Path) -> color_eyre::Result<GoldSet> {
	let raw = fs::read_to_string(path)?;
	let gold: GoldSet = serde_json::from_str(&raw)?;

	if gold.queries.is_empty() {
		return Err(eyre::eyre!("Gold set must include at least one query."));
	}
	if let Some(index) = gold.queries.iter().position(|query| query.query.trim().is_empty()) {
		return Err(eyre::eyre!("Gold query {index} has a blank query."));
	}

	Ok(gold)
}

/// Runs every gold query through embedding and hybrid retrieval and scores the ranked documents.
///
/// `top_k` takes precedence over the query's own value, then the gold set default, then the
/// configured default.
pub async fn evaluate(
	service: &DocketService,
	gold: &GoldSet,
	top_k: Option<u32>,
) -> color_eyre::Result<EvalReport> {
	let mut reports = Vec::with_capacity(gold.queries.len());

	for (index, query) in gold.queries.iter().enumerate() {
		let id = query.id.clone().unwrap_or_else(|| format!("q{index}"));
		let top_k = top_k
			.or(query.top_k)
			.or(gold.defaults.top_k)
			.unwrap_or(service.cfg.retrieval.top_k);
		let tenant = service
			.tenant_scope(query.tenant_id.as_deref().or(gold.defaults.tenant_id.as_deref()))?;
		let filters = SearchFilters {
			category: query.category.clone().or_else(|| gold.defaults.category.clone()),
			tenant,
		};
		let started = Instant::now();
		let embedding = service
			.embed_texts(std::slice::from_ref(&query.query))
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| eyre::eyre!("Embedding returned no vector for gold query {id}."))?;
		let passages = service
			.retrieve(&embedding, &query.query, query.keyword.as_deref(), top_k, &filters)
			.await?;
		let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
		let retrieved = metrics::unique_ids(passages.iter().map(|passage| passage.doc_id));
		let expected = query.expected_doc_ids.iter().copied().collect::<HashSet<_>>();
		let report = QueryReport {
			recall_at_k: metrics::recall_at_k(&retrieved, &expected),
			ndcg: metrics::ndcg_at_k(&retrieved, &expected),
			id,
			query: query.query.clone(),
			top_k,
			expected_doc_ids: query.expected_doc_ids.clone(),
			retrieved_doc_ids: retrieved,
			latency_ms: metrics::round3(latency_ms),
		};

		tracing::debug!(
			query_id = %report.id,
			recall_at_k = ?report.recall_at_k,
			ndcg = ?report.ndcg,
			"Gold query evaluated."
		);

		reports.push(report);
	}

	let summary = summarize(&reports);

	tracing::info!(
		queries = summary.query_count,
		scored = summary.scored_count,
		mean_recall_at_k = ?summary.mean_recall_at_k,
		mean_ndcg = ?summary.mean_ndcg,
		"Gold set evaluated."
	);

	Ok(EvalReport {
		gold_set: gold.name.clone().unwrap_or_else(|| "gold".to_string()),
		summary,
		queries: reports,
	})
}

fn summarize(reports: &[QueryReport]) -> EvalSummary {
	let mut latencies = reports.iter().map(|report| report.latency_ms).collect::<Vec<_>>();

	latencies.sort_by(f64::total_cmp);

	EvalSummary {
		query_count: reports.len(),
		scored_count: reports.iter().filter(|report| report.recall_at_k.is_some()).count(),
		mean_recall_at_k: metrics::mean(reports.iter().map(|report| report.recall_at_k)),
		mean_ndcg: metrics::mean(reports.iter().map(|report| report.ndcg)),
		latency_ms_p50: metrics::round3(metrics::percentile(&latencies, 0.50)),
		latency_ms_p95: metrics::round3(metrics::percentile(&latencies, 0.95)),
	}
}
