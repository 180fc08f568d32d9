// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden server binary.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_migrate::AbortSignal;
use warden_migrate_core::{ImportOptions, SourceCredential, TenantId};
use warden_server::headless::{render_preview, render_result};
use warden_server::{
	build_orchestrator, create_app_state, create_router, run_headless, spawn_session_sweep,
	HeadlessImport,
};
use warden_server_config::ServerConfig;

mod version;

/// Environment variable holding the source admin credential for `migrate`.
const CREDENTIAL_ENV: &str = "WARDEN_SOURCE_CREDENTIAL";

/// Warden server - multi-tenant auth service user migrations.
#[derive(Parser, Debug)]
#[command(name = "warden-server", about = "Warden user migration server", version)]
struct Args {
	/// Config file to read instead of /etc/warden/server.toml
	#[arg(long, global = true, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Import users from a source provider into a tenant from the terminal
	Migrate(MigrateArgs),
	/// Show version and build information
	Version,
}

#[derive(ClapArgs, Debug)]
struct MigrateArgs {
	/// Destination tenant id
	#[arg(long)]
	tenant: TenantId,

	/// Source provider base URL
	#[arg(long)]
	source_url: String,

	/// Skip users whose email already exists instead of failing them
	#[arg(long)]
	skip_existing: bool,

	/// Reuse source user ids as destination ids
	#[arg(long)]
	preserve_ids: bool,

	/// Copy source metadata onto destination users
	#[arg(long)]
	import_metadata: bool,

	/// Carry OAuth provider links over
	#[arg(long)]
	preserve_oauth: bool,

	/// Records committed per batch
	#[arg(long)]
	batch_size: Option<usize>,

	/// Resume in place this many times after transient source failures
	#[arg(long, default_value_t = 3)]
	max_resumes: u32,

	/// Write the skipped/failed report here as CSV
	#[arg(long)]
	errors_out: Option<PathBuf>,

	/// Start without asking for confirmation after the preview
	#[arg(long, short = 'y')]
	yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => warden_server_config::load_config_with_file(path)?,
		None => warden_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	match args.command {
		Some(Command::Migrate(migrate)) => run_migrate(&config, migrate).await,
		_ => serve(&config).await,
	}
}

async fn serve(config: &ServerConfig) -> anyhow::Result<()> {
	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting warden-server"
	);

	let pool = warden_server_db::create_pool(&config.database.url).await?;
	warden_server_db::run_migrations(&pool).await?;

	let state = create_app_state(config, pool);
	let sweep = spawn_session_sweep(&state, &config.migrate);
	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	tracing::info!(addr = %addr, "server listening");

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	sweep.abort();
	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn run_migrate(config: &ServerConfig, args: MigrateArgs) -> anyhow::Result<()> {
	let credential = std::env::var(CREDENTIAL_ENV)
		.map(SourceCredential::new)
		.with_context(|| format!("{CREDENTIAL_ENV} must hold the source admin credential"))?;

	let pool = warden_server_db::create_pool(&config.database.url).await?;
	warden_server_db::run_migrations(&pool).await?;
	let orchestrator = build_orchestrator(&config.migrate, pool);

	let abort = AbortSignal::new();
	{
		let abort = abort.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				tracing::warn!("abort requested, stopping after the current batch");
				abort.abort();
			}
		});
	}

	let request = HeadlessImport {
		tenant_id: args.tenant,
		source_url: args.source_url,
		credential,
		options: ImportOptions {
			batch_size: args.batch_size.unwrap_or(config.migrate.default_batch_size),
			skip_existing: args.skip_existing,
			preserve_ids: args.preserve_ids,
			import_metadata: args.import_metadata,
			preserve_oauth: args.preserve_oauth,
		},
		max_resumes: args.max_resumes,
	};

	let assume_yes = args.yes;
	let session = run_headless(&orchestrator, request, &abort, |preview| {
		print!("{}", render_preview(preview));
		assume_yes || confirm("Start the import?")
	})
	.await?;

	if let Some(result) = session.result() {
		println!("{}", render_result(result));
	}

	if let (Some(path), Some(ledger)) = (&args.errors_out, session.error_report()) {
		let csv = ledger.export()?;
		std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
		println!("Error report written to {} ({} rows).", path.display(), ledger.len());
	}

	if let Some(failure) = session.failure() {
		anyhow::bail!(
			"import stopped ({}): {}. Re-run with --skip-existing to continue.",
			failure.kind.as_code(),
			failure.message
		);
	}
	Ok(())
}

fn confirm(prompt: &str) -> bool {
	print!("{prompt} [y/N] ");
	if std::io::stdout().flush().is_err() {
		return false;
	}
	let mut answer = String::new();
	if std::io::stdin().lock().read_line(&mut answer).is_err() {
		return false;
	}
	matches!(answer.trim(), "y" | "Y" | "yes")
}
