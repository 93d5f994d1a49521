//! HTTP front-end for the Plinko PIR query handler.
//!
//! Exposes the server-side contracts over JSON: health, plaintext
//! lookup (debug), set-parity answers, and the two-parity structured
//! query. 256-bit values travel as lossless hex strings. Request
//! bodies are never logged; timing goes back to the client as
//! `server_time_nanos`.

mod config;
mod error;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use config::Config;
use error::ApiError;
use eyre::{ensure, Result, WrapErr};
use plinko_core::db::Database;
use plinko_core::delta::DeltaReader;
use plinko_core::entry::{encode_entry_hex, xor_entry, ENTRY_SIZE};
use plinko_core::server::{Server, StructuredQuery};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

struct AppState {
    server: Server,
    enable_plaintext: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cfg = Config::parse();

    info!("loading snapshot from {:?}", cfg.database_path);
    let mut db = Database::load(&cfg.database_path)?;
    if let Some(delta_dir) = &cfg.delta_dir {
        apply_delta_dir(&mut db, delta_dir)?;
    }

    let server = Server::from_database(&db)?;
    let params = server.params();
    info!(
        "serving {} entries (chunk_size={}, set_size={})",
        params.num_entries, params.chunk_size, params.set_size
    );

    let state = Arc::new(AppState {
        server,
        enable_plaintext: cfg.enable_plaintext,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/query/plaintext", post(plaintext_query))
        .route("/query/parity", post(parity_query))
        .route("/query/structured", post(structured_query))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", cfg.http_port);
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Fold every delta file under `dir` into the snapshot, in filename
/// order, then flush.
fn apply_delta_dir(db: &mut Database, dir: &Path) -> Result<()> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .wrap_err_with(|| format!("reading delta dir {dir:?}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    paths.sort();

    for path in paths {
        let reader = DeltaReader::new(BufReader::new(File::open(&path)?))
            .wrap_err_with(|| format!("opening delta file {path:?}"))?;
        let mut applied = 0u64;
        for record in reader {
            let (index, delta) = record?;
            ensure!(index < db.num_entries(), "delta record index out of range");
            let mut value = db.get(index).unwrap_or_default();
            xor_entry(&mut value, &delta);
            db.update(index, value);
            applied += 1;
        }
        info!("applied {} delta records from {:?}", applied, path);
    }
    db.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    db_size: u64,
    chunk_size: u64,
    set_size: u64,
    entry_size: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let params = state.server.params();
    Json(HealthResponse {
        status: "healthy",
        db_size: params.num_entries,
        chunk_size: params.chunk_size,
        set_size: params.set_size,
        entry_size: ENTRY_SIZE,
    })
}

#[derive(Deserialize)]
struct PlaintextRequest {
    index: u64,
}

#[derive(Serialize)]
struct PlaintextResponse {
    value: String,
    server_time_nanos: u64,
}

async fn plaintext_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaintextRequest>,
) -> Result<Json<PlaintextResponse>, ApiError> {
    if !state.enable_plaintext {
        return Err(ApiError::InvalidRequest("plaintext queries are disabled"));
    }
    let start = Instant::now();
    let entry = state.server.plaintext(req.index)?;
    Ok(Json(PlaintextResponse {
        value: encode_entry_hex(&entry),
        server_time_nanos: start.elapsed().as_nanos() as u64,
    }))
}

#[derive(Deserialize)]
struct ParityRequest {
    indices: Vec<u64>,
}

#[derive(Serialize)]
struct ParityResponse {
    parity: String,
    server_time_nanos: u64,
}

async fn parity_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ParityRequest>,
) -> Result<Json<ParityResponse>, ApiError> {
    let start = Instant::now();
    let parity = state.server.set_parity(&req.indices)?;
    let elapsed = start.elapsed();
    info!("parity query over {} indices in {:?}", req.indices.len(), elapsed);
    Ok(Json(ParityResponse {
        parity: encode_entry_hex(&parity),
        server_time_nanos: elapsed.as_nanos() as u64,
    }))
}

#[derive(Deserialize)]
struct StructuredRequest {
    p: Vec<u64>,
    offsets: Vec<u64>,
}

#[derive(Serialize)]
struct StructuredResponseBody {
    r0: String,
    r1: String,
    server_time_nanos: u64,
}

async fn structured_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StructuredRequest>,
) -> Result<Json<StructuredResponseBody>, ApiError> {
    let start = Instant::now();
    let response = state.server.answer(&StructuredQuery {
        p: req.p,
        offsets: req.offsets,
    })?;
    let elapsed = start.elapsed();
    info!("structured query answered in {:?}", elapsed);
    Ok(Json(StructuredResponseBody {
        r0: encode_entry_hex(&response.r0),
        r1: encode_entry_hex(&response.r1),
        server_time_nanos: elapsed.as_nanos() as u64,
    }))
}
