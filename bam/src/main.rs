use core::net::SocketAddr;
use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::{Context, Result};
use bam::{
    api::{DebugState, Server},
    cfg::Config,
    cmd::Cmd,
    engine, headers,
    headers::Credential,
    pipeline::{self, Handoff, PipelineStat, RequestTemplate},
    source::UrlSource,
};
use clap::Parser;
use http::HeaderMap;
use tokio::{runtime::Builder, sync::mpsc};

pub fn main() {
    let cmd = match Cmd::try_parse() {
        Ok(cmd) => cmd,
        // Help and version go to stdout with status 0; real parse errors
        // must exit with status 1.
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };
    bam::logging::init(cmd.verbose as usize).unwrap();

    if let Err(err) = run(cmd) {
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "ERROR: {err}");
        let _ = writeln!(stderr);
        let _ = Cmd::write_usage(&mut stderr);
        std::process::exit(1);
    }
}

fn run(cmd: Cmd) -> Result<()> {
    // The header set and the test flag are fixed for the whole run, keyed
    // by the start time.
    let start = chrono::Local::now();
    let headers = headers::assemble(
        &cmd.content_type,
        &cmd.secret_key,
        cmd.headers.as_deref(),
        cmd.accept.as_deref(),
        start,
    )?;
    let credential = cmd.auth.as_deref().map(headers::parse_credential).transpose()?;

    let cfg: Config = cmd.try_into()?;
    let cfg = Arc::new(cfg);

    Builder::new_multi_thread()
        .worker_threads(cfg.cpus.get())
        .enable_io()
        .enable_time()
        .thread_name("runtime")
        .build()?
        .block_on(serve(cfg, headers, credential))
}

async fn serve(cfg: Arc<Config>, headers: Arc<HeaderMap>, credential: Option<Credential>) -> Result<()> {
    let stat = Arc::new(PipelineStat::default());

    // Introspection endpoint. Losing it never fails the run.
    let server = Server::new(
        SocketAddr::from(([127, 0, 0, 1], cfg.debug_port)),
        Arc::new(DebugState::new(stat.clone())),
    );
    tokio::spawn(async move {
        if let Err(err) = server.run().await {
            log::warn!("debug endpoint unavailable: {err}");
        }
    });

    let source = UrlSource::from_target(&cfg.target)
        .await
        .context("failed to open URL file")?;
    let template = RequestTemplate::new(cfg.method.clone(), headers, credential);

    let (err_tx, mut err_rx) = mpsc::channel(1);
    let requests = pipeline::spawn(source, template, stat, err_tx);

    // The engine owns termination; a producer error preempts it and takes
    // the whole run down.
    tokio::select! {
        done = engine::run(Handoff { requests, cfg: cfg.clone() }) => {
            log::info!("run complete, {done} requests consumed");
            Ok(())
        }
        Some(err) = err_rx.recv() => Err(err.into()),
    }
}
