// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Thin demonstrative CLI: loads a `c1218` config, opens a TCP-attached
//! optical probe, and runs an identify/negotiate/logon/read-table-0 smoke
//! sequence. The interactive scripting console this once fed is external
//! collaborator territory and lives outside this crate.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Context, Result};
use c1218_toolkit::cfg::{cli::resolve_config_path, config::Config, logger::init_logger};
use c1218_toolkit::channel::ByteChannel;
use c1218_toolkit::hexdump::hexdump;
use c1218_toolkit::session::SessionBuilder;
use tracing::info;

/// A [`ByteChannel`] over a TCP-attached optical probe (serial-to-Ethernet
/// adapters are the common way these show up on a network).
struct TcpChannel {
    stream: TcpStream,
}

impl TcpChannel {
    fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).with_context(|| format!("connecting to {addr}"))?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl ByteChannel for TcpChannel {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        Write::write_all(&mut self.stream, buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        Read::read_exact(&mut self.stream, buf)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        let _ = self.stream.set_read_timeout(Some(timeout));
    }
}

fn main() -> Result<()> {
    let _guard = init_logger("tests/config_logger.yaml").ok();

    let cfg = resolve_config_path("config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;
    let creds = cfg.credentials().context("invalid credentials in config")?;

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let channel = TcpChannel::connect(&addr)?;

    let mut session = SessionBuilder::new()
        .pktsize(cfg.c1218.pktsize)
        .nbrpkts(cfg.c1218.nbrpkts)
        .cache_enabled(cfg.c1218.cache_tables)
        .build(channel)
        .scoped();

    let ident = session.open().context("identify/negotiate failed")?;
    info!(
        version = ident.std_version,
        revision = ident.std_revision,
        "identified meter"
    );

    session.login(&creds).context("logon/security failed")?;
    info!("authenticated");

    let table0 = session.read_table(0).context("reading table 0 failed")?;
    info!("table 0:\n{}", hexdump(&table0));

    session.close().context("terminate failed")?;
    Ok(())
}
