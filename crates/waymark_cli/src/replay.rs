//! `waymark replay`: feed an NMEA capture through the session handler.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;
use waymark_gps::{
    AccessoryInfo, ExternalGps, ExternalGpsConfig, GpsEvent, MemoryFactory, SessionStats,
    StreamEvent,
};

/// Replay the capture at `file`, printing each fix as a JSON line
pub fn run<W: Write>(
    config: ExternalGpsConfig,
    file: &Path,
    chunk: usize,
    out: &mut W,
) -> Result<SessionStats> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    tracing::info!("Replaying {} ({} bytes)", file.display(), data.len());
    replay_bytes(config, &data, chunk, out)
}

/// Replay `data` in `chunk`-sized reads through an in-memory accessory
pub fn replay_bytes<W: Write>(
    config: ExternalGpsConfig,
    data: &[u8],
    chunk: usize,
    out: &mut W,
) -> Result<SessionStats> {
    let protocol = config
        .protocols
        .first()
        .cloned()
        .context("No accessory protocols configured")?;

    let mut gps = ExternalGps::new(config, MemoryFactory::new());
    let mut events = gps.subscribe();

    let accessory = AccessoryInfo::new(1, "replay").with_protocol(protocol);
    if !gps.accessory_connected(accessory) {
        anyhow::bail!("Failed to open a replay session");
    }
    let handle = gps
        .factory()
        .last_handle()
        .cloned()
        .context("Replay session has no stream")?;
    gps.handle_stream_event(StreamEvent::OpenCompleted);

    for piece in data.chunks(chunk.max(1)) {
        handle.feed(piece);
        gps.handle_stream_event(StreamEvent::HasBytesAvailable);
        write_fixes(&mut events, out)?;
    }

    let stats = gps.stats().clone();
    if !gps.pending_input().is_empty() {
        tracing::warn!(
            "Capture ends with {} bytes of incomplete sentence",
            gps.pending_input().len()
        );
    }
    handle.finish();
    gps.handle_stream_event(StreamEvent::EndEncountered);
    write_fixes(&mut events, out)?;

    tracing::info!(
        fixes = stats.fixes_emitted,
        discarded = stats.sentences_discarded,
        overflows = stats.overflows,
        "Replay finished"
    );
    Ok(stats)
}

fn write_fixes<W: Write>(events: &mut UnboundedReceiver<GpsEvent>, out: &mut W) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        if let GpsEvent::Fix(fix) = event {
            serde_json::to_writer(&mut *out, &fix)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
