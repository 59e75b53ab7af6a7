//! roomprobe binary: join the room, find the human, drain their tracks.

use anyhow::Context;
use roomprobe::{
    DrainOptions, FrameDrain, MediaStream, ParticipantLocator, RoomSession, SessionOptions,
    TrackDiscovery, TrackKind, TrackSource, WaitOptions,
};
use roomprobe_core::config::HUMAN_IDENTITY;
use roomprobe_core::{HttpRoomDirectory, ProbeConfig, ProbeError, RoomAdmin, TokenIssuer};
use roomprobe_diagnostics::{LogReporter, WebpSnapshotHook};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ProbeConfig::from_env()?;
    run(config).await?;
    println!("OK");
    Ok(())
}

async fn run(config: ProbeConfig) -> anyhow::Result<()> {
    let issuer = TokenIssuer::from_config(&config)?;
    let server_token = issuer.issue(&config.room_name, &config.identity)?;
    let human_token = issuer.issue(&config.room_name, HUMAN_IDENTITY)?;

    println!(
        "USE THESE TO JOIN:\n  room service url: {}\n  participant token: {}",
        config.service_url, human_token
    );
    println!("press enter to start probing...");
    wait_for_enter().await.context("reading stdin")?;

    let admin = RoomAdmin::new(HttpRoomDirectory::new(&config.service_url, &server_token));
    let room = admin.ensure_room_exists(&config.room_name).await?;
    info!(room = %room.name, newly_created = room.newly_created, "room ready");

    let session = RoomSession::connect(
        &config.service_url,
        &server_token,
        &config.room_name,
        &config.identity,
        SessionOptions {
            auto_subscribe: false,
            dynacast: true,
        },
    )
    .await?;

    let wait = WaitOptions {
        deadline: config.wait_secs.map(Duration::from_secs),
        ..WaitOptions::default()
    };

    let human = ParticipantLocator::new(&session, HUMAN_IDENTITY)
        .locate(&wait)
        .await?;
    info!(identity = %human.identity, sid = %human.sid, "human located");

    let mut streams: Vec<MediaStream> = Vec::new();
    streams.push(
        TrackDiscovery::new(&session, TrackKind::Video, TrackSource::Camera)
            .resolve(&human.identity, &wait)
            .await?,
    );
    if config.audio_enabled {
        streams.push(
            TrackDiscovery::new(&session, TrackKind::Audio, TrackSource::Microphone)
                .resolve(&human.identity, &wait)
                .await?,
        );
    }
    if streams.is_empty() {
        return Err(ProbeError::StreamAbsent {
            what: "media".to_string(),
        }
        .into());
    }

    let drains = streams
        .into_iter()
        .map(|stream| build_drain(&config).run(stream));
    let summaries = futures::future::try_join_all(drains).await?;
    for summary in summaries {
        info!(frames = summary.frames, bytes = summary.bytes, "drain finished");
    }
    Ok(())
}

fn build_drain(config: &ProbeConfig) -> FrameDrain {
    let mut drain = FrameDrain::new(DrainOptions {
        sample_every: config.sample_every,
        memory_report_interval: (config.memory_report_secs > 0)
            .then(|| Duration::from_secs(config.memory_report_secs)),
    });
    drain.add_hook(Box::new(LogReporter));
    if let Some(dir) = &config.snapshot_dir {
        // Snapshot export stays dormant unless a directory is configured.
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "snapshot dir unusable, hook disabled");
        } else {
            drain.add_hook(Box::new(WebpSnapshotHook::new(dir.clone())));
        }
    }
    drain
}

async fn wait_for_enter() -> std::io::Result<()> {
    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(())
}
