use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use colored::*;
use roomlink::client::{
    ClientConfig, DEFAULT_STUN_ADDR, IceServerConfig, LeaveReason, LocalMedia, MeshEvent,
    Orchestrator, TransportConfig, WebrtcEngine, WsSignaling,
};
use roomlink::relay::RelayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Opus frame that decodes to 20 ms of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
const FRAME_DURATION: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "roomlink", version, about = "Full-mesh WebRTC rooms over a WebSocket relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, env = "ROOMLINK_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },

    /// Join a room and stay in it until Ctrl-C.
    Join {
        #[arg(long, env = "ROOMLINK_URL", default_value = "ws://127.0.0.1:3000/ws")]
        url: String,

        #[arg(long, env = "ROOMLINK_ROOM")]
        room: String,

        /// STUN/TURN urls, comma separated.
        #[arg(
            long,
            env = "ROOMLINK_STUN",
            default_value = DEFAULT_STUN_ADDR,
            value_delimiter = ','
        )]
        stun: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind } => run_relay(bind).await,
        Commands::Join { url, room, stun } => run_join(&url, room, stun).await,
    }
}

async fn run_relay(bind: SocketAddr) -> Result<()> {
    println!("{}", format!("📡 Relay listening on {}", bind).green().bold());

    let config = RelayConfig { bind };
    tokio::select! {
        res = roomlink::relay::serve(&config) => res.context("Relay stopped")?,
        _ = tokio::signal::ctrl_c() => println!("{}", "Shutting down relay".yellow()),
    }

    Ok(())
}

async fn run_join(url: &str, room: String, stun: Vec<String>) -> Result<()> {
    let (media, audio, _video) = LocalMedia::audio_video("roomlink");
    let transport = TransportConfig {
        ice_servers: stun.into_iter().map(IceServerConfig::stun).collect(),
    };
    let engine = WebrtcEngine::new(transport, media).context("Failed to set up media engine")?;

    let (output, inbound) = WsSignaling::connect(url)
        .await
        .with_context(|| format!("Failed to reach relay at {}", url))?;
    let (handle, mut events) = Orchestrator::spawn(
        Arc::new(engine),
        Arc::new(output),
        &ClientConfig::default(),
    );
    inbound.spawn_forwarding(handle.clone());

    println!("{}", format!("🚀 Joining room {}...", room).green().bold());
    handle.connect(room).await?;

    let silence = tokio::spawn(feed_silence(audio));
    handle.mark_local_media_ready().await?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event);
                if matches!(event, MeshEvent::Left { .. }) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Leaving room...".yellow());
                handle.leave().await?;
            }
        }
    }

    silence.abort();
    Ok(())
}

fn print_event(event: &MeshEvent) {
    match event {
        MeshEvent::Connected { room } => {
            println!("{} {}", "✔ Join sent for room".green(), room.to_string().bold());
        }
        MeshEvent::LinkStable { peer } => {
            println!("{} {}", "🔗 Negotiated with".cyan(), peer);
        }
        MeshEvent::RemoteTrack { peer, track } => {
            println!(
                "{} {:?} track {} from {}",
                "🎧 Receiving".cyan(),
                track.kind,
                track.track_id,
                peer
            );
        }
        MeshEvent::PeerLeft { peer } => {
            println!("{} {}", "👋 Peer left:".yellow(), peer);
        }
        MeshEvent::Left { reason } => match reason {
            LeaveReason::Requested => println!("{}", "✨ Left the room".green().bold()),
            LeaveReason::TransportClosed => {
                println!("{}", "❌ Relay connection lost".red().bold())
            }
        },
    }
}

async fn feed_silence(track: Arc<TrackLocalStaticSample>) {
    let mut ticker = tokio::time::interval(FRAME_DURATION);
    loop {
        ticker.tick().await;
        let sample = Sample {
            data: Bytes::from_static(&OPUS_SILENCE),
            duration: FRAME_DURATION,
            ..Default::default()
        };
        if let Err(e) = track.write_sample(&sample).await {
            debug!("Dropping audio frame: {}", e);
        }
    }
}
