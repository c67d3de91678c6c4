//! Joins a voice channel, plays a short tone and logs who is talking.
//!
//! Requires `TOKEN`, `GUILD_ID` and `CHANNEL_ID` in the environment (or a
//! `.env` file). Set `RUST_LOG=phonic=debug` to follow the handshake.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::f32::consts::TAU;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use phonic::audio::{OpusEncoder, STEREO_FRAME_LEN, VoiceReceiver};
use phonic::client::{VoiceClient, VoiceConfig, VoiceSessionParameters};
use phonic::gateway::{VoiceClientSender, VoiceEvent, VoiceGatewayError};
use phonic::types::payload::speaking::SpeakingFlags;

use twilight_gateway::{CloseFrame, Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_model::gateway::payload::incoming::VoiceServerUpdate;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::voice::VoiceState;

const TONE_SECONDS: usize = 5;

fn parse_id_from_env<T>(env: &'static str) -> Result<Id<T>> {
    let content = dotenvy::var(env).with_context(|| format!("missing `{env}` environment variable"))?;
    Id::<T>::from_str(&content).with_context(|| format!("could not parse Discord snowflake of {env:?}"))
}

async fn next_voice_event(
    client: &mut Option<VoiceClient>,
) -> Option<Result<VoiceEvent, VoiceGatewayError>> {
    match client {
        Some(client) => client.next().await,
        None => std::future::pending().await,
    }
}

async fn play_tone(sender: VoiceClientSender) -> Result<()> {
    let mut encoder = OpusEncoder::new()?;
    sender.speaking(SpeakingFlags::MICROPHONE)?;

    let mut phase = 0f32;
    let mut pcm = vec![0f32; STEREO_FRAME_LEN];
    for _ in 0..TONE_SECONDS * 50 {
        for sample in pcm.chunks_exact_mut(2) {
            let value = phase.sin() * 0.2;
            sample.fill(value);
            phase = (phase + TAU * 440.0 / 48_000.0) % TAU;
        }

        // Waits while the frame queue is full, which paces this loop.
        sender.send_opus(encoder.encode(&pcm)?).await?;
    }

    sender.speaking(SpeakingFlags::empty())?;
    Ok(())
}

async fn log_speakers(receiver: VoiceReceiver) {
    while let Some(packet) = receiver.recv_async().await {
        if packet.sequence % 250 == 0 {
            info!(ssrc = packet.ssrc, user_id = ?packet.user_id, len = packet.opus.len(), "receiving voice");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let token = dotenvy::var("TOKEN").context("missing `TOKEN` environment variable")?;
    let guild_id = parse_id_from_env::<GuildMarker>("GUILD_ID")?;
    let channel_id = parse_id_from_env::<ChannelMarker>("CHANNEL_ID")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut shard = Shard::new(
        ShardId::ONE,
        token,
        Intents::GUILDS | Intents::GUILD_VOICE_STATES,
    );

    let mut client: Option<VoiceClient> = None;
    let mut user_id: Option<Id<UserMarker>> = None;
    let mut state: Option<VoiceState> = None;
    let mut server: Option<VoiceServerUpdate> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("ctrl+c detected, leaving the voice channel");
                shard.command(&VoiceClient::leave(guild_id));
                if let Some(client) = client.as_ref() {
                    _ = client.sender().close(CloseFrame::NORMAL);
                } else {
                    break;
                }
            },
            event = next_voice_event(&mut client) => match event {
                Some(Ok(VoiceEvent::Ready(session))) => {
                    info!(?session, "voice session is ready");
                    if let Some(client) = client.as_ref() {
                        let sender = client.sender();
                        tokio::spawn(async move {
                            if let Err(error) = play_tone(sender).await {
                                warn!(?error, "could not play tone");
                            }
                        });
                        tokio::spawn(log_speakers(client.receiver()));
                    }
                }
                Some(Ok(VoiceEvent::Closed(frame))) => {
                    info!(?frame, "voice session closed");
                }
                Some(Ok(event)) => info!(?event, "voice event"),
                Some(Err(error)) => warn!(?error, "voice session error"),
                None => break,
            },
            event = shard.next_event(EventTypeFlags::all()) => {
                let event = match event {
                    Some(Ok(event)) => event,
                    Some(Err(error)) => {
                        warn!(?error, "shard error");
                        continue;
                    }
                    None => break,
                };

                if let Some(client) = client.as_mut() {
                    client.process(&event);
                    continue;
                }

                match event {
                    Event::Ready(ready) => {
                        info!("shard is ready, joining the voice channel");
                        user_id = Some(ready.user.id);
                        shard.command(&VoiceClient::join(guild_id, channel_id, true, false));
                    }
                    Event::VoiceStateUpdate(update) if Some(update.0.user_id) == user_id => {
                        state = Some(update.0);
                    }
                    Event::VoiceServerUpdate(update) if update.guild_id == guild_id => {
                        server = Some(update);
                    }
                    _ => {}
                }

                if let (Some(state), Some(server)) = (state.as_ref(), server.as_ref()) {
                    if let Some(params) = VoiceSessionParameters::from_events(state, server) {
                        info!(endpoint = %params.endpoint, "connecting to the voice server");
                        client = Some(VoiceClient::new(params, VoiceConfig::default()));
                    }
                }
            }
        }
    }

    shard.close(CloseFrame::NORMAL);
    _ = tokio::time::timeout(Duration::from_secs(3), shard.next()).await;

    Ok(())
}
