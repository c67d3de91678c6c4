mod config;
mod info;

pub use self::config::VoiceConfig;
pub use self::info::*;

use self::info::normalize_endpoint;

use crate::audio::VoiceReceiver;
use crate::gateway::{
    GatewayState, GroupKeyHandler, HeartbeatInfo, Speakers, VoiceClientSender, VoiceEvent,
    VoiceGateway, VoiceGatewayError,
};

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;
use twilight_gateway::{CloseFrame, Event};
use twilight_model::gateway::payload::outgoing::UpdateVoiceState;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

/// Voice connection of one guild, driven by events of the main gateway.
///
/// The client owns a [`VoiceGateway`] and keeps its parameters in sync
/// with what the main gateway reports: forward every event a shard
/// yields to [`VoiceClient::process`] and poll the client as a
/// [`Stream`] to run the session.
///
/// ```no_run
/// # async fn run(state: twilight_model::voice::VoiceState, server: twilight_model::gateway::payload::incoming::VoiceServerUpdate) {
/// use futures::StreamExt;
/// use phonic::client::{VoiceClient, VoiceConfig, VoiceSessionParameters};
///
/// let params = VoiceSessionParameters::from_events(&state, &server).unwrap();
/// let mut client = VoiceClient::new(params, VoiceConfig::default());
///
/// while let Some(event) = client.next().await {
///     println!("{event:?}");
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct VoiceClient {
    gateway: VoiceGateway,
}

impl VoiceClient {
    #[must_use]
    pub fn new(params: VoiceSessionParameters, config: VoiceConfig) -> Self {
        Self {
            gateway: VoiceGateway::new(params, config),
        }
    }

    /// Creates a client whose group key transitions are handled by
    /// `handler`.
    #[must_use]
    pub fn with_group_key_handler(
        params: VoiceSessionParameters,
        config: VoiceConfig,
        handler: Box<dyn GroupKeyHandler>,
    ) -> Self {
        Self {
            gateway: VoiceGateway::with_group_key_handler(params, config, handler),
        }
    }

    /// Command for the main gateway to join a voice channel.
    #[must_use]
    pub fn join(
        guild_id: Id<GuildMarker>,
        channel_id: Id<ChannelMarker>,
        self_deaf: bool,
        self_mute: bool,
    ) -> UpdateVoiceState {
        UpdateVoiceState::new(guild_id, Some(channel_id), self_deaf, self_mute)
    }

    /// Command for the main gateway to leave the voice channel of a guild.
    #[must_use]
    pub fn leave(guild_id: Id<GuildMarker>) -> UpdateVoiceState {
        UpdateVoiceState::new(guild_id, None, false, false)
    }

    #[must_use]
    pub fn sender(&self) -> VoiceClientSender {
        self.gateway.sender()
    }

    #[must_use]
    pub fn speakers(&self) -> Speakers {
        self.gateway.speakers()
    }

    #[must_use]
    pub fn receiver(&self) -> VoiceReceiver {
        self.gateway.receiver()
    }

    #[must_use]
    pub fn heartbeat(&self) -> Option<HeartbeatInfo<'_>> {
        self.gateway.heartbeat()
    }

    #[must_use]
    pub const fn state(&self) -> GatewayState {
        self.gateway.state()
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.gateway.state().is_connected()
    }

    #[must_use]
    pub const fn parameters(&self) -> &VoiceSessionParameters {
        self.gateway.parameters()
    }

    /// Applies an event of the main gateway to this session.
    ///
    /// Returns `true` if the event concerned this session: a voice state
    /// update of the bot user in this guild, or a voice server update of
    /// this guild. Leaving the channel closes the session; a new endpoint
    /// or token moves it to the new voice server.
    pub fn process(&mut self, event: &Event) -> bool {
        let current = self.gateway.parameters();

        match event {
            Event::VoiceStateUpdate(update) => {
                let state = &update.0;
                if state.guild_id != Some(current.guild_id) || state.user_id != current.user_id {
                    return false;
                }

                let Some(channel_id) = state.channel_id else {
                    debug!(guild_id = %current.guild_id, "left the voice channel, closing session");
                    // A closed sender means the session already ended.
                    _ = self.gateway.sender().close(CloseFrame::NORMAL);
                    return true;
                };

                let mut params = current.clone();
                params.channel_id = channel_id;
                params.session_id.clone_from(&state.session_id);
                self.gateway.update_parameters(params);
                true
            }
            Event::VoiceServerUpdate(update) => {
                if update.guild_id != current.guild_id {
                    return false;
                }

                let Some(endpoint) = update.endpoint.as_deref() else {
                    // The old server went away; a new update with an
                    // endpoint follows.
                    debug!(guild_id = %current.guild_id, "voice server is being reallocated");
                    return true;
                };

                let mut params = current.clone();
                params.endpoint = normalize_endpoint(endpoint);
                params.token = Token::new(update.token.clone().into_boxed_str());
                self.gateway.update_parameters(params);
                true
            }
            _ => false,
        }
    }
}

impl Stream for VoiceClient {
    type Item = Result<VoiceEvent, VoiceGatewayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.gateway).poll_next(cx)
    }
}
