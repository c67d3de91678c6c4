use std::marker::PhantomData;

use twilight_model::gateway::payload::incoming::VoiceServerUpdate;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::voice::VoiceState;

/// Everything needed to open a voice session in a guild.
///
/// The values come from the main gateway: [`Voice State Update`] carries
/// the session ID and channel, [`Voice Server Update`] carries the
/// endpoint and token. Both arrive after a shard sent
/// [`Update Voice State`], see [`VoiceSessionParameters::from_events`].
///
/// [`Voice State Update`]: https://discord.com/developers/docs/events/gateway-events#voice-state-update
/// [`Voice Server Update`]: https://discord.com/developers/docs/events/gateway-events#voice-server-update
/// [`Update Voice State`]: https://discord.com/developers/docs/events/gateway-events#update-voice-state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSessionParameters {
    /// Host (and port) of the voice server, without a scheme.
    pub endpoint: String,
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub session_id: String,
    pub token: Token,
    pub user_id: Id<UserMarker>,
}

impl VoiceSessionParameters {
    #[must_use]
    pub const fn builder() -> VoiceSessionParametersBuilder {
        VoiceSessionParametersBuilder::new()
    }

    /// Combines the two main gateway events announcing a voice session.
    ///
    /// Returns `None` if the events belong to different guilds, the state
    /// has no channel (the user left) or the server has no endpoint yet.
    #[must_use]
    pub fn from_events(state: &VoiceState, server: &VoiceServerUpdate) -> Option<Self> {
        if state.guild_id? != server.guild_id {
            return None;
        }

        Some(Self {
            endpoint: normalize_endpoint(server.endpoint.as_deref()?),
            guild_id: server.guild_id,
            channel_id: state.channel_id?,
            session_id: state.session_id.clone(),
            token: Token::new(server.token.clone().into_boxed_str()),
            user_id: state.user_id,
        })
    }

    /// WebSocket URL of the voice gateway.
    #[must_use]
    pub fn url(&self, tls: bool) -> String {
        let scheme = if tls { "wss" } else { "ws" };
        format!(
            "{scheme}://{}/?v={}",
            self.endpoint,
            phonic_types::API_VERSION
        )
    }
}

/// Strips what some endpoints carry but the URL builder adds itself.
pub(crate) fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint
        .strip_prefix("wss://")
        .or_else(|| endpoint.strip_prefix("ws://"))
        .unwrap_or(endpoint);

    endpoint.trim_end_matches('/').to_owned()
}

/// Wrapper for an authorization token with a debug implementation
/// that redacts the string.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Token {
    /// Authorization token that is redacted in the Debug implementation.
    inner: Box<str>,
}

impl Token {
    /// Create a new authorization wrapper.
    #[must_use]
    pub const fn new(token: Box<str>) -> Self {
        Self { inner: token }
    }

    /// Exposes the authorization token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Builder of [`VoiceSessionParameters`]. `build` is only available once
/// every field was set.
pub struct VoiceSessionParametersBuilder<E = (), G = (), C = (), S = (), T = (), U = ()> {
    endpoint: Option<String>,
    guild_id: Option<Id<GuildMarker>>,
    channel_id: Option<Id<ChannelMarker>>,
    session_id: Option<String>,
    token: Option<String>,
    user_id: Option<Id<UserMarker>>,
    phantom: PhantomData<(E, G, C, S, T, U)>,
}

impl VoiceSessionParametersBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            endpoint: None,
            guild_id: None,
            channel_id: None,
            session_id: None,
            token: None,
            user_id: None,
            phantom: PhantomData,
        }
    }
}

impl<E, G, C, S, T, U> VoiceSessionParametersBuilder<E, G, C, S, T, U> {
    fn retype<E2, G2, C2, S2, T2, U2>(self) -> VoiceSessionParametersBuilder<E2, G2, C2, S2, T2, U2> {
        VoiceSessionParametersBuilder {
            endpoint: self.endpoint,
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            session_id: self.session_id,
            token: self.token,
            user_id: self.user_id,
            phantom: PhantomData,
        }
    }
}

mod builder_state {
    use super::{Token, VoiceSessionParameters, VoiceSessionParametersBuilder, normalize_endpoint};

    use twilight_model::id::Id;
    use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

    pub struct WithEndpoint;
    pub struct WithGuildId;
    pub struct WithChannelId;
    pub struct WithSessionId;
    pub struct WithToken;
    pub struct WithUserId;

    impl
        VoiceSessionParametersBuilder<
            WithEndpoint,
            WithGuildId,
            WithChannelId,
            WithSessionId,
            WithToken,
            WithUserId,
        >
    {
        #[allow(clippy::unwrap_used)]
        #[must_use]
        pub fn build(self) -> VoiceSessionParameters {
            // The type parameters guarantee that every field is set.
            VoiceSessionParameters {
                endpoint: self.endpoint.unwrap(),
                guild_id: self.guild_id.unwrap(),
                channel_id: self.channel_id.unwrap(),
                session_id: self.session_id.unwrap(),
                token: Token::new(self.token.unwrap().into_boxed_str()),
                user_id: self.user_id.unwrap(),
            }
        }
    }

    impl<G, C, S, T, U> VoiceSessionParametersBuilder<(), G, C, S, T, U> {
        /// Sets the endpoint; a `wss://` prefix or trailing slash is
        /// dropped.
        #[must_use]
        pub fn endpoint(
            mut self,
            endpoint: impl AsRef<str>,
        ) -> VoiceSessionParametersBuilder<WithEndpoint, G, C, S, T, U> {
            self.endpoint = Some(normalize_endpoint(endpoint.as_ref()));
            self.retype()
        }
    }

    impl<E, C, S, T, U> VoiceSessionParametersBuilder<E, (), C, S, T, U> {
        #[must_use]
        pub fn guild_id(
            mut self,
            guild_id: Id<GuildMarker>,
        ) -> VoiceSessionParametersBuilder<E, WithGuildId, C, S, T, U> {
            self.guild_id = Some(guild_id);
            self.retype()
        }
    }

    impl<E, G, S, T, U> VoiceSessionParametersBuilder<E, G, (), S, T, U> {
        #[must_use]
        pub fn channel_id(
            mut self,
            channel_id: Id<ChannelMarker>,
        ) -> VoiceSessionParametersBuilder<E, G, WithChannelId, S, T, U> {
            self.channel_id = Some(channel_id);
            self.retype()
        }
    }

    impl<E, G, C, T, U> VoiceSessionParametersBuilder<E, G, C, (), T, U> {
        #[must_use]
        pub fn session_id(
            mut self,
            session_id: impl Into<String>,
        ) -> VoiceSessionParametersBuilder<E, G, C, WithSessionId, T, U> {
            self.session_id = Some(session_id.into());
            self.retype()
        }
    }

    impl<E, G, C, S, U> VoiceSessionParametersBuilder<E, G, C, S, (), U> {
        #[must_use]
        pub fn token(
            mut self,
            token: impl Into<String>,
        ) -> VoiceSessionParametersBuilder<E, G, C, S, WithToken, U> {
            self.token = Some(token.into());
            self.retype()
        }
    }

    impl<E, G, C, S, T> VoiceSessionParametersBuilder<E, G, C, S, T, ()> {
        #[must_use]
        pub fn user_id(
            mut self,
            user_id: Id<UserMarker>,
        ) -> VoiceSessionParametersBuilder<E, G, C, S, T, WithUserId> {
            self.user_id = Some(user_id);
            self.retype()
        }
    }
}
