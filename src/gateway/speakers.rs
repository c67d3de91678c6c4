use dashmap::DashMap;
use std::sync::Arc;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

use phonic_types::payload::Speaking;
use phonic_types::payload::speaking::SpeakingFlags;

/// What is known about a remote audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSpeaker {
    pub user_id: Option<Id<UserMarker>>,
    pub flags: SpeakingFlags,
    pub delay: Option<u32>,
}

impl RemoteSpeaker {
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// SSRC to speaker table of a voice session.
///
/// Cloning yields another handle to the same table, so other tasks can
/// resolve users while the session updates it. The session clears it on
/// every reconnect and rebuilds it from fresh notifications.
#[derive(Debug, Clone, Default)]
pub struct Speakers {
    inner: Arc<DashMap<u32, RemoteSpeaker>>,
}

impl Speakers {
    #[must_use]
    pub fn get(&self, ssrc: u32) -> Option<RemoteSpeaker> {
        self.inner.get(&ssrc).map(|entry| *entry)
    }

    #[must_use]
    pub fn user_id(&self, ssrc: u32) -> Option<Id<UserMarker>> {
        self.get(ssrc).and_then(|speaker| speaker.user_id)
    }

    /// Finds the stream a user is sending on.
    #[must_use]
    pub fn ssrc_of(&self, user_id: Id<UserMarker>) -> Option<u32> {
        self.inner
            .iter()
            .find(|entry| entry.user_id == Some(user_id))
            .map(|entry| *entry.key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Creates or refreshes the entry for the SSRC of a notification.
    ///
    /// A notification without a user id keeps the one already known.
    pub(crate) fn update(&self, speaking: &Speaking) {
        let mut entry = self.inner.entry(speaking.ssrc).or_insert(RemoteSpeaker {
            user_id: None,
            flags: SpeakingFlags::empty(),
            delay: None,
        });

        if speaking.user_id.is_some() {
            entry.user_id = speaking.user_id;
        }
        entry.flags = speaking.speaking;
        entry.delay = speaking.delay;
    }

    /// Drops every stream of a user, returning the SSRC it used.
    pub(crate) fn remove_user(&self, user_id: Id<UserMarker>) -> Option<u32> {
        let ssrc = self.ssrc_of(user_id)?;
        self.inner.remove(&ssrc);
        self.inner.retain(|_, speaker| speaker.user_id != Some(user_id));
        Some(ssrc)
    }

    pub(crate) fn clear(&self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{RemoteSpeaker, Speakers};
    use phonic_types::payload::Speaking;
    use phonic_types::payload::speaking::SpeakingFlags;
    use static_assertions::assert_impl_all;
    use twilight_model::id::Id;

    assert_impl_all!(Speakers: Clone, Send, Sync);

    fn speaking(ssrc: u32, user: Option<u64>, flags: SpeakingFlags) -> Speaking {
        Speaking {
            speaking: flags,
            ssrc,
            user_id: user.map(Id::new),
            delay: Some(0),
        }
    }

    #[test]
    fn tracks_speaking_updates() {
        let speakers = Speakers::default();
        speakers.update(&speaking(10, Some(1), SpeakingFlags::MICROPHONE));
        assert_eq!(
            speakers.get(10),
            Some(RemoteSpeaker {
                user_id: Some(Id::new(1)),
                flags: SpeakingFlags::MICROPHONE,
                delay: Some(0),
            })
        );

        speakers.update(&speaking(10, None, SpeakingFlags::empty()));
        let speaker = speakers.get(10).unwrap_or_else(|| unreachable!());
        assert_eq!(speaker.user_id, Some(Id::new(1)));
        assert!(!speaker.is_speaking());
    }

    #[test]
    fn disconnect_removes_user() {
        let speakers = Speakers::default();
        let handle = speakers.clone();
        speakers.update(&speaking(10, Some(1), SpeakingFlags::MICROPHONE));
        speakers.update(&speaking(20, Some(2), SpeakingFlags::PRIORITY));

        assert_eq!(speakers.remove_user(Id::new(1)), Some(10));
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.user_id(20), Some(Id::new(2)));
        assert_eq!(speakers.remove_user(Id::new(1)), None);

        speakers.clear();
        assert!(handle.is_empty());
    }
}
