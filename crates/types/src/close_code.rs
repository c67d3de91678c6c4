use serde_repr::{Deserialize_repr, Serialize_repr};
use std::{error::Error, fmt::Display};

/// Voice gateway close event codes.
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[non_exhaustive]
#[repr(u16)]
pub enum CloseCode {
    /// An invalid opcode was sent.
    UnknownOpcode = 4001,
    /// An invalid payload was sent.
    DecodeError = 4002,
    /// A payload was sent prior to identifying.
    NotAuthenticated = 4003,
    /// An invalid token was sent when identifying.
    AuthenticationFailed = 4004,
    /// Multiple identify payloads were sent.
    AlreadyAuthenticated = 4005,
    /// The session was invalidated.
    SessionNoLongerValid = 4006,
    /// The session timed out.
    SessionTimedOut = 4009,
    /// The specified voice server was not found.
    ServerNotFound = 4011,
    /// An unknown protocol was sent.
    UnknownProtocol = 4012,
    /// Disconnected from the voice channel.
    Disconnected = 4014,
    /// The voice server crashed.
    VoiceServerCrashed = 4015,
    /// The encryption could not be recognized.
    UnknownEncryptionMode = 4016,
    /// The channel requires end-to-end group encryption.
    E2eeRequired = 4017,
    /// A malformed request was sent.
    BadRequest = 4020,
    /// Disconnected because of rate limiting.
    RateLimited = 4021,
    /// The call was terminated.
    CallTerminated = 4022,
}

impl CloseCode {
    /// Whether the session must not be retried after receiving this code.
    ///
    /// Critical codes either mean the credentials are no longer usable or
    /// that the client was removed from the channel on purpose.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::SessionNoLongerValid
                | Self::ServerNotFound
                | Self::UnknownProtocol
                | Self::Disconnected
                | Self::UnknownEncryptionMode
                | Self::E2eeRequired
                | Self::CallTerminated
        )
    }
}

impl From<CloseCode> for u16 {
    fn from(val: CloseCode) -> Self {
        val as u16
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CloseCodeConversionError {
    code: u16,
}

impl CloseCodeConversionError {
    #[must_use]
    const fn new(code: u16) -> Self {
        Self { code }
    }

    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }
}

impl Display for CloseCodeConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.code, f)?;
        f.write_str(" is not a valid close code")
    }
}

impl Error for CloseCodeConversionError {}

impl TryFrom<u16> for CloseCode {
    type Error = CloseCodeConversionError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let close_code = match value {
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4006 => Self::SessionNoLongerValid,
            4009 => Self::SessionTimedOut,
            4011 => Self::ServerNotFound,
            4012 => Self::UnknownProtocol,
            4014 => Self::Disconnected,
            4015 => Self::VoiceServerCrashed,
            4016 => Self::UnknownEncryptionMode,
            4017 => Self::E2eeRequired,
            4020 => Self::BadRequest,
            4021 => Self::RateLimited,
            4022 => Self::CallTerminated,
            _ => return Err(CloseCodeConversionError::new(value)),
        };

        Ok(close_code)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use static_assertions::assert_impl_all;
    use std::fmt::Debug;

    assert_impl_all!(
        CloseCode: Clone,
        Copy,
        Debug,
        Deserialize<'static>,
        Eq,
        PartialEq,
        Send,
        Serialize,
        Sync,
    );
    assert_impl_all!(CloseCodeConversionError: Debug, PartialEq, Eq, Send, Sync, Error);

    #[test]
    fn critical_codes() {
        let critical = [4004, 4006, 4011, 4012, 4014, 4016, 4017, 4022];
        for code in critical {
            assert!(CloseCode::try_from(code).unwrap().is_critical(), "{code}");
        }

        let recoverable = [4001, 4002, 4003, 4005, 4009, 4015, 4020, 4021];
        for code in recoverable {
            assert!(!CloseCode::try_from(code).unwrap().is_critical(), "{code}");
        }
    }

    #[test]
    fn unknown_code() {
        let error = CloseCode::try_from(1006).unwrap_err();
        assert_eq!(error.code(), 1006);
        assert_eq!(error.to_string(), "1006 is not a valid close code");
    }
}
