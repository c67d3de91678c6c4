#![forbid(unsafe_code)]
#![warn(
    clippy::pedantic,
    clippy::must_use_candidate,
    clippy::empty_enum,
    clippy::unwrap_used
)]
#![allow(
    clippy::new_without_default,
    clippy::empty_docs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod audio;
pub mod client;
pub mod crypto;

/// Control channel of a voice session.
///
/// Most users want [`client::VoiceClient`], which keeps the session in
/// sync with the main gateway. [`gateway::VoiceGateway`] is the session
/// itself for those who manage parameters on their own.
pub mod gateway;

/// RTP framing of voice packets and the sender's packet clock.
pub mod rtp;

/// UDP media transport and IP discovery.
pub mod udp;

mod util;

pub use phonic_types as types;
