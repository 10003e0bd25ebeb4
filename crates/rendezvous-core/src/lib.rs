//! # rendezvous-core
//!
//! Shared vocabulary of the rendezvous relay:
//!
//! - **Ids**: [`PeerId`] and [`OriginKey`] newtypes, origin normalization
//! - **Devices**: [`DeviceClassification`] and the public [`DeviceName`]
//! - **Naming**: the stable string hash and [`NameGenerator`] implementations
//! - **Protocol**: [`ServerMessage`], [`PeerInfo`] and inbound [`InboundFrame`]s
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod device;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod naming;
pub mod protocol;

pub use device::{DeviceClassification, DeviceName};
pub use errors::FrameError;
pub use ids::{OriginKey, PeerId};
pub use naming::{NameGenerator, WordListNames};
pub use protocol::{Control, DisplayNameInfo, InboundFrame, PeerInfo, ServerMessage};
