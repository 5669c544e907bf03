//! Messaging gateway access.
//!
//! The auto-reply loop only sees the [`MessagingGateway`] trait. Concrete
//! gateways live alongside it: an HTTP bridge to the platform session service
//! and a pacing decorator that spaces out replies per account.

pub mod bridge;
pub mod gateway;
pub mod paced;

pub use bridge::BridgeGateway;
pub use gateway::{
    ChannelError, ChannelResult, DeliveryResult, DynGateway, InboundMessage, MessagingGateway,
};
pub use paced::{PacedGateway, DEFAULT_SEND_DELAY};
