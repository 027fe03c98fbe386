pub mod cert;
pub mod config;
pub mod server;
pub mod signaling;

pub use config::{get_config_path, Config};
pub use server::{AppState, LancastServer};
pub use signaling::{Envelope, PeerId, SignalingHub};
