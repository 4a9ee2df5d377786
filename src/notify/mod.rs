pub mod discord;
pub mod live_update;
pub mod render;

pub use discord::{DiscordSink, MessageHandle, MessageSink};
pub use render::{Message, Renderer};
