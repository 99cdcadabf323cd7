pub mod audio;
pub mod cli;
pub mod config;
pub mod crossfade;
pub mod error;
pub mod logging;
pub mod models;


pub use crossfade::PlaybackSession;
pub use error::*;
pub use models::*;
