pub mod config;
pub mod error;

pub use config::MurmurConfig;
pub use error::{MurmurError, MurmurResult};

/// Longest message body, in characters, the protocol carries.
pub const MAX_MESSAGE_CHARS: usize = 128;
