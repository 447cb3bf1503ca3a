mod access_denied;
mod choice_received;
mod text_received;

pub use access_denied::access_denied;
pub use choice_received::choice_received;
pub use text_received::text_received;
