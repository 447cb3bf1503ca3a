mod cancel;
mod start;

pub use cancel::cancel;
pub use start::start;
