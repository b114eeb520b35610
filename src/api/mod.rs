pub mod cancel;
pub mod client;
pub mod envelope;

pub use cancel::{AbortController, AbortSignal};
pub use client::ApiClient;
pub use envelope::{ListEnvelope, Page};
