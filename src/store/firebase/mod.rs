mod client;
mod listen;
mod stream_event;

pub use client::{FirebaseStore, new_client};
