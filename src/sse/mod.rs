mod frame_buffer;
mod server_sent_event;

pub use frame_buffer::FrameBuffer;
pub use server_sent_event::ServerSentEvent;
