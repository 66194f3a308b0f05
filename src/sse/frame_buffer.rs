/// Collects the chunks of an event stream and cuts them into complete events.
///
/// A chunk may end halfway through an event, or even halfway through a UTF-8 character.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// Appends `chunk` and returns all events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self.pending.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = self.pending.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&frame);
            let text = text.trim();
            if !text.is_empty() {
                frames.push(text.to_string());
            }
        }

        frames
    }
}
