use serde::de::DeserializeOwned;

/// A single event of a `text/event-stream` response.
#[derive(Debug, PartialEq)]
pub struct ServerSentEvent<T> {
    pub id: Option<String>,
    pub event: Option<String>,
    pub retry: Option<usize>,
    pub comment: Option<String>,
    pub data: Option<T>,
}

impl<T> ServerSentEvent<T>
where
    T: DeserializeOwned,
{
    /// Parses one event, consecutive `data` lines are joined with a newline before being deserialized.
    pub fn from_str(s: &str) -> Result<ServerSentEvent<T>, serde_json::Error> {
        let mut id = None;
        let mut event = None;
        let mut retry = None;
        let mut comment = None;
        let mut data_lines: Vec<&str> = Vec::new();

        for line in s.lines() {
            if let Some(text) = line.strip_prefix(':') {
                comment = Some(text.trim().to_string());
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "id" => id = Some(value.trim().to_string()),
                "event" => event = Some(value.trim().to_string()),
                "retry" => retry = value.trim().parse::<usize>().ok(),
                "data" => data_lines.push(value),
                _ => {}
            }
        }

        let data = if data_lines.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&data_lines.join("\n"))?)
        };

        Ok(ServerSentEvent {
            id,
            event,
            retry,
            comment,
            data,
        })
    }
}
