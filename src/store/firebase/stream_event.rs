use crate::sse::ServerSentEvent;
use serde::Deserialize;
use serde_json::{Map, Value};

/// An event of the realtime database's streaming REST API.
#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    Put(PathChange),
    Patch(PathChange),
    KeepAlive,
    Cancel(Value),
    AuthRevoked,
    Unknown(String),
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct PathChange {
    pub path: String,
    pub data: Value,
}

impl TryFrom<ServerSentEvent<Value>> for StreamEvent {
    type Error = serde_json::Error;

    fn try_from(event: ServerSentEvent<Value>) -> Result<Self, Self::Error> {
        let data = event.data.unwrap_or(Value::Null);
        match event.event.as_deref() {
            Some("put") => Ok(StreamEvent::Put(serde_json::from_value(data)?)),
            Some("patch") => Ok(StreamEvent::Patch(serde_json::from_value(data)?)),
            Some("keep-alive") => Ok(StreamEvent::KeepAlive),
            Some("cancel") => Ok(StreamEvent::Cancel(data)),
            Some("auth_revoked") => Ok(StreamEvent::AuthRevoked),
            other => Ok(StreamEvent::Unknown(other.unwrap_or_default().to_string())),
        }
    }
}

impl PathChange {
    /// Replaces whatever lives at `path` in `mirror`. `null` removes it.
    pub fn apply_put(self, mirror: &mut Value) {
        set_at(mirror, &segments(&self.path), self.data);
    }

    /// Replaces every child of `path` that is named in the change, leaving the others alone.
    pub fn apply_patch(self, mirror: &mut Value) {
        let base = segments(&self.path);
        let Value::Object(children) = self.data else {
            set_at(mirror, &base, self.data);
            return;
        };

        for (key, value) in children {
            let mut path = base.clone();
            path.extend(segments(&key));
            set_at(mirror, &path, value);
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn set_at(node: &mut Value, path: &[&str], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = data;
        return;
    };

    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let emptied = match node {
        Value::Object(children) => {
            let child = children.entry(head.to_string()).or_insert(Value::Null);
            set_at(child, rest, data);
            if child.is_null() {
                children.remove(*head);
            }
            children.is_empty()
        }
        _ => false,
    };

    // Empty objects don't exist in the database
    if emptied {
        *node = Value::Null;
    }
}
