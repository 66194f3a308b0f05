use chrono::Utc;
use std::fmt::Debug;

pub trait Clock: Debug + Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hands out the scripted instants in order and keeps repeating the last one.
#[cfg(test)]
#[derive(Debug)]
pub struct ScriptedClock {
    ticks: std::sync::Mutex<std::collections::VecDeque<i64>>,
    last: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl ScriptedClock {
    pub fn new(ticks: impl IntoIterator<Item = i64>) -> Self {
        ScriptedClock {
            ticks: std::sync::Mutex::new(ticks.into_iter().collect()),
            last: std::sync::atomic::AtomicI64::new(0),
        }
    }
}

#[cfg(test)]
impl Clock for ScriptedClock {
    fn now_millis(&self) -> i64 {
        use std::sync::atomic::Ordering;

        match self.ticks.lock().unwrap().pop_front() {
            Some(tick) => {
                self.last.store(tick, Ordering::SeqCst);
                tick
            }
            None => self.last.load(Ordering::SeqCst),
        }
    }
}
