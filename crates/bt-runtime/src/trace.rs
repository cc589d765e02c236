use std::borrow::Cow;

use bt_core::{BbKey, Blackboard};

/// A node lifecycle event.
///
/// Plain data so a run can be recorded and inspected afterwards. `subject` is the debug name
/// of the node the event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub subject: String,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>, subject: impl Into<String>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            subject: subject.into(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    /// Subjects of every event carrying `tag`, in order.
    pub fn subjects(&self, tag: &str) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.subject.as_str())
            .collect()
    }
}

/// Blackboard slot collecting events in memory. Nothing is recorded unless a log is installed.
pub const TRACE_LOG: BbKey<TraceLog> = BbKey::new(0xB7EE_7ACE_0000_0001);

pub fn install(blackboard: &mut Blackboard) {
    if !blackboard.contains_ext(TRACE_LOG) {
        blackboard.set_ext(TRACE_LOG, TraceLog::default());
    }
}

pub fn emit(blackboard: &mut Blackboard, event: TraceEvent) {
    if let Some(log) = blackboard.get_ext_mut(TRACE_LOG) {
        log.push(event);
    }
}

pub fn take(blackboard: &mut Blackboard) -> TraceLog {
    blackboard
        .get_ext_mut(TRACE_LOG)
        .map(std::mem::take)
        .unwrap_or_default()
}
