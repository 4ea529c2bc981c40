use crate::messages::{AuditEvent, LogTag};

/// Selects the events carrying `tag`, preserving the order the audit log
/// returned them in.
pub fn filter_events(events: &[AuditEvent], tag: LogTag) -> Vec<&AuditEvent> {
    events.iter().filter(|e| e.tag == tag).collect()
}
