use crate::types::PresenceEvent;

/// Emit a presence event as a single JSON line to stdout.
pub fn report_event(event: &PresenceEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

/// Emit any serializable value as pretty-printed JSON to stdout.
pub fn report_pretty<T: serde::Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{json}");
    }
}
