//! Turns two consecutive [`LiveState`] snapshots into dashboard output.
//!
//! The live store coalesces bursts, so the renderer only ever sees the
//! latest state and prints what differs from the previous one.

use std::collections::HashSet;

use crate::state::LiveState;

use super::formatter::DashboardFormatter;

/// Output describing the change from `prev` to `next`; empty when nothing visible changed.
pub fn render_changes(prev: &LiveState, next: &LiveState) -> String {
    let mut output = String::new();

    if prev.phase != next.phase {
        output.push_str(&DashboardFormatter::format_phase(
            next.phase,
            next.reconnect_attempts,
        ));
    }

    for (device_id, record) in &next.device_status {
        if prev.device_status.get(device_id) != Some(record) {
            output.push_str(&DashboardFormatter::format_status(device_id, record));
        }
    }

    for (device_id, record) in &next.device_controls {
        let previous = prev.device_controls.get(device_id);
        for (control_id, control) in &record.controls {
            let before = previous.and_then(|p| p.controls.get(control_id));
            if before.map(|c| c.value) != Some(control.value) {
                output.push_str(&DashboardFormatter::format_control(
                    device_id,
                    control_id,
                    control.value,
                ));
            }
        }
    }

    let known: HashSet<&str> = prev.notifications.iter().map(|n| n.id.as_str()).collect();
    // oldest first so the newest ends up at the bottom of the terminal
    for notification in next.notifications.iter().rev() {
        if !known.contains(notification.id.as_str()) {
            output.push_str(&DashboardFormatter::format_notification(notification));
        }
    }

    if next.connection_problem && !prev.connection_problem {
        output.push_str(&DashboardFormatter::format_connection_problem(
            next.reconnect_attempts,
        ));
    }

    output
}

/// Full device overview for the `status` command
pub fn render_devices(state: &LiveState) -> String {
    if state.device_status.is_empty() && state.device_controls.is_empty() {
        return "(No device data yet)\n".to_string();
    }

    let mut output = String::new();
    for (device_id, record) in &state.device_status {
        output.push_str(&DashboardFormatter::format_status(device_id, record));
    }
    for (device_id, record) in &state.device_controls {
        for (control_id, control) in &record.controls {
            output.push_str(&DashboardFormatter::format_control(
                device_id,
                control_id,
                control.value,
            ));
        }
    }
    output
}
