//! Text formatting for the terminal dashboard.

use crate::domain::{ConnectionPhase, DeviceStatusRecord, Notification};

const RULE: &str = "============================================================";

/// Formatter of dashboard output
pub struct DashboardFormatter;

impl DashboardFormatter {
    /// Format a connection phase change
    ///
    /// # Arguments
    ///
    /// * `phase` - The new phase
    /// * `reconnect_attempts` - Reconnects since the last successful open
    pub fn format_phase(phase: ConnectionPhase, reconnect_attempts: u32) -> String {
        match phase {
            ConnectionPhase::Idle => "* idle\n".to_string(),
            ConnectionPhase::Connecting if reconnect_attempts > 0 => {
                format!("* reconnecting (attempt {})\n", reconnect_attempts)
            }
            ConnectionPhase::Connecting => "* connecting\n".to_string(),
            ConnectionPhase::Open => "* connected\n".to_string(),
            ConnectionPhase::Closing => "* closing\n".to_string(),
            ConnectionPhase::Closed => "* disconnected\n".to_string(),
        }
    }

    /// Format a device status change
    pub fn format_status(device_id: &str, record: &DeviceStatusRecord) -> String {
        format!(
            "[device {}] {} at {}\n",
            device_id,
            record.status,
            display_timestamp(&record.timestamp)
        )
    }

    /// Format a control value change
    pub fn format_control(device_id: &str, control_id: &str, value: f64) -> String {
        format!("[device {}] {} = {}\n", device_id, control_id, value)
    }

    /// Format a newly arrived notification
    pub fn format_notification(notification: &Notification) -> String {
        let severity = notification
            .severity
            .as_deref()
            .map(|severity| format!(" ({})", severity))
            .unwrap_or_default();
        format!(
            "\n\n------------------------------------------------------------\n\
             ! {}{}: {}\n\
             {}\n\
             ------------------------------------------------------------\n",
            notification.title,
            severity,
            notification.message,
            Self::notification_origin(notification),
        )
    }

    /// Format the notification list with an unread counter
    pub fn format_notification_list(notifications: &[Notification], unread: usize) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!(
            "Notifications ({} unread / {} total):\n",
            unread,
            notifications.len()
        ));

        if notifications.is_empty() {
            output.push_str("(No notifications)\n");
        } else {
            for notification in notifications {
                let marker = if notification.is_read { ' ' } else { '*' };
                output.push_str(&format!(
                    "{} [{}] {}: {} - {}\n",
                    marker,
                    notification.id,
                    notification.title,
                    notification.message,
                    Self::notification_origin(notification),
                ));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format the blocking notice shown when reconnection gave up
    pub fn format_connection_problem(attempts: u32) -> String {
        format!(
            "\n{}\n\
             Connection problem: the server could not be reached after {} attempts.\n\
             Restart the dashboard to try again.\n\
             {}\n",
            RULE, attempts, RULE
        )
    }

    /// Format the result of an outbound command
    pub fn format_send_result(sent: bool) -> String {
        if sent {
            "sent\n".to_string()
        } else {
            "not sent: socket is not open\n".to_string()
        }
    }

    pub fn format_help() -> String {
        [
            "Commands:",
            "  set <device> <control> <value>   change a control value",
            "  toggle <device> <control>        flip a switch between 0 and 1",
            "  echo <text>                      diagnostic round trip",
            "  list                             show notifications",
            "  read <id> | read-all             mark notifications read",
            "  remove <id> | clear              delete notifications",
            "  status                           show device state",
            "  quit                             log out and exit",
            "",
        ]
        .join("\n")
    }

    fn notification_origin(notification: &Notification) -> String {
        let device = notification
            .device_name
            .as_deref()
            .or(notification.device_id.as_deref())
            .unwrap_or("-");
        let at = notification
            .timestamp()
            .map(display_timestamp)
            .unwrap_or_else(|| "-".to_string());
        format!("device {} at {}", device, at)
    }
}

/// Render RFC 3339 timestamps in local time; other strings pass through.
fn display_timestamp(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|at| {
            at.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceStatus;

    fn alarm(id: &str, is_read: bool) -> Notification {
        Notification {
            device_name: Some("Boiler".to_string()),
            severity: Some("critical".to_string()),
            is_read,
            ..Notification::new(id, "Pressure", "above limit")
        }
    }

    #[test]
    fn test_format_phase_shows_reconnect_attempt() {
        // テスト項目: 再接続中は試行回数が表示される
        // when (操作):
        let first = DashboardFormatter::format_phase(ConnectionPhase::Connecting, 0);
        let retry = DashboardFormatter::format_phase(ConnectionPhase::Connecting, 3);

        // then (期待する結果):
        assert_eq!(first, "* connecting\n");
        assert_eq!(retry, "* reconnecting (attempt 3)\n");
    }

    #[test]
    fn test_format_status_passes_through_unparseable_timestamp() {
        // given (前提条件):
        let record = DeviceStatusRecord {
            status: DeviceStatus::Offline,
            timestamp: "T1".to_string(),
        };

        // when (操作):
        let result = DashboardFormatter::format_status("7", &record);

        // then (期待する結果):
        assert_eq!(result, "[device 7] offline at T1\n");
    }

    #[test]
    fn test_format_notification_list_marks_unread() {
        // テスト項目: 未読の通知には印が付き、件数が表示される
        // given (前提条件):
        let notifications = vec![alarm("n2", false), alarm("n1", true)];

        // when (操作):
        let result = DashboardFormatter::format_notification_list(&notifications, 1);

        // then (期待する結果):
        assert!(result.contains("Notifications (1 unread / 2 total):"));
        assert!(result.contains("* [n2] Pressure: above limit - device Boiler at -"));
        assert!(result.contains("  [n1] Pressure"));
    }

    #[test]
    fn test_format_empty_notification_list() {
        // when (操作):
        let result = DashboardFormatter::format_notification_list(&[], 0);

        // then (期待する結果):
        assert!(result.contains("(No notifications)"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_notification_includes_severity() {
        // when (操作):
        let result = DashboardFormatter::format_notification(&alarm("n1", false));

        // then (期待する結果):
        assert!(result.contains("! Pressure (critical): above limit"));
        assert!(result.contains("device Boiler"));
    }

    #[test]
    fn test_format_connection_problem() {
        // when (操作):
        let result = DashboardFormatter::format_connection_problem(10);

        // then (期待する結果):
        assert!(result.contains("after 10 attempts"));
        assert!(result.contains("Restart the dashboard"));
    }
}
