//! Interactive dashboard loop.

use std::sync::Arc;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    connection::ConnectionManager,
    domain::Identity,
    error::ClientError,
};

use super::{
    command::Command,
    formatter::DashboardFormatter,
    redisplay_prompt,
    render::{render_changes, render_devices},
};

/// Run the dashboard for `identity` until the user quits.
///
/// # Errors
///
/// Returns [`ClientError::ConnectionProblem`] when reconnection attempts are
/// exhausted; the caller is expected to exit so the dashboard can be restarted.
pub async fn run_dashboard(
    manager: Arc<ConnectionManager>,
    identity: Identity,
) -> Result<(), ClientError> {
    let user_id = identity.user_id().to_string();
    let mut state_rx = manager.store().subscribe();
    let mut shown = state_rx.borrow_and_update().clone();

    manager.connect(identity).await;
    println!(
        "\nLogged in as '{}'. Type 'help' for commands. Press Ctrl+D to exit.\n",
        user_id
    );

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", user_id);

    // rustyline blocks, so it gets its own thread
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let result = loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break Ok(()) };
                let command = match Command::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    break Ok(());
                }
                print!("{}", execute(&manager, command));
                redisplay_prompt(&user_id);
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let next = state_rx.borrow_and_update().clone();
                let output = render_changes(&shown, &next);
                if !output.is_empty() {
                    print!("\n{}", output);
                    redisplay_prompt(&user_id);
                }
                if next.connection_problem {
                    break Err(ClientError::ConnectionProblem(next.reconnect_attempts));
                }
                shown = next;
            }
        }
    };

    manager.close("logout").await;
    result
}

/// Run one command against the manager and return its output.
fn execute(manager: &ConnectionManager, command: Command) -> String {
    let store = manager.store();
    match command {
        Command::Set {
            device_id,
            control_id,
            value,
        } => DashboardFormatter::format_send_result(manager.send_command(
            &device_id,
            &control_id,
            "set_value",
            value,
        )),
        Command::Toggle {
            device_id,
            control_id,
        } => {
            let current = store.control_value(&device_id, &control_id).unwrap_or(0.0);
            let value = if current > 0.0 { 0.0 } else { 1.0 };
            DashboardFormatter::format_send_result(manager.send_command(
                &device_id,
                &control_id,
                "toggle",
                value,
            ))
        }
        Command::Echo(text) => DashboardFormatter::format_send_result(manager.send_echo(&text)),
        Command::List => DashboardFormatter::format_notification_list(
            &store.notifications(),
            store.unread_count(),
        ),
        Command::Read(id) => {
            if manager.mark_notification_read(&id) {
                format!("marked '{}' as read\n", id)
            } else {
                format!("no unread notification '{}'\n", id)
            }
        }
        Command::ReadAll => format!("marked {} notifications as read\n", manager.mark_all_read()),
        Command::Remove(id) => {
            if manager.remove_notification(&id) {
                format!("removed '{}'\n", id)
            } else {
                format!("no notification '{}'\n", id)
            }
        }
        Command::Clear => {
            manager.clear_notifications();
            "cleared all notifications\n".to_string()
        }
        Command::Status => {
            let state = store.snapshot();
            format!(
                "{}{}",
                DashboardFormatter::format_phase(state.phase, state.reconnect_attempts),
                render_devices(&state)
            )
        }
        Command::Help => DashboardFormatter::format_help(),
        Command::Quit => String::new(),
    }
}
