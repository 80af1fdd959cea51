use std::process::Command;

/// Fires a detached external command on a lifecycle event, if
/// `NOTIFY_HOOK_PATH` is configured: spawn a thread, log failures, never
/// propagate them.
///
/// The hook path is a config-time constant; failures are logged and ignored.
pub fn notify(hook_path: Option<&str>, event: &str, room_id: &str, detail: &str) {
    let Some(path) = hook_path else { return };
    let path = path.to_string();
    let arg = format!("[{event}] {room_id} {detail}");

    std::thread::spawn(move || match Command::new(&path).arg(&arg).spawn() {
        Ok(mut child) => {
            let _ = child.wait();
        }
        Err(e) => {
            log::warn!("notification hook {path} failed: {e}");
        }
    });
}
