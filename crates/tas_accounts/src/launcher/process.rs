use std::{
    path::Path,
    process::{Command, Stdio},
};

use crate::ProcessControl;

/// The launcher's process image name.
pub const LAUNCHER_PROCESS: &str = "BsgLauncher.exe";

/// [`ProcessControl`] backed by the OS.
pub struct SystemProcess;

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        fn kill_command(process_name: &str) -> Command {
            let mut cmd = Command::new("taskkill");
            cmd.args(["/F", "/IM", process_name, "/T"]);
            cmd
        }

        fn detach(cmd: &mut Command) {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            cmd.creation_flags(DETACHED_PROCESS);
        }
    } else {
        fn kill_command(process_name: &str) -> Command {
            let mut cmd = Command::new("pkill");
            cmd.args(["-f", process_name.trim_end_matches(".exe")]);
            cmd
        }

        fn detach(_cmd: &mut Command) {}
    }
}

impl ProcessControl for SystemProcess {
    fn kill_by_name(&self, process_name: &str) -> std::io::Result<()> {
        // A non-zero exit code just means nothing was running
        kill_command(process_name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
    }

    fn spawn_detached(&self, exe: &Path) -> std::io::Result<()> {
        let mut cmd = Command::new(exe);
        if let Some(dir) = exe.parent() {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        // Not waited on: the launcher outlives us
        cmd.spawn().map(drop)
    }
}
