//! Process lifecycle management for audit children
//!
//! Every Lighthouse run launches its own headless Chrome. If lhaudit is
//! interrupted mid-run, those browsers must not outlive it.
//!
//! # Solution
//! - Spawn each tool in its own process group (Chrome joins that group)
//! - Track all child PIDs in a global registry
//! - On SIGINT/SIGTERM/SIGHUP, send SIGTERM to every group, then SIGKILL
//!   whatever is left after the grace period

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking all spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// Set of child PIDs currently running
    pids: HashSet<u32>,
    /// Whether cleanup has already been initiated
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!(pid, "registered child process");
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!(pid, "unregistered child process");
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked child process groups.
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            tracing::debug!("no child processes to terminate");
            return;
        }

        tracing::info!("terminating {} audit process(es)", self.pids.len());

        let pids_to_kill: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids_to_kill {
            // Group signal reaches Chrome as well as the Lighthouse node process
            if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
                tracing::warn!("failed to send SIGTERM to process group {}: {}", pid, e);
                if let Err(e2) = send_signal(pid, Signal::SIGTERM) {
                    tracing::warn!("failed to send SIGTERM to PID {}: {}", pid, e2);
                }
            }
        }

        // The leader exiting says nothing about Chrome, so wait on whole groups
        let start = Instant::now();
        while start.elapsed() < grace_period {
            if !pids_to_kill.iter().any(|&pgid| is_group_alive(pgid)) {
                tracing::info!("all audit processes terminated gracefully");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids_to_kill {
            if is_group_alive(pid) {
                tracing::warn!("process group {} did not terminate, sending SIGKILL", pid);
                if let Err(e) = send_signal_to_group(pid, Signal::SIGKILL) {
                    tracing::error!("failed to send SIGKILL to process group {}: {}", pid, e);
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }

        self.pids.clear();
        tracing::info!("child process cleanup complete");
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID addresses the whole process group
fn send_signal_to_group(pgid: u32, signal: impl Into<Option<Signal>>) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Whether any member of process group `pgid` is still running.
///
/// Zombies do not count: a leader that exited but was not reaped yet keeps
/// the group id reachable without anything left to stop.
fn is_group_alive(pgid: u32) -> bool {
    if send_signal_to_group(pgid, None).is_err() {
        return false;
    }

    let Ok(entries) = std::fs::read_dir("/proc") else {
        // Signal 0 succeeded and there is no way to look closer
        return true;
    };

    entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter_map(|pid| std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok())
        .filter_map(|stat| parse_stat_state_and_pgrp(&stat))
        .any(|(state, pgrp)| pgrp == pgid && !matches!(state, 'Z' | 'X'))
}

/// State and process group id from the text of `/proc/<pid>/stat`.
///
/// The command name in field 2 may contain spaces and parentheses, so
/// fields are counted from the last `)`.
fn parse_stat_state_and_pgrp(stat: &str) -> Option<(char, u32)> {
    let (_, rest) = stat.rsplit_once(')')?;
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    let _ppid = fields.next()?;
    let pgrp = fields.next()?.parse().ok()?;
    Some((state, pgrp))
}

/// Install handlers for SIGINT (Ctrl+C), SIGTERM and SIGHUP.
///
/// On any of them, every registered audit process group is terminated and
/// the process exits with `128 + signal`. Call once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            tracing::info!("received {}, stopping audits", signal_name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group that dies with us
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe setpgid/prctl
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                // Child gets SIGTERM if lhaudit dies without running cleanup
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::process::{Command, Stdio};

    /// Check if a single process is still alive (not dead or zombie)
    fn is_process_alive(pid: u32) -> bool {
        if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
            return false;
        }

        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => parse_stat_state_and_pgrp(&stat)
                .is_some_and(|(state, _)| !matches!(state, 'Z' | 'X')),
            Err(_) => false,
        }
    }

    fn wait_for_process_death(pid: u32, timeout: Duration) -> bool {
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

        let start = Instant::now();
        let nix_pid = Pid::from_raw(pid as i32);

        while start.elapsed() < timeout {
            match waitpid(nix_pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(_, _)) | Ok(WaitStatus::Signaled(_, _, _)) => return true,
                Err(nix::errno::Errno::ECHILD) => {
                    if !is_process_alive(pid) {
                        return true;
                    }
                }
                _ => {}
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_registry_register_unregister() {
        let mut registry = ChildRegistry::default();

        registry.register(1234);
        registry.register(5678);
        assert_eq!(registry.count(), 2);

        registry.unregister(1234);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_terminate_all_kills_process_group() {
        let child = Command::new("bash")
            .args(["-c", "sleep 60"])
            .in_new_process_group()
            .spawn()
            .expect("Failed to spawn bash sleep process");
        let pid = child.id();

        let mut registry = ChildRegistry::default();
        registry.register(pid);
        assert!(is_process_alive(pid));

        registry.terminate_all(Duration::from_millis(500));

        assert!(wait_for_process_death(pid, Duration::from_secs(2)));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_terminate_all_handles_already_dead_process() {
        let mut child = Command::new("bash")
            .args(["-c", "exit 0"])
            .spawn()
            .expect("Failed to spawn bash");
        let pid = child.id();
        let _ = child.wait();

        let mut registry = ChildRegistry::default();
        registry.register(pid);
        registry.terminate_all(Duration::from_millis(100));
    }

    #[test]
    fn test_cleanup_initiated_flag_prevents_double_cleanup() {
        let mut registry = ChildRegistry::default();
        registry.register(999_999);

        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.cleanup_initiated);

        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.cleanup_initiated);
    }

    #[test]
    fn test_is_process_alive_nonexistent() {
        assert!(!is_process_alive(999_999));
        assert!(!is_group_alive(999_999));
    }

    #[test]
    fn test_parse_stat_state_and_pgrp() {
        let stat = "4242 (chrome (renderer) x) S 4200 4100 4100 0 -1 4194560";
        assert_eq!(parse_stat_state_and_pgrp(stat), Some(('S', 4100)));
        assert_eq!(parse_stat_state_and_pgrp("4242 (bash) Z 1 7"), Some(('Z', 7)));
        assert_eq!(parse_stat_state_and_pgrp("garbage"), None);
    }

    #[test]
    fn test_terminate_all_kills_group_after_leader_exits() {
        // The leader dies on SIGTERM; the member it started ignores SIGTERM,
        // like a browser that outlives the node process that launched it.
        let mut leader = Command::new("bash")
            .args(["-c", r#"bash -c 'trap "" TERM; sleep 30' & echo $!; wait"#])
            .stdout(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .expect("Failed to spawn bash process group");
        let leader_pid = leader.id();

        let mut line = String::new();
        BufReader::new(leader.stdout.take().expect("stdout is piped"))
            .read_line(&mut line)
            .expect("Failed to read member PID");
        let member_pid: u32 = line.trim().parse().expect("member PID");

        // Give the member time to install its trap
        std::thread::sleep(Duration::from_millis(200));
        assert!(is_process_alive(member_pid));

        let mut registry = ChildRegistry::default();
        registry.register(leader_pid);
        registry.terminate_all(Duration::from_millis(300));

        assert!(wait_for_process_death(leader_pid, Duration::from_secs(2)));
        assert!(
            wait_for_process_death(member_pid, Duration::from_secs(2)),
            "SIGTERM-ignoring group member {} survived cleanup",
            member_pid
        );
        assert!(!is_group_alive(leader_pid));
    }
}
