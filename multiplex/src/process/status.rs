//! OS-level status queries that must not reap the child.

use std::io;

/// Whether the child `pid` is currently stopped by job control.
///
/// The query leaves the child waitable, so the owning child handle can still
/// collect its exit status later.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[allow(unsafe_code)]
pub(crate) fn is_stopped(pid: u32) -> io::Result<bool> {
    // SAFETY: siginfo_t is plain old data; all-zero is a valid value and lets
    // us detect "no state change" through a zero si_pid under WNOHANG.
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    // SAFETY: `info` is a valid, writable siginfo_t.
    let rc = unsafe {
        libc::waitid(
            libc::P_PID,
            libc::id_t::from(pid),
            &mut info,
            libc::WSTOPPED | libc::WNOHANG | libc::WNOWAIT,
        )
    };
    if rc == -1 {
        let err = io::Error::last_os_error();
        // Already reaped, nothing left to be stopped.
        if err.raw_os_error() == Some(libc::ECHILD) {
            return Ok(false);
        }
        return Err(err);
    }
    // SAFETY: waitid filled `info` (or left it zeroed under WNOHANG).
    Ok(unsafe { info.si_pid() } != 0)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) fn is_stopped(_pid: u32) -> io::Result<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_running_child_is_not_stopped() {
        let mut child = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        assert!(!is_stopped(child.id()).unwrap());

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stopped_child_is_reported_without_reaping() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("kill -STOP $$")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        let mut stopped = false;
        for _ in 0..100 {
            if is_stopped(child.id()).unwrap() {
                stopped = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(stopped);

        // Still waitable: the query must not have consumed the child.
        assert!(child.try_wait().unwrap().is_none());

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_reaped_child_is_not_stopped() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        assert!(!is_stopped(pid).unwrap());
    }
}
