//! Real-time setup for the sampling thread (Linux SCHED_FIFO / affinity / mlockall; macOS mlockall).
//!
//! Every step is best effort: a failure is logged and sampling continues
//! without it. `sched_setscheduler(0, ..)` and `sched_setaffinity(0, ..)`
//! act on the calling thread, so call this from the thread that runs the
//! scheduler.

use crate::cli::{RtArgs, RtLock};
use std::sync::OnceLock;

static RT_ONCE: OnceLock<()> = OnceLock::new();

pub fn setup_rt_once(args: &RtArgs) {
    if !args.rt {
        return;
    }
    let lock = args.rt_lock.unwrap_or_else(RtLock::os_default);
    RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(()) => tracing::info!(?lock, "RT: memory lock applied"),
            Err(err) => tracing::warn!(?lock, %err, "RT: mlockall failed"),
        }
        apply_scheduling(args);
    });
}

fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall only takes flags and has no memory-safety preconditions.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);

    // current|future is the one that usually runs into 'ulimit -l'
    if lock == RtLock::All && retryable && unsafe { mlockall(MCL_CURRENT) } == 0 {
        tracing::warn!(%err, "RT: mlockall(current|future) failed, locked current pages only");
        return Ok(());
    }
    let mut msg = format!("mlockall: {err}");
    if retryable {
        if let Some(limit) = memlock_limit_kib() {
            msg.push_str(&format!("; memlock limit {limit}"));
        }
        msg.push_str("; needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

fn memlock_limit_kib() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success; we only read it then.
    let r = unsafe {
        if libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) != 0 {
            return None;
        }
        rlim.assume_init()
    };
    Some(if r.rlim_cur == libc::RLIM_INFINITY {
        "unlimited".to_string()
    } else {
        format!("{} KiB", r.rlim_cur / 1024)
    })
}

#[cfg(target_os = "linux")]
fn apply_scheduling(args: &RtArgs) {
    match set_fifo(args.rt_prio) {
        Ok(prio) => tracing::info!(prio, "RT: SCHED_FIFO applied"),
        Err(err) => tracing::warn!(prio = ?args.rt_prio, %err, "RT: SCHED_FIFO not applied"),
    }
    let cpu = args.rt_cpu.unwrap_or(0);
    match pin_to_cpu(cpu) {
        Ok(()) => tracing::info!(cpu, "RT: pinned to CPU"),
        Err(err) => tracing::warn!(cpu, %err, "RT: affinity not applied"),
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_scheduling(_args: &RtArgs) {
    tracing::warn!("RT: SCHED_FIFO and CPU affinity are Linux only; only mlockall applied");
}

/// Capability bit for CAP_SYS_NICE in /proc/self/status masks.
#[cfg(target_os = "linux")]
const CAP_SYS_NICE: u64 = 1 << 23;

#[cfg(target_os = "linux")]
fn has_sys_nice() -> bool {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return false;
    };
    status
        .lines()
        .filter(|l| l.starts_with("CapEff:"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .filter_map(|hex| u64::from_str_radix(hex, 16).ok())
        .any(|caps| caps & CAP_SYS_NICE != 0)
}

#[cfg(target_os = "linux")]
fn set_fifo(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: plain syscalls without pointer arguments.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 && !has_sys_nice() {
        eyre::bail!(
            "needs CAP_SYS_NICE or root (euid {euid}); try 'sudo setcap cap_sys_nice=ep $(which padctl)'"
        );
    }
    let (min, max) = unsafe { (sched_get_priority_min(SCHED_FIFO), sched_get_priority_max(SCHED_FIFO)) };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let prio = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio,
    };
    // SAFETY: param outlives the call; pid 0 is the calling thread.
    if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(prio)
}

#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

    let capacity = std::mem::size_of::<cpu_set_t>() * 8;
    if cpu >= capacity {
        eyre::bail!("CPU {cpu} exceeds cpu_set_t capacity {capacity}");
    }
    // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set and every
    // pointer passed below refers to a live local.
    unsafe {
        let mut allowed: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut allowed);
        if libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
        if !CPU_ISSET(cpu, &allowed) {
            eyre::bail!("CPU {cpu} not permitted by current affinity mask");
        }
        let mut wanted: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut wanted);
        CPU_SET(cpu, &mut wanted);
        if libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &wanted) != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}
