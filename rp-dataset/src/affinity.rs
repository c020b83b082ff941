//! Process CPU-affinity control for worker hosts.
//!
//! Some linear-algebra runtimes pin the loading thread to a single core, and the pin is
//! inherited by every worker spawned afterwards. The host calls [reset_cpu_affinity] once
//! before starting workers.

use crate::common::*;

/// Allow the calling thread to run on every available core.
#[cfg(target_os = "linux")]
pub fn reset_cpu_affinity() -> Result<()> {
    // all configured cores, including the ones outside the current mask
    let num_cpus = match unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) } {
        count if count > 0 => count as usize,
        _ => num_cpus::get(),
    };
    let num_cpus = cmp::min(num_cpus, mem::size_of::<libc::cpu_set_t>() * 8);

    // SAFETY: cpu_set_t is plain data and the set is only passed by reference.
    let ret = unsafe {
        let mut set: libc::cpu_set_t = mem::zeroed();
        libc::CPU_ZERO(&mut set);
        (0..num_cpus).for_each(|cpu| libc::CPU_SET(cpu, &mut set));
        libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &set)
    };

    ensure!(
        ret == 0,
        "sched_setaffinity failed: {}",
        std::io::Error::last_os_error()
    );
    debug!("reset CPU affinity to {} cores", num_cpus);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn reset_cpu_affinity() -> Result<()> {
    Ok(())
}

/// The cores the calling thread may run on.
#[cfg(target_os = "linux")]
pub fn cpu_affinity() -> Result<Vec<usize>> {
    // SAFETY: the set is written by the kernel and only read through CPU_ISSET.
    let (ret, set) = unsafe {
        let mut set: libc::cpu_set_t = mem::zeroed();
        let ret = libc::sched_getaffinity(0, mem::size_of::<libc::cpu_set_t>(), &mut set);
        (ret, set)
    };

    ensure!(
        ret == 0,
        "sched_getaffinity failed: {}",
        std::io::Error::last_os_error()
    );

    let max_cpus = mem::size_of::<libc::cpu_set_t>() * 8;
    let cpus = (0..max_cpus)
        .filter(|&cpu| unsafe { libc::CPU_ISSET(cpu, &set) })
        .collect();
    Ok(cpus)
}

#[cfg(not(target_os = "linux"))]
pub fn cpu_affinity() -> Result<Vec<usize>> {
    Ok((0..num_cpus::get()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_then_query() {
        reset_cpu_affinity().unwrap();
        let cpus = cpu_affinity().unwrap();
        assert!(!cpus.is_empty());
    }
}
