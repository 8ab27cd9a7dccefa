// platform.rs
//! Cross-platform probes for the raw capability signals.
//! Every probe returns `None` when the platform does not expose the value.

/// Installed physical memory in bytes.
pub(crate) fn total_ram_bytes() -> Option<u64> {
    imp::total_ram_bytes()
}

/// Logical core count as reported by the standard library.
pub(crate) fn logical_cores() -> Option<usize> {
    std::thread::available_parallelism().ok().map(|n| n.get())
}

/// Touch points the platform can track. Desktop targets report none.
pub(crate) fn max_touch_points() -> Option<u32> {
    if cfg!(any(target_os = "android", target_os = "ios")) {
        Some(1)
    } else {
        None
    }
}

/// A user-agent style identifier for the host, used by the mobile heuristic.
pub(crate) fn user_agent() -> String {
    let os = match std::env::consts::OS {
        "android" => "Android",
        "ios" => "iPhone OS",
        "macos" => "Macintosh",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    };
    format!("{} {}", os, std::env::consts::ARCH)
}

/* -------------------------- Windows -------------------------- */

#[cfg(target_os = "windows")]
mod imp {
    pub(super) fn total_ram_bytes() -> Option<u64> {
        use windows_sys::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};
        // SAFETY: MEMORYSTATUSEX is plain data; dwLength is set before the call.
        unsafe {
            let mut st: MEMORYSTATUSEX = std::mem::zeroed();
            st.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;
            if GlobalMemoryStatusEx(&mut st) != 0 { Some(st.ullTotalPhys) } else { None }
        }
    }
}

/* --------------------- macOS / iOS (Darwin) --------------------- */

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod imp {
    fn sysctl_u64(name: &str) -> Option<u64> {
        use libc::{c_void, size_t, sysctlbyname};
        let cname = std::ffi::CString::new(name).ok()?;
        let mut val: u64 = 0;
        let mut len: size_t = std::mem::size_of::<u64>() as _;
        // SAFETY: val/len describe a valid u64 out-buffer for the duration of the call.
        let rc = unsafe { sysctlbyname(cname.as_ptr(), &mut val as *mut _ as *mut c_void, &mut len, std::ptr::null_mut(), 0) };
        if rc == 0 && val != 0 { Some(val) } else { None }
    }

    pub(super) fn total_ram_bytes() -> Option<u64> { sysctl_u64("hw.memsize") }
}

/* --------------------- Linux / Android --------------------- */

#[cfg(any(target_os = "linux", target_os = "android"))]
mod imp {
    pub(super) fn total_ram_bytes() -> Option<u64> {
        let text = std::fs::read_to_string("/proc/meminfo").ok()?;
        parse_meminfo_total(&text)
    }

    // /proc/meminfo: "MemTotal:  16367168 kB"
    pub(super) fn parse_meminfo_total(text: &str) -> Option<u64> {
        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
                return Some(kb * 1024);
            }
        }
        None
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_meminfo_total() {
            let text = "MemTotal:       16367168 kB\nMemFree:         1234567 kB\n";
            assert_eq!(parse_meminfo_total(text), Some(16367168 * 1024));
            assert_eq!(parse_meminfo_total("MemFree: 1 kB\n"), None);
            assert_eq!(parse_meminfo_total("MemTotal: lots kB\n"), None);
        }
    }
}

/* --------------------- Other / WASM / Fallbacks --------------------- */

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
mod imp {
    pub(super) fn total_ram_bytes() -> Option<u64> { None }
}
