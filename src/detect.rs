//! Process-wide detection of hardware AES support.
//!
//! The probe runs at most once per process and its answer is cached. A probe that cannot run
//! (unsupported architecture, acceleration disabled through the environment) reports
//! "unsupported" rather than failing.

use std::sync::OnceLock;

use log::debug;

/// Environment variable that, when set to `1`, `true`, or `yes`, makes [`aes_acceleration`]
/// report no hardware support. Read once, together with the CPU probe.
pub const DISABLE_ACCELERATION_ENV: &str = "AESMODE_DISABLE_ACCELERATION";

static AES_ACCELERATION: OnceLock<bool> = OnceLock::new();

/// Whether the CPU offers AES instructions usable by the accelerated backend.
#[inline]
#[must_use]
pub fn aes_acceleration() -> bool {
    *AES_ACCELERATION.get_or_init(probe)
}

fn probe() -> bool {
    if disabled_by_env() {
        debug!("{DISABLE_ACCELERATION_ENV} set, hardware AES disabled");
        return false;
    }
    let supported = probe_cpu();
    debug!("hardware AES support: {supported}");
    supported
}

fn disabled_by_env() -> bool {
    std::env::var_os(DISABLE_ACCELERATION_ENV)
        .and_then(|v| v.into_string().ok())
        .is_some_and(|v| {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
        })
}

#[cfg(target_arch = "x86_64")]
fn probe_cpu() -> bool {
    std::arch::is_x86_feature_detected!("aes") && std::arch::is_x86_feature_detected!("sse2")
}

#[cfg(not(target_arch = "x86_64"))]
fn probe_cpu() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_is_stable() {
        let first = aes_acceleration();
        for _ in 0..8 {
            assert_eq!(aes_acceleration(), first);
        }
    }

    #[test]
    fn detection_is_stable_across_threads() {
        let first = aes_acceleration();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(aes_acceleration))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), first);
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[test]
    fn unsupported_arch_reports_false() {
        assert!(!probe_cpu());
    }
}
