//! Best-effort feedback pulse when a context menu opens.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

pub trait Haptics: Send {
    fn is_supported(&self) -> bool;

    fn pulse(&mut self) -> io::Result<()>;
}

/// Rings the terminal bell on stdout.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl Haptics for TerminalBell {
    fn is_supported(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn pulse(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()
    }
}

#[derive(Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn is_supported(&self) -> bool {
        false
    }

    fn pulse(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts pulses instead of emitting them.
#[derive(Debug, Default, Clone)]
pub struct CountingHaptics {
    pulses: Arc<AtomicUsize>,
}

impl CountingHaptics {
    pub fn count(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl Haptics for CountingHaptics {
    fn is_supported(&self) -> bool {
        true
    }

    fn pulse(&mut self) -> io::Result<()> {
        self.pulses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn for_settings(enabled: bool) -> Box<dyn Haptics> {
    if enabled {
        Box::new(TerminalBell)
    } else {
        Box::new(NoHaptics)
    }
}

/// Pulses when the device supports it; failures are only logged.
pub fn pulse_if_supported(haptics: &mut dyn Haptics) {
    if !haptics.is_supported() {
        return;
    }
    if let Err(err) = haptics.pulse() {
        debug!("haptic pulse failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unsupported {
        attempts: usize,
    }

    impl Haptics for Unsupported {
        fn is_supported(&self) -> bool {
            false
        }

        fn pulse(&mut self) -> io::Result<()> {
            self.attempts += 1;
            Ok(())
        }
    }

    struct Broken;

    impl Haptics for Broken {
        fn is_supported(&self) -> bool {
            true
        }

        fn pulse(&mut self) -> io::Result<()> {
            Err(io::Error::other("no device"))
        }
    }

    #[test]
    fn test_unsupported_device_is_never_pulsed() {
        let mut haptics = Unsupported { attempts: 0 };
        pulse_if_supported(&mut haptics);
        assert_eq!(haptics.attempts, 0);
    }

    #[test]
    fn test_pulse_errors_are_swallowed() {
        pulse_if_supported(&mut Broken);
    }

    #[test]
    fn test_counting_haptics_shares_count_across_clones() {
        let counter = CountingHaptics::default();
        let mut boxed: Box<dyn Haptics> = Box::new(counter.clone());
        pulse_if_supported(boxed.as_mut());
        pulse_if_supported(boxed.as_mut());
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_disabled_setting_yields_no_op() {
        assert!(!for_settings(false).is_supported());
    }
}
