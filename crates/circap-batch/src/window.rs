use anyhow::{bail, Result};
use circap_core::Window;

use crate::config::{HorizonMode, WindowScheme};

/// Partition `horizon` into the windows solved one after another.
///
/// Window `i + 1` starts the year after the `window`-year block of window
/// `i`, so its carry-over is read at `start - 1`. With the open-ended scheme
/// every window reaches the horizon end and the later years of one window
/// are re-planned by the next.
///
/// ```
/// use circap_batch::{plan_windows, HorizonMode, WindowScheme};
/// use circap_core::Window;
///
/// let windows = plan_windows(
///     Window::new(2025, 2031).unwrap(),
///     HorizonMode::Rolling,
///     3,
///     WindowScheme::Fixed,
/// )
/// .unwrap();
/// let bounds: Vec<_> = windows.iter().map(|w| (w.start, w.end)).collect();
/// assert_eq!(bounds, [(2025, 2027), (2028, 2030), (2031, 2031)]);
/// ```
pub fn plan_windows(
    horizon: Window,
    mode: HorizonMode,
    window: u32,
    scheme: WindowScheme,
) -> Result<Vec<Window>> {
    if mode == HorizonMode::Perfect {
        return Ok(vec![horizon]);
    }
    if window == 0 {
        bail!("rolling window length must be at least one year");
    }

    let mut windows = Vec::new();
    let mut start = horizon.start;
    while start <= horizon.end {
        let end = match scheme {
            WindowScheme::Fixed => start.saturating_add(window - 1).min(horizon.end),
            WindowScheme::OpenEnded => horizon.end,
        };
        windows.push(Window::new(start, end)?);
        start = start.saturating_add(window);
    }
    Ok(windows)
}
