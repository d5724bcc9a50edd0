//! `circap windows`: preview the rolling window plan.

use anyhow::Result;
use circap_batch::{plan_windows, HorizonMode, WindowScheme};
use circap_core::Window;
use std::io::{self, Write};
use tabwriter::TabWriter;

pub fn handle(start: u32, end: u32, window: u32, mode: &str, scheme: &str) -> Result<()> {
    let mode: HorizonMode = mode.parse()?;
    let scheme: WindowScheme = scheme.parse()?;
    let windows = plan_windows(Window::new(start, end)?, mode, window, scheme)?;

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "#\tYEARS\tCARRY YEAR")?;
    for (i, w) in windows.iter().enumerate() {
        let carry = if i == 0 {
            "-".to_string()
        } else {
            w.carry_year().to_string()
        };
        writeln!(writer, "{}\t{}-{}\t{}", i + 1, w.start, w.end, carry)?;
    }
    writer.flush()?;
    Ok(())
}
