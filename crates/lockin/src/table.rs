use lockin_core::ProcessSummary;

pub struct TableFormatter {
    id_width: usize,
    pid_width: usize,
    state_width: usize,
    windows_width: usize,
    uptime_width: usize,
    title_width: usize,
}

impl TableFormatter {
    pub fn new(processes: &[ProcessSummary]) -> Self {
        let id_width = processes
            .iter()
            .map(|p| p.id.chars().count())
            .max()
            .unwrap_or(16)
            .clamp(2, 40);

        Self {
            id_width,
            pid_width: 8,
            state_width: 13,
            windows_width: 7,
            uptime_width: 8,
            title_width: 36,
        }
    }

    pub fn print_table(&self, processes: &[ProcessSummary]) {
        println!("{}", self.border('┌', '┬', '┐'));
        println!(
            "{}",
            self.row(["Id", "PID", "State", "Windows", "Uptime", "Main Window"])
        );
        println!("{}", self.border('├', '┼', '┤'));
        for process in processes {
            let pid = process.pid.to_string();
            let state = format!("{:?}", process.state).to_lowercase();
            let windows = process.window_count.to_string();
            let uptime = format_uptime(process.uptime_secs);
            let title = process.main_window_title.as_deref().unwrap_or("-");
            println!(
                "{}",
                self.row([
                    process.id.as_str(),
                    pid.as_str(),
                    state.as_str(),
                    windows.as_str(),
                    uptime.as_str(),
                    title,
                ])
            );
        }
        println!("{}", self.border('└', '┴', '┘'));
    }

    fn widths(&self) -> [usize; 6] {
        [
            self.id_width,
            self.pid_width,
            self.state_width,
            self.windows_width,
            self.uptime_width,
            self.title_width,
        ]
    }

    fn row(&self, cells: [&str; 6]) -> String {
        let cells: Vec<String> = cells
            .iter()
            .zip(self.widths())
            .map(|(cell, width)| truncate(cell, width))
            .collect();
        format!("│ {} │", cells.join(" │ "))
    }

    fn border(&self, left: char, middle: char, right: char) -> String {
        let segments: Vec<String> = self
            .widths()
            .iter()
            .map(|width| "─".repeat(width + 2))
            .collect();
        format!("{}{}{}", left, segments.join(&middle.to_string()), right)
    }
}

fn format_uptime(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{:02}m", hours, minutes)
    } else {
        format!("{}m{:02}s", minutes, seconds)
    }
}

/// Truncate a string to a maximum display width, adding "..." if truncated.
///
/// Counts characters, not bytes, so multi-byte window titles are cut safely.
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        format!("{:<width$}", s, width = max_len)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_len)
    }
}
