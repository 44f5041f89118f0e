use std::fmt;
use std::time::Duration;
use chrono::{ DateTime, Local };
use crate::config::Config;
use crate::outcome::Category;
use crate::tally::TallySnapshot;

const FIELD_WIDTH: usize = 17; //  width of each label column
const RULE_WIDTH: usize = 60;

pub const AUTOSCALING_HINT: &str = "\
Check your cloud console for autoscaling activity:
   Auto Scaling group -> Activity history (instances launched/terminated)
   Monitoring -> Alarms -> the high-CPU / request-count alarm driving the policy
";

fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

/// Requests per second, zero when nothing completed or no time elapsed.
pub fn throughput(completed: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if completed == 0 || secs <= 0.0 {
        0.0
    } else {
        (completed as f64) / secs
    }
}

/// Banner printed before the first request is sent.
pub struct Banner<'a> {
    pub config: &'a Config,
    pub target: &'a str,
    pub started_at: DateTime<Local>,
}

impl fmt::Display for Banner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        rule(f)?;
        writeln!(f, "HTTP LOAD TEST")?;
        rule(f)?;
        writeln!(f, "{:<FIELD_WIDTH$}{}", "Target URL:", self.target)?;
        writeln!(f, "{:<FIELD_WIDTH$}{}", "Workers:", self.config.workers)?;
        writeln!(f, "{:<FIELD_WIDTH$}{}", "Total Requests:", self.config.requests)?;
        writeln!(f, "{:<FIELD_WIDTH$}{:?}", "Timeout:", self.config.timeout)?;
        writeln!(
            f,
            "{:<FIELD_WIDTH$}{}",
            "Start Time:",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        rule(f)?;
        writeln!(f, "\nStarting load test... (Press Ctrl+C to stop)")
    }
}

/// One progress line, emitted every N completions.
pub struct Progress {
    pub snapshot: TallySnapshot,
    pub completed: u64, // ordinal that triggered this line
    pub total: u64,
    pub elapsed: Duration,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {}/{} requests ({:.1} req/sec) - Success: {}, Timeouts: {}, Errors: {}",
            self.completed,
            self.total,
            throughput(self.completed, self.elapsed),
            self.snapshot.success,
            self.snapshot.timeout,
            self.snapshot.connection_error
        )
    }
}

/// Aggregate statistics for a finished (or interrupted) run.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub tally: TallySnapshot,
    pub requested: u64,
    pub duration: Duration,
    pub interrupted: bool,
}

impl RunStats {
    pub fn completed(&self) -> u64 {
        self.tally.completed()
    }

    pub fn requests_per_sec(&self) -> f64 {
        throughput(self.completed(), self.duration)
    }

    /// Share of completed attempts in `category`, 0.0 when nothing completed.
    pub fn percentage(&self, category: Category) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            return 0.0;
        }
        (100.0 * (self.tally.count(category) as f64)) / (completed as f64)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        rule(f)?;
        writeln!(f, "RESULTS")?;
        rule(f)?;
        writeln!(
            f,
            "{:<FIELD_WIDTH$}{:.2} seconds",
            "Duration:",
            self.duration.as_secs_f64()
        )?;
        writeln!(f, "{:<FIELD_WIDTH$}{}", "Total Requests:", self.completed())?;
        if self.interrupted {
            writeln!(f, "{:<FIELD_WIDTH$}{} (interrupted)", "Planned:", self.requested)?;
        }
        writeln!(f, "{:<FIELD_WIDTH$}{:.2}", "Requests/sec:", self.requests_per_sec())?;
        writeln!(f)?;
        writeln!(f, "Status Codes:")?;
        for category in Category::ALL {
            let label = format!("{}:", category.label());
            writeln!(
                f,
                "  {:<15}{} ({:.1}%)",
                label,
                self.tally.count(category),
                self.percentage(category)
            )?;
        }

        if !self.tally.other_reasons.is_empty() {
            writeln!(f)?;
            writeln!(f, "Other Breakdown:")?;
            for (reason, count) in &self.tally.other_reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }
        rule(f)
    }
}
