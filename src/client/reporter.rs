use crate::client::push::PushOutcome;
use crate::client::rtt::RttOutcome;
use crate::client::statistics::LatencyStats;
use colored::*;
use tracing::info;

/// Reporter for printing interim and final measurement results
pub struct Reporter;

impl Reporter {
    fn format_us(ns: i64) -> String {
        format!("{:>10.1} µs", ns as f64 / 1000.0)
    }

    /// One compact line per engine, printed on the interim report tick.
    pub fn print_interim(&self, label: &str, stats: &LatencyStats) {
        if stats.count == 0 {
            println!("{} {:<9} no samples yet", "interim".dimmed(), label);
            return;
        }
        println!(
            "{} {:<9} n={:<7} min={:<9.1} p50={:<9.1} p99={:<9.1} max={:<9.1} mean={:.1} (µs)",
            "interim".dimmed(),
            label,
            stats.count,
            stats.min as f64 / 1000.0,
            stats.p50 as f64 / 1000.0,
            stats.p99 as f64 / 1000.0,
            stats.max as f64 / 1000.0,
            stats.mean / 1000.0,
        );
    }

    /// Full statistics block for one engine.
    pub fn print_final_stats(&self, title: &str, stats: &LatencyStats, skipped: usize) {
        println!("{}", title.cyan().bold());
        if stats.count == 0 {
            println!("  {}", "No samples recorded.".red());
            println!();
            return;
        }
        println!("  Samples: {:>10}", stats.count);
        println!("  Min:   {}", Self::format_us(stats.min));
        println!("  P10:   {}", Self::format_us(stats.p10));
        println!("  P50:   {}  (median)", Self::format_us(stats.p50));
        println!("  P90:   {}", Self::format_us(stats.p90));
        println!("  P99:   {}", Self::format_us(stats.p99));
        println!("  Max:   {}", Self::format_us(stats.max));
        println!("  Mean:  {:>10.1} µs", stats.mean / 1000.0);
        if skipped > 0 {
            println!("  Skipped warm-up samples: {}", skipped);
        }
        println!();
    }

    /// Final report for an RTT run: both engines plus the delivery
    /// discrepancy (loss is surfaced only as these numbers).
    pub fn print_rtt_summary(&self, outcome: &RttOutcome) {
        println!("\n{}", "┌──────────────────────────────┐".cyan());
        println!("{}", "│  wspulse RTT Results         │".cyan());
        println!("{}", "└──────────────────────────────┘".cyan());
        println!();
        println!(
            "Requests: {} sent, {} matched, {} outstanding, {} evicted",
            outcome.sent, outcome.matched, outcome.outstanding, outcome.evicted
        );
        println!();

        self.print_final_stats(
            "Round-trip time (client send to client receive)",
            &outcome.rtt,
            outcome.skipped,
        );
        self.print_final_stats(
            "One-way latency (server send to client receive)",
            &outcome.one_way,
            outcome.skipped,
        );

        info!(
            sent = outcome.sent,
            matched = outcome.matched,
            outstanding = outcome.outstanding,
            "RTT results reported"
        );
    }

    /// Final report for a push run: the single one-way engine.
    pub fn print_push_summary(&self, outcome: &PushOutcome) {
        println!("\n{}", "┌──────────────────────────────┐".cyan());
        println!("{}", "│  wspulse Broadcast Results   │".cyan());
        println!("{}", "└──────────────────────────────┘".cyan());
        println!();
        println!("Events received: {}", outcome.received);
        println!();

        self.print_final_stats(
            "One-way latency (server timestamp to client receive)",
            &outcome.latency,
            outcome.skipped,
        );

        info!(received = outcome.received, "Broadcast results reported");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> LatencyStats {
        LatencyStats {
            count: 3,
            min: 1000,
            p10: 1000,
            p50: 2000,
            p90: 3000,
            p99: 3000,
            max: 3000,
            mean: 2000.0,
        }
    }

    #[test]
    fn test_print_final_stats_with_data() {
        // Must not panic; output is eyeballed in integration runs.
        Reporter.print_final_stats("Round-trip time", &sample_stats(), 5);
    }

    #[test]
    fn test_print_final_stats_empty() {
        Reporter.print_final_stats("Round-trip time", &LatencyStats::default(), 0);
    }

    #[test]
    fn test_print_interim() {
        Reporter.print_interim("rtt", &sample_stats());
        Reporter.print_interim("one-way", &LatencyStats::default());
    }
}
