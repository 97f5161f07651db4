use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "url-tracker")]
#[command(about = "Tracks submitted URLs and re-fetches the most popular ones")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Snapshot file, loaded at startup and rewritten periodically
    #[arg(short, long, default_value = "data.json")]
    pub data_file: PathBuf,

    // Seconds between background fetch rounds
    #[arg(long, default_value_t = 60)]
    pub fetch_interval: u64,

    // Seconds between snapshot saves
    #[arg(long, default_value_t = 300)]
    pub save_interval: u64,

    // Max concurrent downloads
    #[arg(short, long, default_value_t = 3)]
    pub max_downloads: usize,

    // How many of the busiest URLs each round fetches
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    // Minimum gap between two admitted requests from one client
    #[arg(long, default_value_t = 1000)]
    pub throttle_interval_ms: u64,

    // Seconds between throttle eviction sweeps
    #[arg(long, default_value_t = 60)]
    pub throttle_sweep_interval: u64,

    // Per-fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub fetch_timeout: u64,

    // Fetch a URL in the background whenever it is looked up
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub refresh_on_lookup: bool,
}

impl Args {
    // Zero intervals would panic inside the background loops' timers
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_downloads > 0, "--max-downloads must be at least 1");
        anyhow::ensure!(self.fetch_interval > 0, "--fetch-interval must be at least 1 second");
        anyhow::ensure!(self.save_interval > 0, "--save-interval must be at least 1 second");
        anyhow::ensure!(
            self.throttle_sweep_interval > 0,
            "--throttle-sweep-interval must be at least 1 second"
        );
        anyhow::ensure!(self.fetch_timeout > 0, "--fetch-timeout must be at least 1 second");
        Ok(())
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval)
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn throttle_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.throttle_sweep_interval)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::parse_from(["url-tracker"]);
        assert_eq!(args.port, 8080);
        assert_eq!(args.data_file, PathBuf::from("data.json"));
        assert_eq!(args.fetch_interval(), Duration::from_secs(60));
        assert_eq!(args.save_interval(), Duration::from_secs(300));
        assert_eq!(args.max_downloads, 3);
        assert_eq!(args.top_n, 10);
        assert_eq!(args.throttle_interval(), Duration::from_secs(1));
        assert!(args.refresh_on_lookup);
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Args::parse_from(["url-tracker"]).validate().is_ok());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        for flag in [
            "--max-downloads",
            "--fetch-interval",
            "--save-interval",
            "--throttle-sweep-interval",
            "--fetch-timeout",
        ] {
            let args = Args::parse_from(["url-tracker", flag, "0"]);
            let err = args.validate().unwrap_err();
            assert!(err.to_string().contains(flag), "{flag}: {err}");
        }
    }

    #[test]
    fn refresh_on_lookup_can_be_disabled() {
        let args = Args::parse_from(["url-tracker", "--refresh-on-lookup", "false"]);
        assert!(!args.refresh_on_lookup);
    }
}
