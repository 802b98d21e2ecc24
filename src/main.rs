use anyhow::Result;

use tokenboard::app::Dashboard;
use tokenboard::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    eprintln!(
        "[tokenboard] polling {} every {}s, writing {}",
        cfg.endpoint_url(),
        cfg.poll_secs,
        cfg.output_path
    );
    Dashboard::from_config(cfg)?.run().await
}
