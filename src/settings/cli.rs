use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Friend requests and friendships over HTTP")]
pub struct Cli {
    /// TOML settings file; defaults to `settings/dev.toml` in debug builds
    #[arg(long)]
    pub settings: Option<String>,
}
