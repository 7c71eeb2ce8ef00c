use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "linkup-server", about = "Linkup messaging server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/linkup.toml")]
    pub config: String,
}
