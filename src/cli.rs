use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kibitz", about = "Kibitz - live conversation suggestions")]
pub struct CliArgs {
    /// Run the transcription pipeline with the local model
    #[arg(long)]
    pub local: bool,
}
