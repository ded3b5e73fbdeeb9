use std::process::{Command, Stdio};

use anyhow::Result;
use log::info;

/// The capture pipeline shells out to ffmpeg; without it there is nothing
/// to transcribe. Checked once before any loop starts so a missing install
/// fails loudly instead of producing a silent, empty transcript.
pub fn check_ffmpeg() -> Result<()> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => {
            info!("ffmpeg found");
            Ok(())
        }
        Err(_) => Err(anyhow::anyhow!(
            "The ffmpeg library is not installed. Please install ffmpeg and try again."
        )),
    }
}
