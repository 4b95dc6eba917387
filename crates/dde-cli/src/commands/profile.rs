use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use dde_agg::{profile_to_yaml, AggregationProfile};

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Destination of the profile YAML.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &ProfileArgs) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let yaml = profile_to_yaml(&AggregationProfile::default())?;
    fs::write(&args.out, yaml)?;
    Ok(())
}
