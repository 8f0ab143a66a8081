//! `vdq series [list|create <name>]`

use anyhow::Result;
use vdq_core::config::VdqConfig;
use vdq_core::library;

use crate::cli::SeriesAction;

pub async fn run_series(cfg: &VdqConfig, action: SeriesAction) -> Result<()> {
    match action {
        SeriesAction::List => {
            let names = library::list_series(&cfg.video_dir).await?;
            if names.is_empty() {
                println!("No series yet.");
            }
            for name in names {
                println!("{name}");
            }
        }
        SeriesAction::Create { name } => {
            let path = library::create_series(&cfg.video_dir, &name).await?;
            println!("Series folder ready: {}", path.display());
        }
    }
    Ok(())
}
