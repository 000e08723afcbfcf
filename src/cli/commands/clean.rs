//! Clean command.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::ArtifactStore;
use anyhow::Result;

/// Remove everything from the output directory.
pub fn run_clean(settings: &Settings) -> Result<()> {
    let store = ArtifactStore::new(settings.output_dir());
    let removed = store.clear_outputs();

    if removed == 0 {
        Output::info(&format!("Nothing to remove in {}", store.root().display()));
    } else {
        Output::success(&format!(
            "Removed {} item(s) from {}",
            removed,
            store.root().display()
        ));
    }
    Ok(())
}
