pub mod run;
pub mod steps;

use anyhow::Result;

use crate::Context;
use crate::schema::PrimerConfig;

/// Load the config named by `--config`, or the default location
fn load_config(ctx: &Context) -> Result<PrimerConfig> {
    let path = match &ctx.config {
        Some(path) => path.clone(),
        None => PrimerConfig::default_path()?,
    };
    PrimerConfig::load_from(&path)
}
