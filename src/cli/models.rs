//! Models command handler.

use color_eyre::Result;

use crate::context::Context;

use super::App;

impl App {
    /// List the registered repositories with their backing model.
    pub fn run_models(&self, ctx: &Context) -> Result<()> {
        if ctx.repositories.is_empty() {
            tracing::warn!("No models registered; set [store] fixtures in .quarry.toml");
            return Ok(());
        }

        for name in ctx.repositories.names() {
            let repository = ctx.repositories.require(name)?;
            println!(
                "{}\t(model: {}, auto_validation: {})",
                repository.name(),
                repository.model_name(),
                repository.auto_validation()
            );
        }
        Ok(())
    }
}
