//! `cairn check`: validate the layered configuration and print it

use std::collections::HashMap;

use cairn_config::settings::serialize_cairn_toml;
use cairn_config::ConfigSource;
use cairn_core::error::CairnResult;

use super::CommandContext;

pub async fn execute(ctx: &CommandContext) -> CairnResult<()> {
    let loaded = ctx.load_config(HashMap::new()).await?;

    ctx.output.info("Configuration sources:");
    for source in &loaded.sources {
        ctx.output.detail(&format!("  {}", describe(source)));
    }

    ctx.output.info("");
    ctx.output.info(serialize_cairn_toml(&loaded.config)?.trim_end());
    ctx.output.success("Configuration is valid");
    Ok(())
}

fn describe(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Defaults => "built-in defaults".to_string(),
        ConfigSource::Global(path) => format!("global: {}", path),
        ConfigSource::Project(path) => format!("project: {}", path),
        ConfigSource::Environment(var) => format!("environment: {}", var),
        ConfigSource::CommandLine => "command line".to_string(),
    }
}
