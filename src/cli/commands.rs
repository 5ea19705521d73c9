use crate::app::{AppContext, Result};
use crate::bridge::{BridgeDescriptor, Parameters};
use crate::cache::{CacheFactory, CacheSettings};
use crate::config::Config;

pub async fn run_bridge(ctx: &AppContext, bridge: &str, params: Vec<(String, String)>) -> Result<()> {
    let parameters: Parameters = params.into_iter().collect();
    let collected = ctx.run(bridge, &parameters).await?;

    println!("{}", serde_json::to_string_pretty(&collected)?);
    eprintln!("{} items from {}", collected.items.len(), collected.identity.name);
    Ok(())
}

pub fn list_bridges(ctx: &AppContext) {
    for descriptor in ctx.registry.descriptors() {
        print!("{}", describe(descriptor));
    }
}

pub fn list_caches(config: &Config) -> Result<()> {
    let factory = CacheFactory::new(CacheSettings {
        dir: config.cache_dir()?,
    });
    for name in factory.names() {
        let marker = match factory.resolve(&config.cache.backend) {
            Ok(configured) if configured == *name => " (configured)",
            _ => "",
        };
        println!("{}{}", name, marker);
    }
    Ok(())
}

pub fn prune_cache(ctx: &AppContext) -> Result<()> {
    let removed = ctx.prune()?;
    println!("Removed {} expired entries", removed);
    Ok(())
}

fn describe(descriptor: &BridgeDescriptor) -> String {
    let mut out = format!(
        "{} - {}\n  {}\n  cache: {}s\n",
        descriptor.id,
        descriptor.name,
        descriptor.uri,
        descriptor.cache_timeout.as_secs()
    );

    for context in descriptor.contexts {
        out.push_str(&format!("  [{}]\n", context.name));
        for param in context.parameters {
            let mut line = format!("    {}", param.name);
            if param.required {
                line.push_str(" (required)");
            }
            if let Some(default) = param.default {
                line.push_str(&format!(" default={}", default));
            }
            if !param.values.is_empty() {
                line.push_str(&format!(" one of {} values", param.values.len()));
            }
            if let Some(example) = param.example {
                line.push_str(&format!(" e.g. {}", example));
            }
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}
