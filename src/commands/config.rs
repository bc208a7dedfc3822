use anyhow::Result;
use gpm::config::SETTABLE_KEYS;
use gpm::Config;

pub fn run(action: &crate::ConfigAction) -> Result<()> {
    use crate::ConfigAction;

    match action {
        ConfigAction::Show => show_config(),
        ConfigAction::Set { key, value } => set_config(key, value),
        ConfigAction::Path => {
            println!("{}", Config::default_path()?.display());
            Ok(())
        }
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    let config_path = Config::default_path()?;

    println!();
    println!("  Config file: {}", config_path.display());
    println!();

    println!("  Unreal registries");
    println!("    release:  {}", display_url(&config.unreal.release));
    println!("    snapshot: {}", display_url(&config.unreal.snapshot));
    println!();
    println!("  Unity registries");
    println!("    release:  {}", display_url(&config.unity.release));
    println!("    snapshot: {}", display_url(&config.unity.snapshot));
    println!();
    println!(
        "  Pre-release rule: {}",
        serde_json::to_value(config.prerelease_rule)?
            .as_str()
            .unwrap_or_default()
    );
    println!("  Sync scope:       {}", config.sync.scope);
    println!("  Clean sync:       {}", config.sync.clean);
    println!("  Package manager:  {}", config.subprocess.program);
    println!(
        "  Timeout:          {}",
        match config.subprocess.timeout_seconds {
            0 => "none".to_string(),
            secs => format!("{}s", secs),
        }
    );
    println!();

    println!("Modify settings:");
    println!("   gpm config set <key> <value>");
    println!();
    println!("   Available keys:");
    for key in SETTABLE_KEYS {
        println!("     • {}", key);
    }
    println!();

    Ok(())
}

fn display_url(url: &str) -> &str {
    if url.is_empty() {
        "<not set>"
    } else {
        url
    }
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    if value.is_empty() {
        println!("✓ {} = <cleared>", key);
    } else {
        println!("✓ {} = \"{}\"", key, value);
    }
    println!("Configuration saved");

    Ok(())
}
