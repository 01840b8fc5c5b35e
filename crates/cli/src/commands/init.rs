//! `concierge init`: write a starter config file.

use concierge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();

    if AppConfig::write_default(&path)? {
        println!("Created {}", path.display());
    } else {
        println!("Config already exists at {}, left untouched", path.display());
    }

    println!();
    println!("Secrets are read from the environment:");
    println!("  GEMINI_API_KEY    model access (required)");
    println!("  WEATHER_API_KEY   live weather (optional, simulated without it)");
    println!();
    println!("Next: `concierge doctor`, then `concierge chat`.");

    Ok(())
}
