//! `concierge doctor`: diagnose configuration and keys.

use concierge_config::AppConfig;
use concierge_tools::ToolDispatcher;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Concierge Doctor");
    println!("================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ok    Config file found at {}", config_path.display());
    } else {
        println!("  info  No config file, using defaults (run `concierge init` to create one)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok    Configuration valid");
            config
        }
        Err(e) => {
            println!("  FAIL  Configuration invalid: {e}");
            println!("\n  1 issue found. Fix the config before continuing.");
            return Ok(());
        }
    };

    println!("        provider={} model={} user={}", config.provider, config.model, config.user_id);

    if config.has_api_key() || config.provider == "ollama" {
        println!("  ok    Model API key configured");
    } else {
        println!("  FAIL  No model API key, set GEMINI_API_KEY");
        issues += 1;
    }

    if config.has_weather_key() {
        println!("  ok    Weather API key configured");
    } else {
        println!("  warn  No weather API key, set WEATHER_API_KEY for live data");
    }

    let weather = ToolDispatcher::from_config(&config);
    println!("  info  Weather source: {}", weather.weather_source());

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
