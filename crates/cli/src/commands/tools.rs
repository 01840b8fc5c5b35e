//! `concierge tools`: list the functions offered to the model.

use concierge_core::preference::remember_preference_definition;
use concierge_core::tool;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Concierge tools");
    println!("===============\n");

    for def in tool::definitions() {
        println!("  {}", def.name);
        println!("    {}", def.description);
        println!("    parameters: {}", serde_json::to_string_pretty(&def.parameters)?.replace('\n', "\n    "));
        println!();
    }

    let memory = remember_preference_definition();
    println!("  {} (handled internally, never dispatched)", memory.name);
    println!("    {}", memory.description);
    println!();

    Ok(())
}
