/// Travel agent CLI
/// Chat with the booking agent from the terminal, one user per process

use anyhow::Result;
use std::io::{self, BufRead, Write};

use travel_agent::{AgentConfig, SessionStore, TurnOrchestrator};

const CLI_USER: &str = "cli";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    travel_agent::init_tracing();

    let config = AgentConfig::from_env()?;
    let orchestrator = TurnOrchestrator::from_config(&config)?;

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║          Flight & Hotel Booking Assistant (CLI)            ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    println!("Examples:");
    println!("  'quero voo para Lisboa'");
    println!("  'comprar voo para Roma'");
    println!("  'reservar hotel em Paris de 10/07/2025 a 15/07/2025 para 2'\n");

    println!("Type '/reset' to start over, '/quit' to end.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut reader = stdin.lock();

    loop {
        print!("\nVocê: ");
        stdout.flush()?;

        let mut user_input = String::new();
        if reader.read_line(&mut user_input)? == 0 {
            break; // EOF
        }

        let input = user_input.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "/quit" | "exit" | "quit" => {
                println!("\nAté logo! ✈️");
                break;
            }
            "/reset" => {
                orchestrator.store().reset(CLI_USER).await;
                println!("\n🔄 Conversa reiniciada.");
                continue;
            }
            _ => {}
        }

        let reply = orchestrator.handle_turn(CLI_USER, input).await;
        if reply.is_error {
            println!("\n⚠ Agente: {}", reply.text);
        } else {
            println!("\nAgente: {}", reply.text);
        }
    }

    Ok(())
}
