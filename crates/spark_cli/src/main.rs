//! Interactive terminal front end: multi-turn REPL or one-shot question.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use spark_client::{Fragment, StreamSession};
use spark_core::SparkConfig;

#[derive(Parser, Debug)]
#[command(name = "spark-chat", about = "Chat with the Spark model from the terminal")]
struct Cli {
    /// Ask a single question and exit instead of starting the REPL.
    #[arg(long)]
    question: Option<String>,

    /// Print the answer only after it is complete instead of streaming.
    #[arg(long)]
    no_stream: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = SparkConfig::load();
    let domain = config.domain.clone();
    let mut session = StreamSession::new(config);

    match cli.question {
        Some(question) => {
            let answer = ask(&mut session, &question, !cli.no_stream).await?;
            if cli.no_stream {
                println!("{answer}");
            }
        }
        None => talk(&mut session, &domain, !cli.no_stream).await?,
    }
    Ok(())
}

/// One-shot question, answer printed as it streams.
async fn ask(session: &mut StreamSession, question: &str, stream: bool) -> Result<String> {
    if stream {
        print!("Spark: ");
        flush();
    }
    let answer = session
        .run_exchange_with(question, |fragment: &Fragment| {
            if stream {
                print!("{}", fragment.text);
                flush();
            }
        })
        .await
        .context("exchange failed")?;
    if stream {
        println!();
    }
    Ok(answer)
}

/// Multi-turn REPL. `q` quits and prints the usage summary.
async fn talk(session: &mut StreamSession, domain: &str, stream: bool) -> Result<()> {
    session.reset_conversation();
    let stdin = std::io::stdin();

    loop {
        print!("\nQuestion (q to quit): ");
        flush();

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "q" {
            info!("User quit the conversation");
            break;
        }

        match ask(session, question, stream).await {
            Ok(answer) => {
                if !stream {
                    println!("Spark: {answer}");
                }
                if let Some(diagnostic) = session.usage().diagnostic() {
                    eprintln!("{diagnostic}");
                }
            }
            Err(e) => eprintln!("{e:#}"),
        }
    }

    let tokens = session.usage().cumulative_tokens();
    println!("Total tokens used this session: {tokens}");
    match estimated_cost(domain, tokens) {
        Some(cost) => println!("Estimated cost at list price: {cost:.4} CNY"),
        None => println!("No list price known for domain {domain}"),
    }
    Ok(())
}

/// List price per token by model domain, in CNY.
fn estimated_cost(domain: &str, tokens: u64) -> Option<f64> {
    let per_token = match domain {
        "generalv2" => 0.00032,
        "generalv1" => 0.00018,
        _ => return None,
    };
    Some(per_token * tokens as f64)
}

fn flush() {
    let _ = std::io::stdout().flush();
}
