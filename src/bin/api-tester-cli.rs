use std::collections::BTreeMap;

use api_tester_sdk::{ApiTesterClient, ProxyRequest};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "api-tester-cli")]
#[command(about = "Management CLI for the API tester", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "API_TESTER_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored exchange logs
    Logs,
    /// Print one exchange log
    ShowLog { filename: String },
    /// Delete one exchange log
    DeleteLog { filename: String },
    /// List templates
    Templates,
    /// Create or replace a template from a JSON object
    PutTemplate { name: String, json: String },
    /// Delete a template
    DeleteTemplate { name: String },
    /// Show requests captured by the catcher
    Requests,
    /// Empty the catcher's request buffer
    Clear,
    /// Select the catcher's response template; omit the name for the default reply
    SelectTemplate { name: Option<String> },
    /// Send a request through the server's proxy
    Proxy {
        method: String,
        endpoint: String,
        /// `Name: value`, repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Body; parsed as JSON when possible, sent as text otherwise
        #[arg(short, long)]
        payload: Option<String>,
        /// Milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Log identifier
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ApiTesterClient::new(&cli.url);

    match cli.command {
        Commands::Logs => {
            for name in client.list_logs().await? {
                println!("{}", name);
            }
        }
        Commands::ShowLog { filename } => print_json(&client.get_log(&filename).await?)?,
        Commands::DeleteLog { filename } => println!("{}", client.delete_log(&filename).await?),
        Commands::Templates => print_json(&client.list_templates().await?)?,
        Commands::PutTemplate { name, json } => {
            let payload: Value = serde_json::from_str(&json)?;
            println!("{}", client.put_template(&name, &payload).await?);
        }
        Commands::DeleteTemplate { name } => println!("{}", client.delete_template(&name).await?),
        Commands::Requests => {
            let caught = client.requests().await?;
            println!("{} captured request(s)", caught.total_requests);
            print_json(&caught.requests)?;
        }
        Commands::Clear => println!("{}", client.clear_requests().await?),
        Commands::SelectTemplate { name } => println!("{}", client.select_template(name.as_deref()).await?),
        Commands::Proxy {
            method,
            endpoint,
            headers,
            payload,
            timeout,
            id,
        } => {
            let request = ProxyRequest {
                endpoint,
                method,
                headers: parse_headers(&headers)?,
                payload: payload.map(|p| serde_json::from_str(&p).unwrap_or(Value::String(p))),
                timeout,
                log_identifier: id,
            };
            let response = client.proxy(&request, None).await?;
            print!("{}", response.headers);
            println!("{}", response.body);
        }
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    raw.iter()
        .map(|line| {
            line.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| format!("invalid header {:?}, expected `Name: value`", line))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
