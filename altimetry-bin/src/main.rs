//! Command-line client for the altimetry HTTP API (spec §6): a thin
//! `reqwest` wrapper over intake, polling, and roster introspection, for
//! operators who want to drive the pipeline without writing a script.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "altimetry", author, version, about = "Altimetry update pipeline CLI")]
struct Cli {
    /// Base URL of the altimetry HTTP API.
    #[arg(long, global = true, default_value = "http://localhost:9110")]
    api: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a single alias, creating or coalescing an item (POST /item/<ns>/<nid>).
    Submit { namespace: String, id: String },
    /// Poll an item's current state (GET /item/<tiid>).
    Status { tiid: String },
    /// Look up the tiid claiming an alias (GET /tiid/<ns>/<nid>).
    Lookup { namespace: String, id: String },
    /// List the provider roster (GET /provider).
    Providers,
    /// Create a collection from a list of tiids (POST /collection).
    Collect {
        #[arg(long)]
        title: String,
        tiids: Vec<String>,
    },
    /// Re-submit every item in a collection to the pipeline (POST /collection/<cid>).
    Refresh { cid: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Submit { namespace, id } => {
            let url = format!("{}/item/{}/{}", cli.api, namespace, id);
            let body = post_json(&client, &url).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Status { tiid } => {
            let url = format!("{}/item/{}", cli.api, tiid);
            let body = get_json(&client, &url).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Lookup { namespace, id } => {
            let url = format!("{}/tiid/{}/{}", cli.api, namespace, id);
            let body = get_json(&client, &url).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Providers => {
            let url = format!("{}/provider", cli.api);
            let body = get_json(&client, &url).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Collect { title, tiids } => {
            let url = format!("{}/collection", cli.api);
            let response = client
                .post(&url)
                .json(&serde_json::json!({ "title": title, "items": tiids }))
                .send()
                .await
                .with_context(|| format!("POST {url}"))?;
            let body = response_json(response).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Refresh { cid } => {
            let url = format!("{}/collection/{}", cli.api, cid);
            let body = post_json(&client, &url).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client.get(url).send().await.with_context(|| format!("GET {url}"))?;
    response_json(response).await
}

async fn post_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client.post(url).send().await.with_context(|| format!("POST {url}"))?;
    response_json(response).await
}

async fn response_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.context("decoding response body as JSON")?;
    if !status.is_success() && status.as_u16() != 210 && status.as_u16() != 303 {
        bail!("request failed with {status}: {body}");
    }
    Ok(body)
}
