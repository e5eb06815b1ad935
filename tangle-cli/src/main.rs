//! tangle-cli — terminal frontend for the Tangle thought-graph API
//!
//! # Subcommands
//! - `graph <text> [--json]` — send text to `POST /api/graph` and print the graph
//! - `status`                — show server health and provider
//! - `normalize [FILE]`      — recover JSON from raw model output locally (stdin if no FILE)

use std::io::Read;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tangle_core::GraphResult;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5050";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "tangle-cli",
    version,
    about = "Turn free-form text into a thought graph"
)]
struct Cli {
    /// Tangle HTTP server URL (overrides TANGLE_HTTP_URL env var)
    #[arg(long, env = "TANGLE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build a thought graph from text
    Graph {
        /// Text to map
        text: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show Tangle server status
    Status,

    /// Recover JSON from raw model output without contacting the server
    Normalize {
        /// File containing model output (reads stdin when omitted)
        file: Option<String>,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

/// Error body returned by the server for every non-200 response
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Output formatting
// ============================================================================

/// Human-readable rendering of a graph: nodes, then edges, then insights.
pub fn render_graph(graph: &GraphResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("Nodes ({}):\n", graph.nodes.len()));
    for n in &graph.nodes {
        match &n.category {
            Some(c) => {
                let category = serde_json::to_value(c)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                out.push_str(&format!("  {} [{}] ({})\n", n.label, n.id, category));
            }
            None => out.push_str(&format!("  {} [{}]\n", n.label, n.id)),
        }
    }

    out.push_str(&format!("\nEdges ({}):\n", graph.edges.len()));
    for e in &graph.edges {
        out.push_str(&format!(
            "  {} --{}--> {} ({:.2})\n",
            e.from, e.relation, e.to, e.weight
        ));
    }

    if !graph.insights.is_empty() {
        out.push_str("\nInsights:\n");
        for i in &graph.insights {
            out.push_str(&format!("  - {}\n", i));
        }
    }

    out
}

// ============================================================================
// Commands
// ============================================================================

/// Send text to POST /api/graph and print the result.
fn do_graph(server: &str, text: &str, json_output: bool) -> anyhow::Result<()> {
    // Provider calls are bounded server-side; leave headroom on top of that.
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;

    let url = format!("{}/api/graph", server);
    let resp = match client
        .post(&url)
        .json(&serde_json::json!({ "text": text }))
        .send()
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("tangle-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        eprintln!("tangle-cli: server returned {}: {}", status, message);
        std::process::exit(1);
    }

    let value: serde_json::Value = resp.json().context("failed to parse graph response")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match serde_json::from_value::<GraphResult>(value.clone()) {
        Ok(graph) => print!("{}", render_graph(&graph)),
        // Off-schema model output: show it as-is rather than failing
        Err(_) => println!("{}", serde_json::to_string_pretty(&value)?),
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Tangle server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Provider:      {}", body["provider"].as_str().unwrap_or("?"));
            println!("Model:         {}", body["model"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("tangle-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("tangle-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Run the normalizer over a file or stdin and print the recovered JSON.
fn do_normalize(file: Option<&str>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read stdin")?;
            buf
        }
    };

    match tangle_core::normalize(&raw) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("tangle-cli: {}", e);
            if let Some(candidate) = e.candidate() {
                eprintln!("--- candidate ---\n{}", candidate);
            }
            std::process::exit(1);
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Graph { text, json } => do_graph(&server, &text, json),
        Commands::Status => do_status(&server),
        Commands::Normalize { file } => do_normalize(file.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("tangle-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
