//! Command-line desktop client for the ChemViz analytics backend.
//!
//! Mirrors the dashboard workflow: obtain a bearer token, upload a telemetry
//! CSV, inspect the bounded upload history, and download the PDF report.
//! Chart output is optional; built with `--features chart` the upload
//! command can render the equipment distribution as a pie-chart PNG.
//!
//! # Environment Variables
//! - `CHEMVIZ_BASE_URL` (optional) – API base (default: `http://127.0.0.1:8000/api`)
//! - `CHEMVIZ_USERNAME` / `CHEMVIZ_PASSWORD` (**required**) – operator credentials

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::multipart;
use serde::Deserialize;

// ---

const USAGE: &str = "usage: chemviz-client <command>\n\
  login                                verify the configured credentials\n\
  upload <file.csv> [--chart out.png]  upload telemetry and print the summary\n\
  history                              list the stored upload summaries\n\
  report [out.pdf]                     download the PDF report";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
}

/// Upload summary as returned by the backend. Averages are `null` on the
/// wire when an upload had nothing to average.
#[derive(Debug, Deserialize)]
struct UploadSummary {
    message: String,
    total_equipment: i64,
    avg_flowrate: Option<f64>,
    avg_pressure: Option<f64>,
    avg_temperature: Option<f64>,
    #[serde(default)]
    equipment_distribution: HashMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    uploaded_at: DateTime<Utc>,
    total_equipment: i64,
    avg_flowrate: Option<f64>,
    avg_pressure: Option<f64>,
    avg_temperature: Option<f64>,
}

struct ClientConfig {
    base_url: String,
    username: String,
    password: String,
}

fn load_config() -> Result<ClientConfig> {
    // ---
    Ok(ClientConfig {
        base_url: env::var("CHEMVIZ_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string()),
        username: env::var("CHEMVIZ_USERNAME")
            .map_err(|_| anyhow!("CHEMVIZ_USERNAME must be set"))?,
        password: env::var("CHEMVIZ_PASSWORD")
            .map_err(|_| anyhow!("CHEMVIZ_PASSWORD must be set"))?,
    })
}

// ---

#[tokio::main]
async fn main() -> ExitCode {
    // ---
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // transport and server failures surface as log lines, not panics
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<()> {
    // ---
    match args.first().map(String::as_str) {
        Some("login") => {
            let (client, cfg) = setup()?;
            login(&client, &cfg).await?;
            println!("Login successful");
            Ok(())
        }
        Some("upload") => {
            let path = args
                .get(1)
                .ok_or_else(|| anyhow!("upload needs a file\n{USAGE}"))?;
            let chart = match args.get(2).map(String::as_str) {
                Some("--chart") => Some(
                    args.get(3)
                        .map(String::as_str)
                        .unwrap_or("equipment_distribution.png"),
                ),
                Some(other) => bail!("unknown option '{other}'\n{USAGE}"),
                None => None,
            };
            let (client, cfg) = setup()?;
            upload(&client, &cfg, Path::new(path), chart.map(Path::new)).await
        }
        Some("history") => {
            let (client, cfg) = setup()?;
            history(&client, &cfg).await
        }
        Some("report") => {
            let out = args.get(1).map(String::as_str).unwrap_or("report.pdf");
            let (client, cfg) = setup()?;
            report(&client, &cfg, Path::new(out)).await
        }
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
        None => {
            eprintln!("{USAGE}");
            Ok(())
        }
    }
}

fn setup() -> Result<(reqwest::Client, ClientConfig)> {
    Ok((reqwest::Client::new(), load_config()?))
}

// ---

async fn login(client: &reqwest::Client, cfg: &ClientConfig) -> Result<String> {
    // ---
    let res = client
        .post(format!("{}/token/", cfg.base_url))
        .json(&serde_json::json!({
            "username": cfg.username,
            "password": cfg.password,
        }))
        .send()
        .await
        .context("token request failed")?;

    if !res.status().is_success() {
        bail!("login failed: {}", res.text().await.unwrap_or_default());
    }

    let token: TokenResponse = res.json().await.context("malformed token response")?;
    Ok(token.access)
}

async fn upload(
    client: &reqwest::Client,
    cfg: &ClientConfig,
    path: &Path,
    chart_out: Option<&Path>,
) -> Result<()> {
    // ---
    let token = login(client, cfg).await?;

    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.csv")
        .to_string();
    let part = multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/csv")
        .context("failed to build multipart body")?;
    let form = multipart::Form::new().part("file", part);

    println!("Uploading {}...", path.display());
    let res = client
        .post(format!("{}/upload/", cfg.base_url))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .context("upload request failed")?;

    if !res.status().is_success() {
        bail!("upload rejected: {}", res.text().await.unwrap_or_default());
    }

    let summary: UploadSummary = res.json().await.context("malformed upload response")?;
    println!("{}", summary.message);
    println!("  Total equipment    : {}", summary.total_equipment);
    println!("  Average flowrate   : {}", fmt_avg(summary.avg_flowrate));
    println!("  Average pressure   : {}", fmt_avg(summary.avg_pressure));
    println!("  Average temperature: {}", fmt_avg(summary.avg_temperature));

    let dist = sorted_distribution(summary.equipment_distribution);
    if dist.is_empty() {
        println!("  No equipment data");
    } else {
        println!("  Equipment distribution:");
        for (label, count) in &dist {
            println!("    {label}: {count}");
        }
    }

    if let Some(out) = chart_out {
        render_pie(&dist, out)?;
        println!("Saved distribution chart to {}", out.display());
    }

    Ok(())
}

async fn history(client: &reqwest::Client, cfg: &ClientConfig) -> Result<()> {
    // ---
    let token = login(client, cfg).await?;

    let res = client
        .get(format!("{}/history/", cfg.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .context("history request failed")?;

    if !res.status().is_success() {
        bail!(
            "history unavailable: {}",
            res.text().await.unwrap_or_default()
        );
    }

    let entries: Vec<HistoryEntry> = res.json().await.context("malformed history response")?;
    if entries.is_empty() {
        println!("No uploads recorded yet");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  rows={:<6} flow={:<8} pressure={:<8} temp={}",
            entry.uploaded_at,
            entry.total_equipment,
            fmt_avg(entry.avg_flowrate),
            fmt_avg(entry.avg_pressure),
            fmt_avg(entry.avg_temperature),
        );
    }

    Ok(())
}

async fn report(client: &reqwest::Client, cfg: &ClientConfig, out: &Path) -> Result<()> {
    // ---
    let token = login(client, cfg).await?;

    let res = client
        .get(format!("{}/report/", cfg.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .context("report request failed")?;

    if !res.status().is_success() {
        bail!(
            "report unavailable: {}",
            res.text().await.unwrap_or_default()
        );
    }

    let bytes = res.bytes().await.context("failed to read report body")?;
    std::fs::write(out, &bytes).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Saved {} ({} bytes)", out.display(), bytes.len());

    Ok(())
}

// ---

fn fmt_avg(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

/// Order the distribution by descending count for display; the wire format
/// is a plain JSON object, so the client re-sorts (label as tie-break).
fn sorted_distribution(distribution: HashMap<String, u64>) -> Vec<(String, u64)> {
    // ---
    let mut pairs: Vec<(String, u64)> = distribution.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

#[cfg(feature = "chart")]
fn render_pie(dist: &[(String, u64)], out: &Path) -> Result<()> {
    // ---
    use plotters::prelude::*;

    if dist.is_empty() {
        bail!("nothing to chart: upload carried no equipment data");
    }

    let root = BitMapBackend::new(out, (640, 480)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("chart rendering failed: {e}"))?;

    let sizes: Vec<f64> = dist.iter().map(|(_, count)| *count as f64).collect();
    let labels: Vec<String> = dist.iter().map(|(label, _)| label.clone()).collect();
    let palette = [
        RGBColor(100, 108, 255),
        RGBColor(83, 91, 242),
        RGBColor(116, 123, 255),
        RGBColor(153, 153, 255),
        RGBColor(68, 68, 170),
    ];
    let colors: Vec<RGBColor> = (0..dist.len()).map(|i| palette[i % palette.len()]).collect();

    let center = (320, 240);
    let radius = 180.0;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 18).into_font());
    root.draw(&pie)
        .map_err(|e| anyhow!("chart rendering failed: {e}"))?;
    root.present()
        .map_err(|e| anyhow!("chart rendering failed: {e}"))?;

    Ok(())
}

#[cfg(not(feature = "chart"))]
fn render_pie(_dist: &[(String, u64)], _out: &Path) -> Result<()> {
    bail!("this build has no chart support; rebuild with --features chart")
}
