use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{
    api::INVOICES_PATH, ApproveRequest, ApproveResponse, KeySpace, PendingInvoice,
    RangePartition, TaskDescriptor, UploadResponse, HEX_ALPHABET,
};
use reqwest::Client;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI para planificar el reparto y hablar con el servicio de intake")]
struct Cli {
    /// - En Docker: INTAKE_URL=http://intake:8080
    /// - Local: default http://localhost:8080
    #[arg(long, env = "INTAKE_URL", default_value = "http://localhost:8080", global = true)]
    intake_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Muestra qué caracteres iniciales procesa cada tarea
    Plan {
        #[arg(long)]
        count: u32,
        #[arg(long, default_value = HEX_ALPHABET)]
        alphabet: String,
    },
    /// Muestra el tramo de líneas de cada tarea
    Ranges {
        #[arg(long)]
        lines: usize,
        #[arg(long)]
        count: u32,
    },
    /// Sube facturas a incoming/
    Upload {
        #[arg(value_name = "ARCHIVOS", required = true)]
        files: Vec<PathBuf>,
    },
    /// Lista las facturas procesadas pendientes de aprobación
    Review,
    /// Aprueba facturas por nombre
    Approve {
        #[arg(value_name = "NOMBRES", required = true)]
        names: Vec<String>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.intake_url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Plan { count, alphabet } => {
            for line in plan_lines(&alphabet, count)? {
                println!("{line}");
            }
        }

        Commands::Ranges { lines, count } => {
            for line in range_lines(lines, count)? {
                println!("{line}");
            }
        }

        Commands::Upload { files } => {
            for path in files {
                let uploaded = upload(&client, &base_url, &path).await?;
                println!("{} -> {}", path.display(), uploaded.key);
            }
        }

        Commands::Review => {
            let pending = review(&client, &base_url).await?;
            if pending.is_empty() {
                println!("No hay facturas pendientes de aprobación.");
            }
            for p in pending {
                println!("Factura {}", p.record.blob_name);
                println!("  procesada : {}", p.record.processed_at);
                println!("  intento   : {}", p.record.attempt);
                println!("  documento : {}{}", base_url, p.document);
                for (k, v) in &p.record.fields {
                    println!("  {k:<20}: {v}");
                }
                println!();
            }
        }

        Commands::Approve { names } => {
            let resp = approve(&client, &base_url, names).await?;
            for name in &resp.approved {
                println!("aprobada: {name}");
            }
            for name in &resp.missing {
                println!("sin resultado: {name}");
            }
        }
    }

    Ok(())
}

fn plan_lines(alphabet: &str, count: u32) -> Result<Vec<String>> {
    let key_space = KeySpace::new(alphabet)?;
    if count == 0 {
        bail!("--count debe ser al menos 1");
    }

    Ok(key_space
        .plan(count)
        .into_iter()
        .enumerate()
        .map(|(i, chars)| {
            if chars.is_empty() {
                format!("tarea {i}: (nada)")
            } else {
                format!("tarea {i}: {chars}")
            }
        })
        .collect())
}

fn range_lines(lines: usize, count: u32) -> Result<Vec<String>> {
    (0..count)
        .map(|i| -> Result<String> {
            let task = TaskDescriptor::new(i, count, 0)?;
            let range = RangePartition::for_task(lines, &task);
            Ok(format!("tarea {i}: {range} ({} líneas)", range.len()))
        })
        .collect()
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "image/jpeg"
        }
        _ => "application/octet-stream",
    }
}

async fn upload(client: &Client, base_url: &str, path: &Path) -> Result<UploadResponse> {
    let body = tokio::fs::read(path)
        .await
        .with_context(|| format!("no se pudo leer {}", path.display()))?;

    let resp = client
        .post(format!("{base_url}{INVOICES_PATH}"))
        .header(reqwest::header::CONTENT_TYPE, content_type_for(path))
        .body(body)
        .send()
        .await?;

    if !resp.status().is_success() {
        bail!("intake rechazó {} (status {})", path.display(), resp.status());
    }
    Ok(resp.json().await?)
}

async fn review(client: &Client, base_url: &str) -> Result<Vec<PendingInvoice>> {
    let resp = client
        .get(format!("{base_url}{INVOICES_PATH}"))
        .send()
        .await?;

    if !resp.status().is_success() {
        bail!("error consultando {INVOICES_PATH} (status {})", resp.status());
    }
    Ok(resp.json().await?)
}

async fn approve(client: &Client, base_url: &str, names: Vec<String>) -> Result<ApproveResponse> {
    let resp = client
        .post(format!("{base_url}{INVOICES_PATH}/approve"))
        .json(&ApproveRequest { names })
        .send()
        .await?;

    if !resp.status().is_success() {
        bail!("error aprobando facturas (status {})", resp.status());
    }
    Ok(resp.json().await?)
}
