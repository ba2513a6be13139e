use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use multipart_composer::{
    Body, ComposerConfig, FilePart, MultipartClient, MultipartComposer, Part, StringPart,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: multipart-composer [--boundary TOKEN] name=value name=@path ...";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut config = ComposerConfig::from_env()?;
    let mut parts = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--boundary" {
            config.boundary = Some(args.next().context("--boundary needs a value")?);
            continue;
        }
        parts.push(parse_field(&arg)?);
    }
    if parts.is_empty() {
        bail!(USAGE);
    }

    let composer = MultipartComposer::with_config(parts, &config)?;

    match std::env::var("MULTIPART_UPLOAD_URL") {
        Ok(url) => {
            let client = MultipartClient::with_config(config);
            let response = client.post(&url, composer).await?;
            println!("Status: {}", response.status());
            println!("{}", response.text().await?);
        }
        Err(_) => {
            eprintln!("Content-Type: {}", composer.content_type());
            eprintln!("Content-Length: {}", composer.content_length()?);

            let mut reader = composer.into_reader();
            let mut stdout = io::stdout().lock();
            io::copy(&mut reader, &mut stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Parses `name=value` into a string part and `name=@path` into a file part.
fn parse_field(arg: &str) -> Result<Part> {
    let (name, value) = arg
        .split_once('=')
        .with_context(|| format!("expected name=value or name=@path, got '{}'", arg))?;

    Ok(match value.strip_prefix('@') {
        Some(path) => FilePart::new(name, path).with_guessed_content_type().into(),
        None => StringPart::new(name, value)?.into(),
    })
}
