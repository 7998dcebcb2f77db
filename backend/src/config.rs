//! Command-line and environment configuration.
//!
//! Every option can also come from the environment, so the server can be
//! configured from a service unit without a wrapper script.

use crate::extraction::cache::CachingExtractor;
use crate::extraction::document_ai::{DocumentAiClient, DocumentAiConfig};
use crate::extraction::{ExtractionError, ExtractionService};
use crate::inventory::catalog::{CatalogError, CategoryCatalog};
use crate::inventory::tree::FsDirectoryTree;
use crate::inventory::{Inventory, ScanOptions};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("--max-concurrent must be at least 1")]
    ZeroConcurrency,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("cannot build extraction client: {0}")]
    Client(#[from] ExtractionError),
}

#[derive(Parser, Debug)]
#[command(
    name = "cert_inventory",
    about = "Inventories product certificate folders and extracts validity dates"
)]
pub struct Cli {
    /// TOML catalog of categories; the built-in certificate catalog otherwise
    #[arg(long, env = "CERT_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    #[command(flatten)]
    pub extraction: ExtractionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a root directory once and write the CSV report
    Scan {
        /// Directory whose subdirectories are the products
        root: PathBuf,

        /// Where to write the report
        #[arg(short, long, default_value = "pdf_info.csv")]
        output: PathBuf,
    },
    /// Serve the scan API over HTTP
    Serve {
        #[arg(long, env = "CERT_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "CERT_PORT", default_value_t = 8080)]
        port: u16,

        /// Directory for per-job CSV reports
        #[arg(long, env = "CERT_OUTPUT_DIR", default_value = "./reports")]
        output_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ExtractionArgs {
    #[arg(long, env = "DOCUMENTAI_PROJECT_ID", global = true)]
    pub project_id: Option<String>,

    #[arg(long, env = "DOCUMENTAI_LOCATION", default_value = "eu", global = true)]
    pub location: String,

    #[arg(long, env = "DOCUMENTAI_PROCESSOR_ID", global = true)]
    pub processor_id: Option<String>,

    #[arg(long, env = "DOCUMENTAI_PROCESSOR_VERSION", global = true)]
    pub processor_version: Option<String>,

    /// Base URL replacing the regional Document AI host
    #[arg(long, env = "DOCUMENTAI_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    #[arg(long, env = "DOCUMENTAI_API_VERSION", default_value = "v1", global = true)]
    pub api_version: String,

    /// Static bearer token; application default credentials otherwise
    #[arg(long, env = "DOCUMENTAI_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Per-document extraction timeout
    #[arg(long, env = "EXTRACTION_TIMEOUT_SECS", default_value_t = 120, global = true)]
    pub timeout_secs: u64,

    /// Extraction calls allowed in flight at once
    #[arg(long, env = "EXTRACTION_MAX_CONCURRENT", default_value_t = 4, global = true)]
    pub max_concurrent: usize,

    #[arg(long, default_value = "application/pdf", global = true)]
    pub mime_type: String,
}

impl ExtractionArgs {
    pub fn document_ai(&self) -> Result<DocumentAiConfig, ConfigError> {
        let project_id = self
            .project_id
            .clone()
            .ok_or(ConfigError::Missing("--project-id / DOCUMENTAI_PROJECT_ID"))?;
        let processor_id = self
            .processor_id
            .clone()
            .ok_or(ConfigError::Missing("--processor-id / DOCUMENTAI_PROCESSOR_ID"))?;
        Ok(DocumentAiConfig {
            project_id,
            location: self.location.clone(),
            processor_id,
            processor_version: self.processor_version.clone(),
            endpoint: self.endpoint.clone(),
            api_version: self.api_version.clone(),
            access_token: self.access_token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    pub fn scan_options(&self) -> Result<ScanOptions, ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(ScanOptions {
            max_concurrent_extractions: self.max_concurrent,
            mime_type: self.mime_type.clone(),
        })
    }
}

impl Cli {
    pub fn load_catalog(&self) -> Result<CategoryCatalog, ConfigError> {
        Ok(match &self.catalog {
            Some(path) => CategoryCatalog::load(path)?,
            None => CategoryCatalog::standard()?,
        })
    }

    /// Builds the pipeline. `cached` wraps the client in a result cache for
    /// processes that scan the same folders repeatedly.
    pub fn inventory(&self, cached: bool) -> Result<Inventory, ConfigError> {
        let catalog = Arc::new(self.load_catalog()?);
        let options = self.extraction.scan_options()?;
        let client = DocumentAiClient::new(self.extraction.document_ai()?)?;
        let extractor: Arc<dyn ExtractionService> = if cached {
            Arc::new(CachingExtractor::new(client))
        } else {
            Arc::new(client)
        };
        Ok(Inventory::new(
            catalog,
            Arc::new(FsDirectoryTree),
            extractor,
            options,
        ))
    }
}
