use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, str::FromStr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo_url: String,
    pub object_store: ObjectStoreConfig,
    pub max_upload_bytes: usize,
}

/// Connection settings for the S3-compatible attachment store.
#[derive(Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Apply a public-read policy to the bucket at every startup.
    pub public_read: bool,
}

impl fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("public_read", &self.public_read)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Notes with image attachments over MongoDB and MinIO")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// MongoDB connection string (overrides MONGO_URL)
    #[arg(long)]
    pub mongo_url: Option<String>,

    /// Object store host (overrides MINIO_HOST)
    #[arg(long)]
    pub minio_host: Option<String>,

    /// Object store port (overrides MINIO_PORT)
    #[arg(long)]
    pub minio_port: Option<u16>,

    /// Make the attachment bucket publicly readable
    #[arg(long)]
    pub public_bucket: bool,

    /// Largest accepted request body in bytes (overrides MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_sources(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge parsed CLI args over values looked up through `lookup`.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Environment fallback ---
        let env_host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "PORT", 3000u16)?;
        let env_mongo =
            lookup("MONGO_URL").unwrap_or_else(|| "mongodb://localhost:27017/dev".into());
        let env_minio_host = lookup("MINIO_HOST").unwrap_or_else(|| "localhost".into());
        let env_minio_port = parse_var(&lookup, "MINIO_PORT", 9000u16)?;
        let env_public = parse_var(&lookup, "MINIO_PUBLIC_BUCKET", false)?;
        let env_max_upload = parse_var(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // --- Merge ---
        let minio_host = args.minio_host.unwrap_or(env_minio_host);
        let minio_port = args.minio_port.unwrap_or(env_minio_port);

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            mongo_url: args.mongo_url.unwrap_or(env_mongo),
            object_store: ObjectStoreConfig {
                endpoint: format!("http://{}:{}", minio_host, minio_port),
                region: lookup("MINIO_REGION").unwrap_or_else(|| "us-east-1".into()),
                access_key: lookup("MINIO_ACCESS_KEY").unwrap_or_default(),
                secret_key: lookup("MINIO_SECRET_KEY").unwrap_or_default(),
                public_read: args.public_bucket || env_public,
            },
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}
