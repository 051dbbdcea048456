/// Worker configuration loaded from environment variables.
///
/// Connection strings are required; tuning knobs have defaults suitable
/// for local development and can be overridden per deployment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string (required).
    pub database_url: String,
    /// Base URL of the remote comparison service (required).
    pub compare_api_url: String,
    /// Maximum number of tasks processed concurrently (default: `4`).
    pub concurrency: u32,
    /// TTL in seconds requested for resolved document URLs
    /// (default: `600`).
    pub url_ttl_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var              | Default    |
    /// |----------------------|------------|
    /// | `DATABASE_URL`       | (required) |
    /// | `COMPARE_API_URL`    | (required) |
    /// | `WORKER_CONCURRENCY` | `4`        |
    /// | `BLOB_URL_TTL_SECS`  | `600`      |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let compare_api_url =
            std::env::var("COMPARE_API_URL").expect("COMPARE_API_URL must be set");

        let concurrency: u32 = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid u32");
        assert!(concurrency > 0, "WORKER_CONCURRENCY must be at least 1");

        let url_ttl_secs: u64 = std::env::var("BLOB_URL_TTL_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("BLOB_URL_TTL_SECS must be a valid u64");

        Self {
            database_url,
            compare_api_url,
            concurrency,
            url_ttl_secs,
        }
    }
}
