use std::path::PathBuf;

use rst_common::with_logging::log::{debug, warn};
use rst_common::with_tokio::tokio;

use crate::collaborators::TailsFetcherBuilder;
use crate::errors::AgentError;

use super::tails;

/// TailsCache fetches tails files by location and keeps verified copies on disk
///
/// Files are stored as `<download_dir>/<tails_hash>`. A cached file is re-checked
/// on every read and fetched again when it no longer matches.
#[derive(Clone)]
pub struct TailsCache<TFetcher>
where
    TFetcher: TailsFetcherBuilder,
{
    fetcher: TFetcher,
    download_dir: PathBuf,
}

impl<TFetcher> TailsCache<TFetcher>
where
    TFetcher: TailsFetcherBuilder,
{
    pub fn new(fetcher: TFetcher, download_dir: PathBuf) -> Self {
        Self {
            fetcher,
            download_dir,
        }
    }

    pub fn path_for(&self, tails_hash: &str) -> PathBuf {
        self.download_dir.join(tails_hash)
    }

    pub async fn fetch(&self, location: &str, tails_hash: &str) -> Result<Vec<u8>, AgentError> {
        let path = self.path_for(tails_hash);
        if let Ok(cached) = tokio::fs::read(&path).await {
            if tails::verify_tails(&cached, tails_hash).is_ok() {
                debug!("[tails] cache hit: {}", path.display());
                return Ok(cached);
            }

            warn!("[tails] cached file is corrupted: {}", path.display());
        }

        let fetched = self.fetcher.fetch(location.to_string()).await?;
        tails::verify_tails(&fetched, tails_hash)?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        tokio::fs::write(&path, &fetched).await?;
        debug!("[tails] stored {} from {}", path.display(), location);

        Ok(fetched)
    }
}
