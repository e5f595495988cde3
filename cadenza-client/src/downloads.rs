//! Clip download endpoints

use cadenza_core::dto::provider::DownloadLink;

use crate::ProviderClient;
use crate::error::Result;
use crate::wire;

impl ProviderClient {
    /// Resolve the WAV download link of a finished clip
    ///
    /// # Arguments
    /// * `clip_id` - Provider clip id from a completed job's result
    pub async fn get_download_link(&self, clip_id: &str) -> Result<DownloadLink> {
        let url = format!("{}/suno/act/wav/{}", self.base_url, clip_id);
        let value = self.send_json(self.client.get(&url)).await?;
        wire::parse_download_response(clip_id, value)
    }
}
