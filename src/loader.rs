//! Fetch and assemble the blocklist artifacts, then construct a
//! [`BlocklistFilter`] over them (component E).
use crate::bitvector::{words_to_bitstream_bytes, BitVector};
use crate::config::Config;
use crate::error::{BlocklistError, Result};
use crate::filter::BlocklistFilter;
use crate::manifest::Manifest;
use crate::trie::FrozenTrie;

/// Fetches the three artifacts for a given config and assembles a
/// [`BlocklistFilter`]. Holds an HTTP client so repeated builds (a forced
/// rebuild after a timestamp rotation) reuse connections.
pub struct BlocklistLoader {
    client: reqwest::Client,
}

impl Default for BlocklistLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BlocklistLoader {
    pub fn new() -> Self {
        BlocklistLoader {
            client: reqwest::Client::new(),
        }
    }

    /// Build a filter per 4.E: fetch `filetag.json`, `rd.txt`, and the
    /// (possibly multi-part) `td` blob concurrently, then construct the
    /// trie and wrap it with the manifest.
    pub async fn load(&self, config: &Config) -> Result<BlocklistFilter> {
        let base = config.base_url();
        log::debug!("blocklist build starting from {}", base);

        let (filetag, rd, td) = tokio::try_join!(
            self.fetch_text(&format!("{}/filetag.json", base)),
            self.fetch_bytes(&format!("{}/rd.txt", base)),
            self.fetch_td(&base, config.td_parts),
        )?;

        let manifest = Manifest::parse(&filetag)?;

        let td_len_bits = td.len() * 8;
        let bv = BitVector::from_parts(td, td_len_bits, &rd)?;

        let nodecount = config.td_nodecount;
        if nodecount == 0 {
            return Err(BlocklistError::assembly("tdNodecount must be set before building"));
        }
        let trie = FrozenTrie::new(bv, nodecount)?;

        log::debug!("blocklist build finished: {} nodes, {} lists", nodecount, manifest.len());
        Ok(BlocklistFilter::new(trie, manifest))
    }

    /// Fetch the `td` blob. Single-file (`tdParts <= -1`) is one request;
    /// the multi-part case fetches every `td{NN}.txt` part concurrently
    /// (§4.E step 2) and concatenates them in index order once all have
    /// landed, rather than waiting on each part before starting the next.
    async fn fetch_td(&self, base: &str, td_parts: i32) -> Result<Vec<u8>> {
        if td_parts <= -1 {
            let bytes = self.fetch_bytes(&format!("{}/td.txt", base)).await?;
            return Ok(words_to_bitstream_bytes(&bytes));
        }

        let handles: Vec<_> = (0..=td_parts)
            .map(|part| {
                let client = self.client.clone();
                let url = format!("{}/td{:02}.txt", base, part);
                tokio::spawn(async move { fetch_bytes(&client, &url).await })
            })
            .collect();

        let mut assembled = Vec::new();
        for handle in handles {
            let part = handle.await.map_err(|e| BlocklistError::assembly(e.to_string()))??;
            assembled.extend(part);
        }
        Ok(words_to_bitstream_bytes(&assembled))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        fetch_bytes(&self.client, url).await
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        check_status(url, &response)?;
        Ok(response.text().await?)
    }
}

/// Free function (not a method) so it can be moved into a spawned, `'static`
/// task for concurrent multi-part fetches without borrowing `&self`.
async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;
    check_status(url, &response)?;
    Ok(response.bytes().await?.to_vec())
}

fn check_status(url: &str, response: &reqwest::Response) -> Result<()> {
    if !response.status().is_success() {
        log::warn!("fetch of {} failed with status {}", url, response.status());
        return Err(BlocklistError::ArtifactFetch {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(())
}
