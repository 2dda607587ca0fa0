// # Cloudflare Record Store
//
// Implements the hostsync `RecordStore` boundary over the Cloudflare DNS
// API v4.
//
// ## Behavior
//
// - Zone auto-discovery by domain name, or an explicit zone ID
// - Paginated listing of A and AAAA records; other types are ignored
// - One batched change request per apply: creates, overwrites and
//   deletions travel together and land all-or-nothing
// - Specific error handling for HTTP status codes (401/403, 404, 429, 5xx)
// - HTTP timeout configured (30 seconds) so a stalled call cannot starve
//   the daemon's timer-driven trigger
// - Dry-run mode: performs all GET requests, logs the intended batch,
//   submits nothing
// - No retry or backoff logic: a failed call fails the cycle, and the
//   scheduler's next trigger is the retry
//
// ## Security
//
// The API token never appears in logs; the Debug implementation redacts
// it.
//
// ## API Reference
//
// - List zones:         GET  `/zones?name=...`
// - List DNS records:   GET  `/zones/:zone_id/dns_records?type=...&page=...`
// - Batch record edits: POST `/zones/:zone_id/dns_records/batch`

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hostsync_core::entry::{canonical_addr, canonical_hostname};
use hostsync_core::{ChangeSet, Error, HostEntry, RecordStore, Result};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records fetched per listing page
const LIST_PAGE_SIZE: u64 = 100;

/// The address record types this store manages
const ADDRESS_RECORD_TYPES: [&str; 2] = ["A", "AAAA"];

const STORE_NAME: &str = "cloudflare";

/// A zone record as listed by the API, before the uniqueness check
struct RawRecord {
    id: String,
    name: String,
    record_type: &'static str,
    addr: IpAddr,
}

/// Cloudflare record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true the store performs zone lookup and record
/// listing normally, logs the batch it would have submitted, and returns
/// success without modifying the zone.
pub struct CloudflareStore {
    /// Cloudflare API token. Never logged.
    api_token: String,

    /// Zone ID (optional, auto-discovered from the domain when absent)
    zone_id: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: read, log, never write
    dry_run: bool,
}

// The API token must not leak through Debug output
impl std::fmt::Debug for CloudflareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareStore")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareStore {
    /// Create a new Cloudflare record store.
    ///
    /// `api_token` needs Zone:DNS:Edit permissions and must not be empty.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::store(STORE_NAME, format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            zone_id,
            client,
            dry_run,
        })
    }

    /// Convenience constructor for live mode
    pub fn new_live(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        Self::new(api_token, zone_id, false)
    }

    /// Convenience constructor for dry-run mode
    pub fn new_dry_run(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        Self::new(api_token, zone_id, true)
    }

    /// Resolve the zone ID for `domain`.
    ///
    /// Uses the pre-configured ID when present; otherwise lists zones by
    /// name and requires an exact match, like the zone lookup in any
    /// other provider: a near-miss (parent zone, different zone) is a
    /// lookup failure, not a fallback.
    async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            debug!("using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let url = format!("{CLOUDFLARE_API_BASE}/zones?name={domain}");
        let json = self.get_json(&url, "zone lookup").await?;

        let zones = json["result"].as_array().ok_or_else(|| {
            Error::store(STORE_NAME, "invalid response format: result is not an array")
        })?;

        let zone = zones
            .first()
            .ok_or_else(|| Error::not_found(format!("could not find domain '{domain}'")))?;

        if zone["name"].as_str() != Some(domain) {
            return Err(Error::not_found(format!("could not find domain '{domain}'")));
        }

        let zone_id = zone["id"].as_str().ok_or_else(|| {
            Error::store(STORE_NAME, "invalid response format: zone.id is not a string")
        })?;

        debug!("found zone ID: {}", zone_id);
        Ok(zone_id.to_string())
    }

    /// List the zone's address records across both types and all pages.
    ///
    /// Records whose content doesn't parse as an address are skipped with
    /// a warning; they never fail the fetch.
    async fn list_address_records(&self, zone_id: &str) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();

        for record_type in ADDRESS_RECORD_TYPES {
            let mut page = 1u64;
            loop {
                let url = format!(
                    "{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records\
                     ?type={record_type}&per_page={LIST_PAGE_SIZE}&page={page}"
                );
                let json = self.get_json(&url, "record listing").await?;

                let result = json["result"].as_array().ok_or_else(|| {
                    Error::store(STORE_NAME, "invalid response format: result is not an array")
                })?;

                for rec in result {
                    let (Some(id), Some(name), Some(content)) = (
                        rec["id"].as_str(),
                        rec["name"].as_str(),
                        rec["content"].as_str(),
                    ) else {
                        warn!("record with missing fields in listing, ignoring");
                        continue;
                    };

                    match content.parse::<IpAddr>() {
                        Ok(addr) => records.push(RawRecord {
                            id: id.to_string(),
                            name: canonical_hostname(name),
                            record_type,
                            addr: canonical_addr(addr),
                        }),
                        Err(_) => {
                            warn!("cannot parse IP {} for {}, ignoring record", content, name);
                        }
                    }
                }

                let total_pages = json["result_info"]["total_pages"].as_u64().unwrap_or(1);
                if page >= total_pages {
                    break;
                }
                page += 1;
            }
        }

        Ok(records)
    }

    /// GET a URL and parse the JSON body, mapping HTTP failures to errors
    async fn get_json(&self, url: &str, context: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::store(STORE_NAME, format!("{context}: HTTP request failed: {e}")))?;

        Self::read_json(response, context).await
    }

    /// Check the response status and parse the JSON body
    async fn read_json(response: reqwest::Response, context: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(map_status_error(status, &body, context));
        }

        response
            .json()
            .await
            .map_err(|e| Error::store(STORE_NAME, format!("{context}: failed to parse response: {e}")))
    }
}

/// Map an unsuccessful HTTP status to a store error
fn map_status_error(status: reqwest::StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::store(
            STORE_NAME,
            format!("{context}: authentication failed or insufficient permissions ({status})"),
        ),
        404 => Error::not_found(format!("{context}: {status} - {body}")),
        429 => Error::store(
            STORE_NAME,
            format!("{context}: rate limit exceeded ({status})"),
        ),
        500..=599 => Error::store(
            STORE_NAME,
            format!("{context}: server error (transient): {status} - {body}"),
        ),
        _ => Error::store(STORE_NAME, format!("{context}: {status} - {body}")),
    }
}

/// The record type a given address belongs under
fn record_type_for(addr: IpAddr) -> &'static str {
    match addr {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

/// Build the batch request body for a change set.
///
/// Upserts become `puts` (overwrite by record ID) when the name+type
/// already exists and `posts` (create) otherwise. Deletes resolve to
/// record IDs through `index`; an entry that has disappeared remotely
/// since the diff is skipped with a warning rather than failing the
/// batch.
fn build_batch(
    changes: &ChangeSet,
    ttl: u32,
    index: &HashMap<(String, String), String>,
) -> Value {
    let mut posts = Vec::new();
    let mut puts = Vec::new();
    let mut deletes = Vec::new();

    for h in &changes.to_upsert {
        let record_type = record_type_for(h.addr);
        let mut record = json!({
            "name": h.hostname,
            "type": record_type,
            "content": h.addr.to_string(),
            "ttl": ttl,
        });
        match index.get(&(h.hostname.clone(), record_type.to_string())) {
            Some(id) => {
                record["id"] = json!(id);
                puts.push(record);
            }
            None => posts.push(record),
        }
    }

    for h in &changes.to_delete {
        let record_type = record_type_for(h.addr);
        match index.get(&(h.hostname.clone(), record_type.to_string())) {
            Some(id) => deletes.push(json!({ "id": id })),
            None => warn!("{} not found remotely, skipping delete", h.hostname),
        }
    }

    json!({
        "posts": posts,
        "puts": puts,
        "deletes": deletes,
    })
}

#[async_trait]
impl RecordStore for CloudflareStore {
    async fn fetch(&self, domain: &str) -> Result<Vec<HostEntry>> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let raw = self.list_address_records(&zone_id).await?;

        // Enforce hostname uniqueness across the fetched set: a name
        // carrying more than one address value cannot be diffed by name
        // and is rejected rather than merged.
        let mut by_name: BTreeMap<String, Vec<IpAddr>> = BTreeMap::new();
        for rec in raw {
            by_name.entry(rec.name).or_default().push(rec.addr);
        }

        let mut entries = Vec::with_capacity(by_name.len());
        for (name, addrs) in by_name {
            if addrs.len() > 1 {
                warn!(
                    "{} has too many address records ({}), ignoring record",
                    name,
                    addrs.len()
                );
                continue;
            }
            entries.push(HostEntry::new(&name, addrs[0]));
        }

        Ok(entries)
    }

    async fn apply(&self, domain: &str, ttl: u32, changes: &ChangeSet, wait: bool) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let zone_id = self.resolve_zone_id(domain).await?;

        // Re-list to resolve record IDs immediately before the batch
        let current = self.list_address_records(&zone_id).await?;
        let index: HashMap<(String, String), String> = current
            .into_iter()
            .map(|r| ((r.name, r.record_type.to_string()), r.id))
            .collect();

        let body = build_batch(changes, ttl, &index);

        if self.dry_run {
            info!("[DRY-RUN] would submit batch for zone {}: {}", zone_id, body);
            return Ok(());
        }

        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records/batch");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::store(STORE_NAME, format!("batch change: HTTP request failed: {e}"))
            })?;

        let _ = Self::read_json(response, "batch change").await?;

        info!(
            "submitted batch: {} upserts, {} deletes",
            changes.to_upsert.len(),
            changes.to_delete.len()
        );

        // The batch endpoint applies changes before responding, so there
        // is no pending state left to poll for.
        if !wait {
            debug!("not waiting for batch settlement (batch responses are synchronous)");
        }

        Ok(())
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}
