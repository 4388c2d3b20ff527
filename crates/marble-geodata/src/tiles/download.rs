//! Queued HTTP downloads of tiles
//!
//! # Architecture
//!
//! - **[`DownloadQueueSet`]**: per policy a LIFO stack of waiting jobs, the set of active jobs, a
//!   retry queue and a blacklist of urls that failed too often
//! - **[`HttpDownloadManager`]**: routes jobs to queue sets by host and [`DownloadUsage`], runs
//!   them as tokio tasks through a [`TileFetcher`], and turns the results that come back over an
//!   mpsc channel into [`DownloadEvent`]s on the owning thread
//! - **[`StoragePolicy`]**: where finished downloads are written
//!
//! Nothing is shared between the owning thread and the tasks except the channel.

use reqwest::Url;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Delay before failed jobs are queued again
pub const REQUEUE_INTERVAL: Duration = Duration::from_secs(60);
/// Retries granted to a job before its url is blacklisted
pub const MAX_RETRIES: u8 = 3;

const BROWSE_CONNECTIONS: usize = 20;
const BULK_CONNECTIONS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {0}")]
    Status(reqwest::StatusCode),

    #[error("Download failed: {0}")]
    Other(String),
}

/// Why a tile is requested; decides which queue serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadUsage {
    /// Interactive viewing
    Browse,
    /// Region downloads and other background prefetching
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPolicyKey {
    pub hosts: Vec<String>,
    pub usage: DownloadUsage,
}

impl DownloadPolicyKey {
    pub fn matches(&self, host: &str, usage: DownloadUsage) -> bool {
        self.usage == usage && self.hosts.iter().any(|h| h == host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPolicy {
    pub key: DownloadPolicyKey,
    pub maximum_connections: usize,
}

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, DownloadError>> + Send>>;

/// Fetches the body of a url
pub trait TileFetcher: Send + Sync + 'static {
    fn fetch(&self, url: Url) -> FetchFuture;
}

/// [`TileFetcher`] over a shared reqwest client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { client })
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: Url) -> FetchFuture {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(DownloadError::Status(response.status()));
            }
            Ok(response.bytes().await?.to_vec())
        })
    }
}

/// Where finished downloads end up
pub trait StoragePolicy: Send {
    /// Store `data` under `file_name` (relative to the storage root)
    fn update_file(&mut self, file_name: &Path, data: &[u8]) -> std::io::Result<()>;
    fn clear_cache(&mut self) -> std::io::Result<()>;
}

/// Writes downloads below a cache directory
pub struct FileStoragePolicy {
    root: PathBuf,
}

impl FileStoragePolicy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StoragePolicy for FileStoragePolicy {
    fn update_file(&mut self, file_name: &Path, data: &[u8]) -> std::io::Result<()> {
        let path = self.root.join(file_name);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, data)
    }

    fn clear_cache(&mut self) -> std::io::Result<()> {
        let maps = self.root.join("maps");
        if maps.exists() {
            std::fs::remove_dir_all(maps)?;
        }
        Ok(())
    }
}

/// What happened to a job, reported on the owning thread
#[derive(Debug)]
pub enum DownloadEvent {
    /// Data arrived for the job with download key `id`
    Completed { id: String, data: Vec<u8> },
    /// The data was written through the storage policy
    Saved { destination: PathBuf, id: String },
    /// The job failed and will be queued again after [`REQUEUE_INTERVAL`]
    Retrying { id: String, trials_left: u8 },
    /// The job failed for good; its url is blacklisted
    Failed { id: String, error: String },
}

#[derive(Debug, Clone)]
struct HttpJob {
    source_url: Url,
    destination: PathBuf,
    id: String,
    usage: DownloadUsage,
    trials_left: u8,
}

/// A running job; `ticket` is unique per activation
struct ActiveJob {
    job: HttpJob,
    ticket: u64,
    handle: JoinHandle<()>,
}

struct JobOutcome {
    set: usize,
    ticket: u64,
    result: Result<Vec<u8>, DownloadError>,
}

/// Queues of one download policy
pub struct DownloadQueueSet {
    policy: DownloadPolicy,
    jobs: Vec<HttpJob>,
    queued: HashSet<PathBuf>,
    active: Vec<ActiveJob>,
    retry: VecDeque<HttpJob>,
    blacklist: HashSet<String>,
}

impl DownloadQueueSet {
    fn new(policy: DownloadPolicy) -> Self {
        Self {
            policy,
            jobs: Vec::new(),
            queued: HashSet::new(),
            active: Vec::new(),
            retry: VecDeque::new(),
            blacklist: HashSet::new(),
        }
    }

    pub fn policy(&self) -> &DownloadPolicy {
        &self.policy
    }

    pub fn queued_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn retry_count(&self) -> usize {
        self.retry.len()
    }

    fn can_accept_job(&self, source_url: &Url, destination: &Path) -> bool {
        if self.queued.contains(destination) || self.jobs.iter().any(|j| j.source_url == *source_url) {
            tracing::debug!("Download rejected, already queued: {}", destination.display());
            return false;
        }
        if self.retry.iter().any(|j| j.destination == destination || j.source_url == *source_url) {
            tracing::debug!("Download rejected, waiting for retry: {}", destination.display());
            return false;
        }
        if self
            .active
            .iter()
            .any(|a| a.job.destination == destination || a.job.source_url == *source_url)
        {
            tracing::debug!("Download rejected, already active: {}", destination.display());
            return false;
        }
        if self.blacklist.contains(source_url.as_str()) {
            tracing::debug!("Download rejected, blacklisted: {source_url}");
            return false;
        }
        true
    }

    fn push(&mut self, job: HttpJob) {
        self.queued.insert(job.destination.clone());
        self.jobs.push(job);
    }

    fn pop(&mut self) -> Option<HttpJob> {
        let job = self.jobs.pop()?;
        self.queued.remove(&job.destination);
        Some(job)
    }

    fn deactivate(&mut self, ticket: u64) -> Option<HttpJob> {
        let position = self.active.iter().position(|a| a.ticket == ticket)?;
        Some(self.active.swap_remove(position).job)
    }

    fn purge(&mut self) {
        self.jobs.clear();
        self.queued.clear();
        self.retry.clear();
        for active in self.active.drain(..) {
            active.handle.abort();
        }
    }
}

/// Download scheduler for tiles
pub struct HttpDownloadManager {
    enabled: bool,
    /// Browse and bulk defaults first, then custom policies in insertion order
    queue_sets: Vec<DownloadQueueSet>,
    storage: Option<Box<dyn StoragePolicy>>,
    fetcher: Arc<dyn TileFetcher>,
    runtime: Handle,
    results_tx: UnboundedSender<JobOutcome>,
    results_rx: UnboundedReceiver<JobOutcome>,
    requeue_interval: Duration,
    requeue_at: Option<Instant>,
    next_ticket: u64,
}

const BROWSE_SET: usize = 0;
const BULK_SET: usize = 1;

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl HttpDownloadManager {
    /// Jobs are spawned on `runtime`
    pub fn new(
        storage: Option<Box<dyn StoragePolicy>>,
        fetcher: Arc<dyn TileFetcher>,
        runtime: Handle,
    ) -> Self {
        let default_set = |usage, maximum_connections| {
            DownloadQueueSet::new(DownloadPolicy {
                key: DownloadPolicyKey {
                    hosts: Vec::new(),
                    usage,
                },
                maximum_connections,
            })
        };
        let (results_tx, results_rx) = unbounded_channel();
        Self {
            enabled: true,
            queue_sets: vec![
                default_set(DownloadUsage::Browse, BROWSE_CONNECTIONS),
                default_set(DownloadUsage::Bulk, BULK_CONNECTIONS),
            ],
            storage,
            fetcher,
            runtime,
            results_tx,
            results_rx,
            requeue_interval: REQUEUE_INTERVAL,
            requeue_at: None,
            next_ticket: 0,
        }
    }

    pub fn set_requeue_interval(&mut self, interval: Duration) {
        self.requeue_interval = interval;
    }

    pub fn is_download_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling purges every queue and refuses new jobs
    pub fn set_download_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            for set in &mut self.queue_sets {
                set.purge();
            }
            self.requeue_at = None;
        }
    }

    pub fn add_download_policy(&mut self, policy: DownloadPolicy) {
        if self.queue_sets.iter().any(|s| s.policy == policy) {
            return;
        }
        self.queue_sets.push(DownloadQueueSet::new(policy));
    }

    pub fn queue_sets(&self) -> &[DownloadQueueSet] {
        &self.queue_sets
    }

    fn find_queues(&self, host: &str, usage: DownloadUsage) -> usize {
        self.queue_sets
            .iter()
            .enumerate()
            .skip(2)
            .find(|(_, set)| set.policy.key.matches(host, usage))
            .map(|(i, _)| i)
            .unwrap_or_else(|| {
                tracing::debug!("No download policy for {host} {usage:?}, using the default");
                match usage {
                    DownloadUsage::Browse => BROWSE_SET,
                    DownloadUsage::Bulk => BULK_SET,
                }
            })
    }

    /// Queue a download of `source_url` to `destination`; returns false when rejected
    pub fn add_job(
        &mut self,
        source_url: Url,
        destination: impl Into<PathBuf>,
        id: impl Into<String>,
        usage: DownloadUsage,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        let destination = destination.into();
        let set = self.find_queues(source_url.host_str().unwrap_or_default(), usage);
        if !self.queue_sets[set].can_accept_job(&source_url, &destination) {
            return false;
        }
        self.queue_sets[set].push(HttpJob {
            source_url,
            destination,
            id: id.into(),
            usage,
            trials_left: MAX_RETRIES,
        });
        self.activate_jobs(set);
        true
    }

    fn activate_jobs(&mut self, set: usize) {
        while self.queue_sets[set].active.len() < self.queue_sets[set].policy.maximum_connections {
            let Some(job) = self.queue_sets[set].pop() else {
                break;
            };
            let fetch = self.fetcher.fetch(job.source_url.clone());
            let tx = self.results_tx.clone();
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            let handle = self.runtime.spawn(async move {
                let result = fetch.await;
                // The manager may be gone already
                let _ = tx.send(JobOutcome { set, ticket, result });
            });
            self.queue_sets[set].active.push(ActiveJob { job, ticket, handle });
        }
    }

    /// Jobs waiting, running or scheduled for a retry
    pub fn pending_jobs(&self) -> usize {
        self.queue_sets
            .iter()
            .map(|s| s.jobs.len() + s.active.len() + s.retry.len())
            .sum()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_jobs() == 0
    }

    /// Handle every finished job without blocking
    pub fn process_results(&mut self) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.results_rx.try_recv() {
            self.handle_outcome(outcome, &mut events);
        }
        self.requeue_if_due();
        events
    }

    /// Wait until at least one job finished or the retry timer fired
    ///
    /// Returns immediately with no events when nothing is pending.
    pub async fn wait_for_events(&mut self) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        while events.is_empty() && !self.is_idle() {
            let active = self.queue_sets.iter().any(|s| !s.active.is_empty());
            let deadline = self.requeue_at;
            tokio::select! {
                Some(outcome) = self.results_rx.recv(), if active => {
                    self.handle_outcome(outcome, &mut events);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {}
                else => break,
            }
            self.requeue_if_due();
        }
        events.extend(self.process_results());
        events
    }

    fn handle_outcome(&mut self, outcome: JobOutcome, events: &mut Vec<DownloadEvent>) {
        let Some(set) = self.queue_sets.get_mut(outcome.set) else {
            return;
        };
        let Some(mut job) = set.deactivate(outcome.ticket) else {
            tracing::debug!(ticket = outcome.ticket, "Dropping result of a purged download");
            return;
        };

        match outcome.result {
            Ok(data) => {
                tracing::debug!("Finished {} -> {}", job.source_url, job.destination.display());
                let saved = self
                    .storage
                    .as_mut()
                    .map(|storage| storage.update_file(&job.destination, &data));
                events.push(DownloadEvent::Completed {
                    id: job.id.clone(),
                    data,
                });
                match saved {
                    Some(Ok(())) => events.push(DownloadEvent::Saved {
                        destination: job.destination,
                        id: job.id,
                    }),
                    Some(Err(e)) => {
                        tracing::warn!("Could not save {}: {}", job.destination.display(), e)
                    }
                    None => {}
                }
            }
            Err(error) if job.trials_left > 0 => {
                job.trials_left -= 1;
                tracing::debug!(
                    "Download of {} failed ({error}), trying again soon",
                    job.source_url
                );
                events.push(DownloadEvent::Retrying {
                    id: job.id.clone(),
                    trials_left: job.trials_left,
                });
                set.retry.push_back(job);
                if self.requeue_at.is_none() {
                    self.requeue_at = Some(Instant::now() + self.requeue_interval);
                }
            }
            Err(error) => {
                tracing::warn!("Download of {} failed for good: {error}", job.source_url);
                set.blacklist.insert(job.source_url.to_string());
                events.push(DownloadEvent::Failed {
                    id: job.id,
                    error: error.to_string(),
                });
            }
        }
        self.activate_jobs(outcome.set);
    }

    fn requeue_if_due(&mut self) {
        let Some(at) = self.requeue_at else {
            return;
        };
        if Instant::now() < at {
            return;
        }
        self.requeue_at = None;
        for set in 0..self.queue_sets.len() {
            while let Some(job) = self.queue_sets[set].retry.pop_front() {
                tracing::debug!("Requeuing {} ({:?})", job.destination.display(), job.usage);
                self.queue_sets[set].push(job);
            }
            self.activate_jobs(set);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies; unknown urls fail
    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl TileFetcher for FakeFetcher {
        fn fetch(&self, url: Url) -> FetchFuture {
            self.requests.lock().unwrap().push(url.to_string());
            let body = self.bodies.get(url.as_str()).cloned();
            Box::pin(async move { body.ok_or_else(|| DownloadError::Other("not found".into())) })
        }
    }

    #[derive(Default, Clone)]
    struct MemoryStorage {
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    }

    impl StoragePolicy for MemoryStorage {
        fn update_file(&mut self, file_name: &Path, data: &[u8]) -> std::io::Result<()> {
            self.files.lock().unwrap().insert(file_name.to_path_buf(), data.to_vec());
            Ok(())
        }

        fn clear_cache(&mut self) -> std::io::Result<()> {
            self.files.lock().unwrap().clear();
            Ok(())
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("http://tiles.example.com/{path}")).unwrap()
    }

    fn manager(fetcher: FakeFetcher, storage: MemoryStorage) -> HttpDownloadManager {
        HttpDownloadManager::new(Some(Box::new(storage)), Arc::new(fetcher), Handle::current())
    }

    async fn drain(manager: &mut HttpDownloadManager) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        while !manager.is_idle() {
            events.extend(manager.wait_for_events().await);
        }
        events
    }

    #[tokio::test]
    async fn test_completed_download_is_saved() {
        let mut fetcher = FakeFetcher::default();
        fetcher.bodies.insert(url("0/0/0.png").to_string(), b"tile".to_vec());
        let storage = MemoryStorage::default();
        let mut manager = manager(fetcher, storage.clone());

        assert!(manager.add_job(url("0/0/0.png"), "maps/x/0/0/0.png", "x:0:0:0", DownloadUsage::Browse));
        let events = drain(&mut manager).await;

        assert!(matches!(&events[0], DownloadEvent::Completed { id, data } if id == "x:0:0:0" && data == b"tile"));
        assert!(matches!(&events[1], DownloadEvent::Saved { .. }));
        assert_eq!(
            storage.files.lock().unwrap().get(Path::new("maps/x/0/0/0.png")),
            Some(&b"tile".to_vec())
        );
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let mut manager = manager(FakeFetcher::default(), MemoryStorage::default());
        for i in 0..4 {
            manager.add_job(url(&format!("{i}.png")), format!("{i}.png"), format!("x:0:{i}:0"), DownloadUsage::Bulk);
        }
        // two are active, two wait on the stack
        assert_eq!(manager.queue_sets()[BULK_SET].active_count(), 2);
        assert_eq!(manager.queue_sets()[BULK_SET].queued_count(), 2);
        assert!(!manager.add_job(url("other.png"), "3.png", "dup", DownloadUsage::Bulk));
        assert!(!manager.add_job(url("other.png"), "0.png", "dup", DownloadUsage::Bulk));
        assert!(!manager.add_job(url("2.png"), "fresh.png", "dup", DownloadUsage::Bulk));
    }

    #[tokio::test]
    async fn test_disabling_purges_queues() {
        let mut manager = manager(FakeFetcher::default(), MemoryStorage::default());
        for i in 0..5 {
            manager.add_job(url(&format!("{i}.png")), format!("{i}.png"), format!("k{i}"), DownloadUsage::Bulk);
        }
        manager.set_download_enabled(false);
        assert!(manager.is_idle());
        assert!(!manager.add_job(url("9.png"), "9.png", "k9", DownloadUsage::Browse));
        assert!(manager.process_results().is_empty());
    }

    #[tokio::test]
    async fn test_late_result_of_purged_job_is_dropped() {
        let storage = MemoryStorage::default();
        let mut manager = manager(FakeFetcher::default(), storage.clone());
        assert!(manager.add_job(url("0.png"), "0.png", "k0", DownloadUsage::Browse));
        let stale = manager.queue_sets()[BROWSE_SET].active[0].ticket;

        manager.set_download_enabled(false);
        manager.set_download_enabled(true);
        assert!(manager.add_job(url("0.png"), "0.png", "k0", DownloadUsage::Browse));
        let current = manager.queue_sets()[BROWSE_SET].active[0].ticket;
        assert_ne!(stale, current);

        let outcome = |ticket| JobOutcome {
            set: BROWSE_SET,
            ticket,
            result: Ok(b"old".to_vec()),
        };
        manager.results_tx.send(outcome(stale)).unwrap();
        assert!(manager.process_results().is_empty());
        assert_eq!(manager.queue_sets()[BROWSE_SET].active_count(), 1);
        assert!(storage.files.lock().unwrap().is_empty());

        manager.results_tx.send(outcome(current)).unwrap();
        let events = manager.process_results();
        assert!(matches!(&events[0], DownloadEvent::Completed { id, .. } if id == "k0"));
        assert!(manager.is_idle());
    }

    #[tokio::test]
    async fn test_failures_retry_then_blacklist() {
        let mut manager = manager(FakeFetcher::default(), MemoryStorage::default());
        manager.set_requeue_interval(Duration::from_millis(1));
        assert!(manager.add_job(url("missing.png"), "missing.png", "m", DownloadUsage::Browse));

        let events = drain(&mut manager).await;
        let retries = events
            .iter()
            .filter(|e| matches!(e, DownloadEvent::Retrying { .. }))
            .count();
        assert_eq!(retries, usize::from(MAX_RETRIES));
        assert!(matches!(events.last(), Some(DownloadEvent::Failed { id, .. }) if id == "m"));
        assert!(!manager.add_job(url("missing.png"), "again.png", "m2", DownloadUsage::Browse));
    }

    #[tokio::test]
    async fn test_custom_policy_routes_by_host() {
        let mut manager = manager(FakeFetcher::default(), MemoryStorage::default());
        manager.add_download_policy(DownloadPolicy {
            key: DownloadPolicyKey {
                hosts: vec!["tiles.example.com".into()],
                usage: DownloadUsage::Browse,
            },
            maximum_connections: 1,
        });
        manager.add_job(url("a.png"), "a.png", "a", DownloadUsage::Browse);
        manager.add_job(url("b.png"), "b.png", "b", DownloadUsage::Browse);
        assert_eq!(manager.queue_sets()[2].active_count(), 1);
        assert_eq!(manager.queue_sets()[2].queued_count(), 1);
        assert_eq!(manager.queue_sets()[BROWSE_SET].active_count(), 0);
    }

    #[test]
    fn test_file_storage_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStoragePolicy::new(dir.path());
        storage.update_file(Path::new("maps/a/0/0/0.png"), b"x").unwrap();
        assert!(dir.path().join("maps/a/0/0/0.png").exists());
        storage.clear_cache().unwrap();
        assert!(!dir.path().join("maps").exists());
    }
}
