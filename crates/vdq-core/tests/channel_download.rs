//! Integration test: HTTP channel source against a local range server,
//! driven by the queue with a JSON file store.

mod common;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

use vdq_core::downloader::Downloader;
use vdq_core::job::{AddressingInfo, DisplayInfo, Job, Recipient};
use vdq_core::metadata::JobMetadataService;
use vdq_core::retry::RetryPolicy;
use vdq_core::scheduler::{DownloadQueue, ProgressStatus};
use vdq_core::sink::{ErrorSink, ProgressSink};
use vdq_core::source::HttpChannelSource;
use vdq_core::store::JsonFileStore;

const PART: u64 = 64 * 1024;

#[derive(Default)]
struct Errors(Mutex<Vec<String>>);

#[async_trait]
impl ErrorSink for Errors {
    async fn send_error(&self, _r: &Recipient, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

struct Quiet;

#[async_trait]
impl ProgressSink for Quiet {
    async fn update(&self, _r: &Recipient, _s: Option<&ProgressStatus>) {}
}

fn body(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn addressing(date: i64, size: usize) -> AddressingInfo {
    AddressingInfo {
        channel: "films".into(),
        message_date: date,
        file_size: size as u64,
        extension: "mkv".into(),
    }
}

fn display(name: &str) -> DisplayInfo {
    DisplayInfo {
        file_name: name.into(),
        ..DisplayInfo::default()
    }
}

struct Setup {
    queue: DownloadQueue,
    metadata: Arc<JobMetadataService>,
    errors: Arc<Errors>,
    video_dir: tempfile::TempDir,
    _state_dir: tempfile::TempDir,
}

async fn setup(base: &str, max: usize) -> Setup {
    let video_dir = tempdir().unwrap();
    let state_dir = tempdir().unwrap();
    let store = JsonFileStore::open(state_dir.path().join("downloads.json")).await.unwrap();
    let metadata = Arc::new(JobMetadataService::new(Arc::new(store)));
    let source = HttpChannelSource::new(base, PART, RetryPolicy::once()).unwrap();
    let errors = Arc::new(Errors::default());
    let queue = DownloadQueue::new(
        metadata.clone(),
        Downloader::new(Arc::new(source), video_dir.path()),
        Arc::new(Quiet),
        errors.clone(),
        max,
    );
    Setup {
        queue,
        metadata,
        errors,
        video_dir,
        _state_dir: state_dir,
    }
}

async fn drain(queue: &DownloadQueue) {
    tokio::time::timeout(Duration::from_secs(30), queue.wait_idle())
        .await
        .expect("queue did not drain");
}

#[tokio::test]
async fn queued_jobs_download_over_http() {
    let heat = body(300 * 1024 + 17, 1);
    let alien = body(150 * 1024, 2);
    let index = serde_json::json!([
        { "date": 1_700_000_000 },
        common::range_server::document(1_700_000_100, "heat.bin", heat.len()),
        common::range_server::document(1_700_000_200, "alien.bin", alien.len()),
    ]);
    let mut files = HashMap::new();
    files.insert("/films/index.json".to_string(), serde_json::to_vec(&index).unwrap());
    files.insert("/films/heat.bin".to_string(), heat.clone());
    files.insert("/films/alien.bin".to_string(), alien.clone());
    let (base, requests) = common::range_server::start(files);

    let s = setup(&base, 1).await;
    let r = Recipient::new("7");
    s.queue.submit(r.clone(), addressing(1_700_000_100, heat.len()), display("Heat"), None).await.unwrap();
    // Off by a few seconds: the closest message is substituted.
    s.queue.submit(r, addressing(1_700_000_203, alien.len()), display("Alien"), None).await.unwrap();
    drain(&s.queue).await;

    assert!(s.errors.0.lock().unwrap().is_empty());
    let movies = s.video_dir.path().join("movies");
    assert_eq!(std::fs::read(movies.join("Heat.mkv")).unwrap(), heat);
    assert_eq!(std::fs::read(movies.join("Alien.mkv")).unwrap(), alien);
    assert!(s.metadata.list_keys().await.unwrap().is_empty());
    assert_eq!(requests.range_starts("/films/heat.bin"), vec![0, PART, 2 * PART, 3 * PART, 4 * PART]);
}

#[tokio::test]
async fn interrupted_job_resumes_from_persisted_offset() {
    let total = 1_000_000usize;
    let data = body(total, 9);
    let index = serde_json::json!([common::range_server::document(1_700_000_000, "big.bin", total)]);
    let mut files = HashMap::new();
    files.insert("/films/index.json".to_string(), serde_json::to_vec(&index).unwrap());
    files.insert("/films/big.bin".to_string(), data.clone());
    let (base, requests) = common::range_server::start(files);

    let s = setup(&base, 2).await;
    let path = s.video_dir.path().join("movies").join("Big.mkv");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, &data[..400_000]).unwrap();

    let mut job = Job::new(
        "big001".into(),
        Recipient::new("7"),
        addressing(1_700_000_000, total),
        display("Big"),
    );
    job.offset = 400_000;
    job.file_path = Some(path.clone());
    s.metadata.save(&job.id, &job).await.unwrap();

    let report = s.queue.recover_on_startup().await.unwrap();
    assert_eq!(report.resumed, 1);
    drain(&s.queue).await;

    assert_eq!(std::fs::read(&path).unwrap(), data);
    let starts = requests.range_starts("/films/big.bin");
    assert_eq!(starts.first(), Some(&400_000));
    assert!(starts.iter().all(|&s| s >= 400_000));
    assert!(s.metadata.get("big001").await.unwrap().is_none());
}

#[tokio::test]
async fn photo_message_fails_as_invalid_media() {
    let index = serde_json::json!([
        { "date": 1_700_000_000, "media": { "url": "cover.jpg", "size": 10, "kind": "photo" } }
    ]);
    let mut files = HashMap::new();
    files.insert("/films/index.json".to_string(), serde_json::to_vec(&index).unwrap());
    let (base, _requests) = common::range_server::start(files);

    let s = setup(&base, 1).await;
    let id = s
        .queue
        .submit(Recipient::new("7"), addressing(1_700_000_000, 10), display("Cover"), None)
        .await
        .unwrap();
    drain(&s.queue).await;

    let errors = s.errors.0.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("not a downloadable media document"), "{}", errors[0]);
    assert!(s.metadata.get(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn server_without_range_support_fails_the_job() {
    let data = body(3 * PART as usize, 4);
    let index = serde_json::json!([common::range_server::document(1_700_000_000, "big.bin", data.len())]);
    let mut files = HashMap::new();
    files.insert("/films/index.json".to_string(), serde_json::to_vec(&index).unwrap());
    files.insert("/films/big.bin".to_string(), data.clone());
    let (base, requests) = common::range_server::start_ignoring_ranges(files);

    let s = setup(&base, 1).await;
    let id = s
        .queue
        .submit(Recipient::new("7"), addressing(1_700_000_000, data.len()), display("Big"), None)
        .await
        .unwrap();
    drain(&s.queue).await;

    let errors = s.errors.0.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ignored the Range header"), "{}", errors[0]);
    assert_eq!(requests.range_starts("/films/big.bin"), vec![0]);
    assert!(s.metadata.get(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn small_file_from_server_without_range_support_is_rejected_too() {
    let data = body(1000, 5);
    let index = serde_json::json!([common::range_server::document(1_700_000_000, "clip.bin", data.len())]);
    let mut files = HashMap::new();
    files.insert("/films/index.json".to_string(), serde_json::to_vec(&index).unwrap());
    files.insert("/films/clip.bin".to_string(), data);
    let (base, _requests) = common::range_server::start_ignoring_ranges(files);

    let s = setup(&base, 1).await;
    s.queue
        .submit(Recipient::new("7"), addressing(1_700_000_000, 1000), display("Clip"), None)
        .await
        .unwrap();
    drain(&s.queue).await;

    let errors = s.errors.0.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ignored the Range header"), "{}", errors[0]);
}
