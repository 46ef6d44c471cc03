//! The synchronization job: one linear pass that pulls every breed page,
//! fetches whichever referenced images are not yet local, then re-asserts
//! the full breed field set and image links in the store.
//!
//! Failure policy: a transport error during breed pagination aborts the
//! whole run (the caller's retry unit is the run); a failure scoped to one
//! image fetch or one breed record is logged and skipped so the rest of the
//! batch still lands.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::bounded;
use indicatif::ProgressBar;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::client::{ApiError, CatApiClient};
use crate::database::repo::{BreedRecord, ImageRecord, Store};
use crate::mapper::{map_breed, map_image, MappedBreed, SchemaVersion};

#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured deadline passed; everything upserted so far is kept.
    #[error("sync run aborted: deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub page_limit: usize,
    pub schema_version: SchemaVersion,
    /// Worker threads for the missing-image fetch phase; 1 means serial.
    pub fetch_workers: usize,
    /// Inter-request delay between image fetches; forces serial fetching.
    pub throttle: Option<Duration>,
    pub deadline: Option<Instant>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_limit: 10,
            schema_version: SchemaVersion::default(),
            fetch_workers: 4,
            throttle: None,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub breeds_upserted: usize,
    pub breeds_skipped: usize,
    pub images_fetched: usize,
    pub images_skipped: usize,
    pub links_updated: usize,
}

/// An image pulled from upstream: its mapped record plus (best-effort) its
/// raw content. Content failures keep the record; the row simply stays
/// without cached bytes.
struct Fetched {
    record: ImageRecord,
    content: Option<(String, Vec<u8>)>,
}

pub struct SyncJob<'a> {
    client: &'a CatApiClient,
    store: &'a Store,
    opts: SyncOptions,
}

impl<'a> SyncJob<'a> {
    pub fn new(client: &'a CatApiClient, store: &'a Store, opts: SyncOptions) -> Self {
        Self {
            client,
            store,
            opts,
        }
    }

    pub fn run(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        let raw = self.fetch_all_breeds(&mut report)?;
        info!("Fetched total of {} breeds.", raw.len());

        let mapped = self.map_breeds(&raw, &mut report);

        // V2 responses may embed the referenced image inline; seed those
        // rows first so the diff below treats them as already present.
        for breed in &mapped {
            if let Some(image) = &breed.embedded_image {
                self.store.insert_image(image)?;
            }
        }

        let required: HashSet<String> = mapped
            .iter()
            .filter(|b| !b.record.reference_image_id.is_empty())
            .map(|b| b.record.reference_image_id.clone())
            .collect();
        let existing = self.store.image_external_ids()?;
        let missing: Vec<String> = required.difference(&existing).cloned().collect();

        if missing.is_empty() {
            info!("No images to retrieve.");
        } else {
            info!("Missing image ids: {missing:?}");
            self.check_deadline()?;
            self.fetch_missing_images(&missing, &mut report)?;
        }

        self.check_deadline()?;
        for breed in &mapped {
            self.check_deadline()?;
            self.upsert_breed(&breed.record, &mut report)?;
        }

        Ok(report)
    }

    /// Page through `/v1/breeds` until a short page signals end-of-data.
    /// Any failure here is fatal to the run: no partial breed commit.
    fn fetch_all_breeds(&self, report: &mut SyncReport) -> Result<Vec<Value>, SyncError> {
        let limit = self.opts.page_limit;
        let mut all = Vec::new();
        let mut page = 0;
        loop {
            self.check_deadline()?;
            let batch = self.client.list_breeds(page, limit)?;
            report.pages += 1;
            let received = batch.len();
            all.extend(batch);
            if received < limit {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    fn map_breeds(&self, raw: &[Value], report: &mut SyncReport) -> Vec<MappedBreed> {
        let mut mapped = Vec::with_capacity(raw.len());
        for value in raw {
            match map_breed(self.opts.schema_version, value) {
                Ok(breed) => mapped.push(breed),
                Err(err) => {
                    let id = value
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or("<no id>");
                    warn!("Skipping breed record `{id}`: {err}");
                    report.breeds_skipped += 1;
                }
            }
        }
        mapped
    }

    fn fetch_missing_images(
        &self,
        missing: &[String],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let bar = ProgressBar::new(missing.len() as u64);
        let result = if self.opts.fetch_workers <= 1 || self.opts.throttle.is_some() {
            self.fetch_images_serial(missing, report, &bar)
        } else {
            self.fetch_images_pooled(missing, report, &bar)
        };
        bar.finish_and_clear();
        result
    }

    fn fetch_images_serial(
        &self,
        missing: &[String],
        report: &mut SyncReport,
        bar: &ProgressBar,
    ) -> Result<(), SyncError> {
        for id in missing {
            self.check_deadline()?;
            match fetch_one(self.client, id) {
                Ok(fetched) => {
                    self.write_image(&fetched)?;
                    report.images_fetched += 1;
                }
                Err(err) => {
                    warn!("Skipping image `{id}`: {err}");
                    report.images_skipped += 1;
                }
            }
            bar.inc(1);
            if let Some(delay) = self.opts.throttle {
                thread::sleep(delay);
            }
        }
        Ok(())
    }

    /// Bounded worker pool: fetch threads pull ids from a channel and send
    /// results back to this thread, which is the only one touching the
    /// store. A deadline or a store failure flips the cancel flag so
    /// workers stop picking up new ids.
    fn fetch_images_pooled(
        &self,
        missing: &[String],
        report: &mut SyncReport,
        bar: &ProgressBar,
    ) -> Result<(), SyncError> {
        let workers = self.opts.fetch_workers.min(missing.len());
        let (id_tx, id_rx) = bounded::<String>(missing.len());
        for id in missing {
            let _ = id_tx.send(id.clone());
        }
        drop(id_tx);

        let (result_tx, result_rx) = bounded::<(String, anyhow::Result<Fetched>)>(workers);
        let cancelled = AtomicBool::new(false);
        let client = self.client;
        let mut write_err = None;

        thread::scope(|s| {
            for _ in 0..workers {
                let id_rx = id_rx.clone();
                let result_tx = result_tx.clone();
                let cancelled = &cancelled;
                s.spawn(move || {
                    for id in id_rx {
                        if cancelled.load(Ordering::Relaxed) {
                            break;
                        }
                        let result = fetch_one(client, &id);
                        if result_tx.send((id, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);
            drop(id_rx);

            for (id, result) in result_rx.iter() {
                match result {
                    Ok(fetched) => match self.write_image(&fetched) {
                        Ok(()) => report.images_fetched += 1,
                        Err(err) => {
                            cancelled.store(true, Ordering::Relaxed);
                            write_err = Some(err);
                        }
                    },
                    Err(err) => {
                        warn!("Skipping image `{id}`: {err}");
                        report.images_skipped += 1;
                    }
                }
                bar.inc(1);
                if self.deadline_passed() {
                    cancelled.store(true, Ordering::Relaxed);
                }
            }
        });

        if let Some(err) = write_err {
            return Err(err);
        }
        self.check_deadline()
    }

    fn write_image(&self, fetched: &Fetched) -> Result<(), SyncError> {
        self.store.insert_image(&fetched.record)?;
        if let Some((filename, bytes)) = &fetched.content {
            info!("Saving image raw data in file: {filename}");
            self.store
                .attach_image_content(&fetched.record.external_id, filename, bytes)?;
        }
        Ok(())
    }

    /// Full-field upsert followed by link resolution. The before/after
    /// reference comparison happens here, outside the persistence calls: an
    /// unresolvable non-empty reference leaves the stored link untouched
    /// and heals on a later run once the image exists.
    fn upsert_breed(&self, record: &BreedRecord, report: &mut SyncReport) -> Result<(), SyncError> {
        let before = self.store.breed_reference(&record.external_id)?;
        let current_link = before.as_ref().and_then(|(_, link)| *link);

        self.store.upsert_breed(record)?;
        report.breeds_upserted += 1;

        let desired_link = if record.reference_image_id.is_empty() {
            None
        } else {
            match self.store.find_image(&record.reference_image_id)? {
                Some(image_id) => Some(image_id),
                None => current_link,
            }
        };

        if desired_link != current_link {
            self.store
                .set_breed_image(&record.external_id, desired_link)?;
            report.links_updated += 1;
        }
        Ok(())
    }

    fn deadline_passed(&self) -> bool {
        self.opts
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn check_deadline(&self) -> Result<(), SyncError> {
        if self.deadline_passed() {
            return Err(SyncError::DeadlineExceeded);
        }
        Ok(())
    }
}

fn fetch_one(client: &CatApiClient, id: &str) -> anyhow::Result<Fetched> {
    let raw = client.get_image(id)?;
    let record = map_image(&raw)?;
    let content = match client.fetch_content(&record.url) {
        Ok(bytes) => Some((filename_from_url(&record.url), bytes)),
        Err(err) => {
            warn!("Failed to fetch raw content for image `{id}`: {err}");
            None
        }
    };
    Ok(Fetched { record, content })
}

fn filename_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
