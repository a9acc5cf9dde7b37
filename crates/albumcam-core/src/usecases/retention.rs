//! Bounded retention of images whose upload failed transiently
//!
//! The queue never holds more than `capacity` images. Pushing past the cap
//! deletes the oldest file from disk, so a long outage costs at most
//! `capacity` images worth of space. A capacity of zero deletes every
//! failed image straight away.

use std::{
    collections::VecDeque,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::domain::capture::is_capture_file;

/// Oldest-first queue of retained image paths
#[derive(Debug)]
pub struct RetentionQueue {
    capacity: usize,
    images: VecDeque<PathBuf>,
}

impl RetentionQueue {
    /// Creates an empty queue holding at most `capacity` images
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            images: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Retained paths, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.images.iter().map(PathBuf::as_path)
    }

    /// Keeps `path` as the newest entry, evicting and deleting the oldest
    /// images beyond capacity
    ///
    /// # Returns
    /// The paths that were evicted (and removed from disk)
    pub async fn retain(&mut self, path: PathBuf) -> Vec<PathBuf> {
        if self.images.contains(&path) {
            return Vec::new();
        }
        self.images.push_back(path);

        let mut evicted = Vec::new();
        while self.images.len() > self.capacity {
            if let Some(oldest) = self.images.pop_front() {
                remove_image(&oldest).await;
                evicted.push(oldest);
            }
        }

        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                capacity = self.capacity,
                "Retention cap reached, deleted oldest images"
            );
        }
        evicted
    }

    /// Takes the oldest retained image out of the queue
    pub fn pop_oldest(&mut self) -> Option<PathBuf> {
        self.images.pop_front()
    }

    /// Puts an image back at the head of the queue after a failed retry
    ///
    /// The image was already counted against the cap, so this never evicts.
    pub fn restore_oldest(&mut self, path: PathBuf) {
        self.images.push_front(path);
    }

    /// Deletes every retained image from disk and empties the queue
    ///
    /// # Returns
    /// The number of images removed
    pub async fn purge(&mut self) -> usize {
        let count = self.images.len();
        while let Some(path) = self.images.pop_front() {
            remove_image(&path).await;
        }
        if count > 0 {
            info!(count, "Purged retained images");
        }
        count
    }

    /// Adopts capture files left in `dir` by a previous run
    ///
    /// Files are ordered by name (which embeds the capture timestamp) and
    /// pushed through [`retain`](Self::retain), so the cap applies.
    ///
    /// # Returns
    /// The number of files found
    pub async fn adopt_existing(&mut self, dir: &Path) -> std::io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_capture_file(&path) {
                found.push(path);
            }
        }
        found.sort();

        let count = found.len();
        for path in found {
            self.retain(path).await;
        }
        if count > 0 {
            info!(
                found = count,
                retained = self.images.len(),
                dir = %dir.display(),
                "Adopted leftover images from a previous run"
            );
        }
        Ok(count)
    }
}

/// Deletes a local image, treating an already-missing file as success
pub(crate) async fn remove_image(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed local image"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Local image already gone")
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove local image"),
    }
}
