//! The ordered collection of selected files and their lifecycle rules.

use std::collections::HashMap;

use super::error::CoreError;
use super::preview::PreviewHandle;
use super::{FileId, FileItem, FileStatus, PreviewState, RawFile, Transition};

/// Holds every `FileItem` currently in view, in selection order.
///
/// All mutation of items goes through this type. Dropping the registry
/// releases every handle it still owns.
#[derive(Debug, Default)]
pub struct FileRegistry {
    items: Vec<FileItem>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `pending` item per image file and returns the new ids in
    /// input order. Non-image files are skipped without error.
    pub fn add(&mut self, files: Vec<RawFile>) -> Vec<FileId> {
        let mut ids = Vec::with_capacity(files.len());
        for raw in files {
            if !raw.is_image() {
                tracing::debug!(
                    "Skipping {} ({}): not an image",
                    raw.name(),
                    raw.media_type()
                );
                continue;
            }
            let item = FileItem::new(raw);
            ids.push(item.id.clone());
            self.items.push(item);
        }
        tracing::info!("Added {} file(s); registry now holds {}", ids.len(), self.items.len());
        ids
    }

    /// Removes an item and releases its handles. Returns `false` if the id
    /// was not present.
    pub fn remove(&mut self, id: &FileId) -> bool {
        match self.position(id) {
            Some(index) => {
                let item = self.items.remove(index);
                tracing::info!("Removed {}", item.raw.name());
                item.release();
                true
            }
            None => {
                tracing::debug!("Remove ignored: {} is not in the registry", id);
                false
            }
        }
    }

    /// Releases every handle and empties the registry. Returns how many items
    /// were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        for item in self.items.drain(..) {
            item.release();
        }
        if count > 0 {
            tracing::info!("Cleared {} file(s) from the registry", count);
        }
        count
    }

    /// Applies a status change and returns the new status.
    ///
    /// The item is left untouched when the change is not allowed from its
    /// current status.
    pub fn transition(
        &mut self,
        id: &FileId,
        transition: Transition,
    ) -> Result<FileStatus, CoreError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;

        match (item.status, transition) {
            (FileStatus::Pending, Transition::Start) => {
                item.status = FileStatus::Analyzing;
            }
            (FileStatus::Completed | FileStatus::Error, Transition::Restart) => {
                if let Some(previous) = item.result.take() {
                    previous.overlay.release();
                }
                item.error = None;
                item.status = FileStatus::Analyzing;
            }
            (FileStatus::Analyzing, Transition::Complete(result)) => {
                item.result = Some(result);
                item.error = None;
                item.status = FileStatus::Completed;
            }
            (FileStatus::Analyzing, Transition::Fail(reason)) => {
                item.result = None;
                item.error = Some(reason);
                item.status = FileStatus::Error;
            }
            (from, transition) => {
                tracing::warn!(
                    "Rejected {} for {} while {}",
                    transition.name(),
                    item.raw.name(),
                    from
                );
                return Err(CoreError::invalid(id, from, &transition));
            }
        }

        tracing::debug!("{} is now {}", item.raw.name(), item.status);
        Ok(item.status)
    }

    /// Stores the outcome of preview generation for an item.
    ///
    /// A handle for an item that has since been removed is released on the
    /// spot.
    pub fn attach_preview(
        &mut self,
        id: &FileId,
        preview: Result<PreviewHandle, CoreError>,
    ) -> Result<(), CoreError> {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            if let Ok(handle) = preview {
                handle.release();
            }
            return Err(CoreError::ItemNotFound(id.clone()));
        };

        let new_state = match preview {
            Ok(handle) => PreviewState::Ready(handle),
            Err(e) => {
                tracing::warn!("No preview for {}: {}", item.raw.name(), e);
                PreviewState::Unavailable(e.to_string())
            }
        };
        std::mem::replace(&mut item.preview, new_state).release();
        Ok(())
    }

    pub fn get(&self, id: &FileId) -> Option<&FileItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn items(&self) -> &[FileItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<FileId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `true` if at least one item currently has status `completed`.
    pub fn has_completed(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.status == FileStatus::Completed)
    }

    pub fn count_by_status(&self) -> HashMap<FileStatus, usize> {
        let mut counts = HashMap::new();
        for item in &self.items {
            *counts.entry(item.status).or_insert(0) += 1;
        }
        counts
    }

    /// Snapshot of everything an analysis pass needs, in registry order.
    pub fn analysis_jobs(&self) -> Vec<super::AnalysisJob> {
        self.items
            .iter()
            .map(|item| super::AnalysisJob {
                id: item.id.clone(),
                file: item.raw.clone(),
                rerun: item.status.is_terminal(),
            })
            .collect()
    }

    fn position(&self, id: &FileId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
