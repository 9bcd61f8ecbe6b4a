use kernel::UploadResult;

/// Lifecycle of one queued file: `Pending -> Uploading -> {Success, Error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Uploading,
    Success,
    Error(String),
}

/// One file waiting in, or settled by, the upload queue.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub folder_path: String,
    pub status: ItemStatus,
    /// Cosmetic only: no byte-level progress is reported by the server,
    /// so this jumps 0 -> 100 on a terminal state.
    pub progress: u8,
}

/// Events driving the queue. All state changes go through
/// [`QueueState::apply`], there are no ad-hoc counters to keep in sync.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    ItemAdded {
        id: String,
        file_name: String,
        size: u64,
        folder_path: String,
    },
    ItemRemoved {
        id: String,
    },
    /// The whole batch went out in a single request; every pending item
    /// is uploading from the caller's perspective.
    BatchSubmitted,
    /// The batch response arrived; items are matched back to their
    /// results by original file name.
    BatchSettled {
        results: Vec<UploadResult>,
    },
    /// The batch request itself failed before producing per-item results.
    BatchFailed {
        error: String,
    },
    Cleared,
}

/// Client-side queue as a pure reducer: `state.apply(event)` returns the
/// next state and recomputes the display totals from the items, so the
/// aggregates can never drift from their source.
#[derive(Debug, Clone, Default)]
pub struct QueueState {
    pub items: Vec<QueueItem>,
    pub total_files: usize,
    pub total_size: u64,
}

impl QueueState {
    #[must_use]
    pub fn apply(mut self, event: QueueEvent) -> Self {
        match event {
            QueueEvent::ItemAdded {
                id,
                file_name,
                size,
                folder_path,
            } => {
                self.items.push(QueueItem {
                    id,
                    file_name,
                    size,
                    folder_path,
                    status: ItemStatus::Pending,
                    progress: 0,
                });
            }
            QueueEvent::ItemRemoved { id } => {
                self.items.retain(|item| item.id != id);
            }
            QueueEvent::BatchSubmitted => {
                for item in &mut self.items {
                    if item.status == ItemStatus::Pending {
                        item.status = ItemStatus::Uploading;
                    }
                }
            }
            QueueEvent::BatchSettled { results } => {
                for item in &mut self.items {
                    if item.status != ItemStatus::Uploading {
                        continue;
                    }
                    let matched = results.iter().find(|r| r.file_name == item.file_name);
                    match matched {
                        Some(result) if result.success => {
                            item.status = ItemStatus::Success;
                            item.progress = 100;
                        }
                        Some(result) => {
                            let error = result
                                .error
                                .clone()
                                .unwrap_or_else(|| "Upload failed".to_string());
                            item.status = ItemStatus::Error(error);
                            item.progress = 100;
                        }
                        None => {
                            item.status =
                                ItemStatus::Error("missing from upload response".to_string());
                            item.progress = 100;
                        }
                    }
                }
            }
            QueueEvent::BatchFailed { error } => {
                for item in &mut self.items {
                    if item.status == ItemStatus::Uploading {
                        item.status = ItemStatus::Error(error.clone());
                        item.progress = 100;
                    }
                }
            }
            QueueEvent::Cleared => {
                self.items.clear();
            }
        }

        self.refresh_totals();
        self
    }

    fn refresh_totals(&mut self) {
        self.total_files = self.items.len();
        self.total_size = self.items.iter().map(|item| item.size).sum();
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Success)
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.status, ItemStatus::Error(_)))
            .count()
    }
}
