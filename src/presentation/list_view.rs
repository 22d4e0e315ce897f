//! Recycling list view that renders catalog rows with transformed artwork.
//!
//! A fixed set of slots is reused as the list scrolls. Pipeline completions
//! are forwarded into a channel and applied on the owner's loop, where the
//! slot's ticket decides whether a delivery is still wanted.

use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::entities::{CatalogEntity, ImageStatus, LoadedImage};
use crate::domain::errors::PipelineResult;
use crate::domain::modifier::ModifierChain;
use crate::infrastructure::image::{MonoModifier, Pipeline, ScaleModifier};

use super::slot_binding::{SlotBindings, SlotTicket};

/// Contents of one reusable slot.
#[derive(Default)]
pub struct RowCell {
    /// Row currently shown, or `None` for an empty slot.
    pub row: Option<usize>,
    /// Primary label.
    pub title: String,
    /// Secondary label.
    pub subtitle: String,
    /// Transformed artwork, once delivered.
    pub image: Option<Arc<DynamicImage>>,
    /// Artwork load state.
    pub status: ImageStatus,
}

impl RowCell {
    fn recycle(&mut self, row: usize, entity: &CatalogEntity) {
        self.row = Some(row);
        self.title = entity.title().to_string();
        self.subtitle = entity.subtitle().to_string();
        self.image = None;
        self.status = ImageStatus::NotStarted;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Shows `image` and marks the cell ready.
    pub fn set_loaded(&mut self, image: Arc<DynamicImage>) {
        self.image = Some(image);
        self.status = ImageStatus::Ready;
    }

    /// Marks the cell as waiting for artwork.
    pub fn set_loading(&mut self) {
        self.status = ImageStatus::Loading;
    }

    /// Clears the image and records why loading failed.
    pub fn set_failed(&mut self, error: String) {
        self.image = None;
        self.status = ImageStatus::Failed(error);
    }

    /// Returns true if artwork is shown.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.image.is_some() && self.status.is_ready()
    }

    /// Returns true while artwork is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.status.is_loading()
    }
}

impl std::fmt::Debug for RowCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCell")
            .field("row", &self.row)
            .field("title", &self.title)
            .field("has_image", &self.image.is_some())
            .field("status", &self.status)
            .finish()
    }
}

/// A pipeline outcome addressed to the slot that asked for it.
#[derive(Debug)]
pub struct RowDelivery {
    /// Ticket issued when the request was made.
    pub ticket: SlotTicket,
    /// Row the request was made for.
    pub row: usize,
    /// Pipeline outcome.
    pub result: PipelineResult<LoadedImage>,
}

/// What happened to a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The image was set on its slot.
    Applied,
    /// The slot had been rebound; the delivery was dropped.
    Stale,
    /// The request failed; the slot is left blank.
    Failed,
}

/// Fixed set of recycled slots over a list of catalog rows.
///
/// Owned by the loop that drains its deliveries.
pub struct ListView {
    pipeline: Pipeline,
    chain: ModifierChain,
    items: Vec<CatalogEntity>,
    cells: Vec<RowCell>,
    bindings: SlotBindings,
    first_row: usize,
    deliveries_tx: mpsc::UnboundedSender<RowDelivery>,
    deliveries_rx: mpsc::UnboundedReceiver<RowDelivery>,
}

impl ListView {
    /// Creates a view with `slot_count` reusable slots whose artwork is
    /// rendered gray and scaled to `cell_size`.
    #[must_use]
    pub fn new(pipeline: Pipeline, slot_count: usize, cell_size: (u32, u32)) -> Self {
        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();
        let chain = ModifierChain::new()
            .then(MonoModifier::gray())
            .then(ScaleModifier::new(cell_size.0, cell_size.1));

        Self {
            pipeline,
            chain,
            items: Vec::new(),
            cells: (0..slot_count).map(|_| RowCell::default()).collect(),
            bindings: SlotBindings::new(),
            first_row: 0,
            deliveries_tx,
            deliveries_rx,
        }
    }

    /// Replaces the rows, keeping only entities with artwork. Every slot is
    /// unbound.
    pub fn set_items(&mut self, entities: Vec<CatalogEntity>) {
        self.items = entities
            .into_iter()
            .filter(|entity| entity.artwork_source().is_some())
            .collect();
        self.first_row = 0;
        for (slot, cell) in self.cells.iter_mut().enumerate() {
            self.bindings.unbind(slot);
            cell.clear();
        }
        debug!(rows = self.items.len(), "List items replaced");
    }

    /// Recycles `slot` to show `row` and requests its artwork.
    ///
    /// Returns the new ticket, or `None` if the slot or row does not exist
    /// (the slot is then left empty).
    pub fn bind_row(&mut self, slot: usize, row: usize) -> Option<SlotTicket> {
        let cell = self.cells.get_mut(slot)?;

        let Some(entity) = self.items.get(row) else {
            self.bindings.unbind(slot);
            cell.clear();
            return None;
        };

        cell.recycle(row, entity);
        let ticket = self.bindings.bind(slot);

        if let Some(source) = entity.artwork_source() {
            cell.set_loading();
            let tx = self.deliveries_tx.clone();
            trace!(slot = slot, row = row, url = %source, "Requesting row artwork");
            self.pipeline.request(&source, &self.chain, move |result| {
                let _ = tx.send(RowDelivery {
                    ticket,
                    row,
                    result,
                });
            });
        }

        Some(ticket)
    }

    /// Rebinds every slot to the rows starting at `first_row`.
    pub fn scroll_to(&mut self, first_row: usize) {
        let max_first = self.items.len().saturating_sub(self.cells.len());
        self.first_row = first_row.min(max_first);
        debug!(first_row = self.first_row, "Scrolling list");

        for slot in 0..self.cells.len() {
            self.bind_row(slot, self.first_row + slot);
        }
    }

    /// Applies one delivery if its ticket is still current.
    pub fn apply_delivery(&mut self, delivery: RowDelivery) -> DeliveryOutcome {
        let RowDelivery {
            ticket,
            row,
            result,
        } = delivery;

        if !self.bindings.is_current(&ticket) {
            trace!(slot = ticket.slot, row = row, "Dropping stale delivery");
            return DeliveryOutcome::Stale;
        }
        let Some(cell) = self.cells.get_mut(ticket.slot) else {
            return DeliveryOutcome::Stale;
        };

        match result {
            Ok(loaded) => {
                cell.set_loaded(loaded.image);
                DeliveryOutcome::Applied
            }
            Err(e) => {
                debug!(slot = ticket.slot, row = row, error = %e, "Row artwork failed");
                cell.set_failed(e.to_string());
                DeliveryOutcome::Failed
            }
        }
    }

    /// Applies every delivery already queued.
    pub fn drain_deliveries(&mut self) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(delivery) = self.deliveries_rx.try_recv() {
            outcomes.push(self.apply_delivery(delivery));
        }
        outcomes
    }

    /// Waits for the next delivery and applies it.
    pub async fn next_delivery(&mut self) -> Option<DeliveryOutcome> {
        let delivery = self.deliveries_rx.recv().await?;
        Some(self.apply_delivery(delivery))
    }

    /// Returns every slot in order.
    #[must_use]
    pub fn cells(&self) -> &[RowCell] {
        &self.cells
    }

    /// Returns the cell for `slot`.
    #[must_use]
    pub fn cell(&self, slot: usize) -> Option<&RowCell> {
        self.cells.get(slot)
    }

    /// Returns the rows with artwork.
    #[must_use]
    pub fn items(&self) -> &[CatalogEntity] {
        &self.items
    }

    /// Row shown in slot 0.
    #[must_use]
    pub const fn first_row(&self) -> usize {
        self.first_row
    }

    /// Modifier chain applied to every row's artwork.
    #[must_use]
    pub const fn chain(&self) -> &ModifierChain {
        &self.chain
    }

    /// Number of slots still waiting for artwork.
    #[must_use]
    pub fn loading_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_loading()).count()
    }
}
