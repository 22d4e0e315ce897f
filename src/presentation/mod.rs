//! Presentation layer: the recycling list view and its slot bindings.

/// Recycling list view.
pub mod list_view;
/// Slot generation tickets.
pub mod slot_binding;

pub use list_view::{DeliveryOutcome, ListView, RowCell, RowDelivery};
pub use slot_binding::{Generation, SlotBindings, SlotTicket};
