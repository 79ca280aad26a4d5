//! Shared types for the parts store reservation and shipping core.

pub mod clock;
pub mod measure;
pub mod money;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use measure::Dimensions;
pub use money::Money;
pub use types::{HolderId, ItemId, ReservationId};
