//! Short-lived reservations on the last unit of scarce stock.
//!
//! An item whose remaining quantity is exactly one can be leased by at most
//! one cart holder at a time. Leases expire after a TTL (20 minutes by
//! default) and are reclaimed by a periodic sweep.
//!
//! - [`ReservationStore`] is the storage boundary. Admission is a single
//!   conditional write there, never a read followed by a write.
//! - [`ReservationManager`] applies stock rules and the lease lifecycle.
//! - [`ReclaimScheduler`] sweeps expired leases on an interval and on demand.

pub mod error;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod reservation;
pub mod scheduler;
pub mod store;

pub use error::{ReservationError, Result};
pub use manager::{Admission, DEFAULT_RESERVATION_TTL, MAX_RESERVATION_TTL, ReservationManager};
pub use memory::InMemoryReservationStore;
pub use postgres::PostgresReservationStore;
pub use reservation::{AcquireOutcome, AcquireRequest, Reservation, SweepReport};
pub use scheduler::{DEFAULT_SWEEP_INTERVAL, ReclaimHandle, ReclaimScheduler};
pub use store::ReservationStore;
