//! Truck Entries
//!
//! The domain model shared by every layer:
//!
//! - **types**: `TruckEntry` (a recorded weigh-in session) and `FormData`
//!   (transient user input)
//! - **error**: the store error taxonomy (`Fetch` vs `Persistence`)
//!
//! Entries are immutable once created. They are built client-side at stop
//! time with both timestamps already fixed, stored whole, and only ever
//! destroyed by id.

pub mod error;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use types::{parse_weight, FormData, FormField, TruckEntry, UNKNOWN_TRUCK_ID};
