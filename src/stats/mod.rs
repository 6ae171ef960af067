//! Derived figures over a [RecordSnapshot](crate::storage::entities::RecordSnapshot), the
//! current [Settings](crate::storage::entities::Settings) and the anchor date.
//!
//! Everything here is a pure function of its arguments. The UI refresh path and a background
//! recompute call the same functions on the same snapshot, so charts and summary totals can't
//! drift apart.

pub mod daily;
pub mod period;
pub mod series;
