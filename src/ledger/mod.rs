/// Points ledger
///
/// The activity log and the balance-changing procedures built on top of the
/// account store.

pub mod activity;
pub mod service;

pub use activity::ActivityLedger;
pub use service::{ActivityOutcome, PointsService};
