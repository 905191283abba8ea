/// Account management
///
/// Storage of user accounts keyed by unique email, including the balance
/// mutations used by the ledger.

mod store;

pub use store::AccountStore;
