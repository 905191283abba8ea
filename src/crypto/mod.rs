/// Cryptography module
///
/// Handles one-way hashing and verification of account passwords

pub mod password;

pub use password::PasswordHasher;
