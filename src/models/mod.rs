pub mod profile;
pub mod rank;

pub use profile::Profile;
pub use rank::Rank;

/// Name of the implicit rank every player holds when the authority lists none.
pub const DEFAULT_RANK_NAME: &str = "Member";

/// Current wall-clock time in epoch milliseconds, as stored in `lastSeen`.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}
