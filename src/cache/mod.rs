pub mod invalidation;
pub mod key_builder;
pub mod ttl_cache;

pub use invalidation::InvalidationListener;
pub use key_builder::KeyBuilder;
pub use ttl_cache::TtlCache;
