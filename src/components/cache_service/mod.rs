pub mod actor;

pub use actor::{keys, CacheActor, CacheActorHandle};
