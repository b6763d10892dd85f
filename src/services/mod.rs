pub mod pacing;
pub use pacing::{Pacer, TokioPacer};

pub mod resolver;
pub use resolver::{GoalLinkResolver, ResolveError, ResolverSettings};
