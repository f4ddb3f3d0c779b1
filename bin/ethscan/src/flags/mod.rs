//! Flag groups shared by the subcommands.

mod globals;
pub use globals::GlobalArgs;

mod chain;
pub use chain::ChainArgs;

mod sync;
pub use sync::SyncArgs;

mod database;
pub use database::DatabaseArgs;

mod api;
pub use api::ApiArgs;
