//! Service layer
//!
//! The pagination controller and the collections built on it.
//! Services orchestrate the API client, the importer and the store.

mod directory;
mod favourites;
mod pagination;
mod relationships;
mod suggest;

pub use directory::{DirectoryOrder, DirectoryParams, DirectoryService};
pub use favourites::FavouritesService;
pub use pagination::{Collection, OperationConfig, Outcome, PaginationController, Paging};
pub use relationships::RelationshipsService;
pub use suggest::SuggestService;
