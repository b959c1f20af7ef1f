//! Rendition catalog: what a source URL can be downloaded as

mod builder;
mod descriptor;
mod store;

pub use builder::{build_catalog, CatalogBuilder, CatalogError};
pub use descriptor::{RenditionCatalog, RenditionDescriptor};
pub use store::{CatalogStore, SelectorOutOfRange};
