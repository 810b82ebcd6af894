//! Configuration module

mod site;

pub use site::ListingConfig;
pub use site::PostConfig;
pub use site::SiteConfig;
pub use site::SourceConfig;
