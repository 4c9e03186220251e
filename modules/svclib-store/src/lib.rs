//! Artifact stores: [`results`] writes brand-new result files and hands
//! back URLs for them; [`scratch`] fetches other services' result URLs
//! into a local, content-addressed cache.

pub mod errors;
pub mod extension;
pub mod result;
pub mod results;
pub mod scratch;

pub use errors::StoreError;
pub use extension::extension_for;
pub use result::{FileResult, Location};
pub use results::{HttpFileResults, LocalFileResults, Results};
pub use scratch::{DefaultScratch, Scratch};
