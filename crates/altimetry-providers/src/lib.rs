//! Concrete [`altimetry_core::provider::ProviderAdapter`] implementations
//! (spec §4.1) plus shared HTTP plumbing and in-process test fakes.

pub mod bibtex;
pub mod crossref;
pub mod dryad;
pub mod fakes;
pub mod github;
pub mod http;
pub mod mendeley;
pub mod microsoft_academic;
pub mod pmc;
pub mod pubmed;
pub mod slideshare;
pub mod webpage;
pub mod wikipedia;

pub use bibtex::Bibtex;
pub use crossref::CrossRef;
pub use dryad::Dryad;
pub use fakes::FakeProvider;
pub use github::GitHub;
pub use mendeley::Mendeley;
pub use microsoft_academic::MicrosoftAcademic;
pub use pmc::Pmc;
pub use pubmed::PubMed;
pub use slideshare::Slideshare;
pub use webpage::Webpage;
pub use wikipedia::Wikipedia;
