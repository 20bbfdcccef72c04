//! `bestie-funding`: sponsorship funding reconciliation engine.
//!
//! Pure engine crate: receives pre-fetched records, returns funding views and
//! merged relationship lists. The only IO seam is the [`SponsorshipSource`]
//! trait, implemented by the store client.

pub mod aggregate;
pub mod calendar;
pub mod collection;
pub mod content;
pub mod decode;
pub mod error;
pub mod merge;
pub mod model;
pub mod money;
pub mod subscription;

pub use aggregate::build_funding_report;
pub use content::{ContentCatalog, ContentSource};
pub use error::FundingError;
pub use merge::{
    attach_funding, load_visible_sponsorships, merge_relationships, SponsorshipSource, Viewer,
};
pub use model::{
    BeneficiaryKey, Frequency, FundingReport, FundingView, PaymentMode, RelationshipView,
    Sponsorship, SponsorshipShare, SponsorshipStatus, ViewerRole, VisibleSponsorship,
};
