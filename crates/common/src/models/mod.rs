//! Domain models shared across ReviewerFinder services
//!
//! - `ManuscriptQuery` / `ExtractedTopics`: the search input
//! - `AuthorRecord` / `ContactInfo`: candidate reviewers
//! - `CandidateScore`, `CoiFlag`, `RankedResult`: the search output

mod author;
mod manuscript;
mod ranking;

pub use author::{AuthorRecord, ContactInfo, MAX_CO_AUTHORS, MAX_TOPICS, OPENALEX_PREFIX};
pub use manuscript::{ExtractedTopics, ManuscriptQuery};
pub use ranking::{
    CandidateScore, CoiFlag, CoiType, RankedResult, RankedReviewer, SearchMetadata, Severity,
};
