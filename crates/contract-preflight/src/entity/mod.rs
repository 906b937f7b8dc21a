//! Party and account identity extraction.
//!
//! Headers and label values feed account resolution; the recital block feeds
//! the check for parties that no resolved account covers.

mod candidates;
mod headers;
mod parties;
mod story;
mod tracks;

pub use candidates::{extract_account_candidates, CandidateSource, ExtractedCandidate};
pub(crate) use candidates::is_borne_in_verb_context;
pub use headers::extract_candidate_headers;
pub use parties::{extract_recital_parties, is_plausible_party_name, normalize_party_candidate};
pub use story::{build_entity_story, EntityRef, EntityStory, EntityStoryPolicy, OnboardingRecommendation};
pub use tracks::{strip_track_listing, track_listing_lines};
