//! Referral workflow — structured handoffs of a subject between service
//! points.
//!
//! Two tracks share one engine: the internal track (between teams of one
//! municipality) and the cross-municipality track, which adds a consent
//! requirement, transport logistics milestones, and a per-destination
//! inbox driving "who must act next" views. Both tracks are strictly
//! ordered status ladders; only actors holding the coordinator capability
//! may jump out of order, and every jump is recorded as forced in the
//! event ledger.

pub mod events;
pub mod inbox;
pub mod model;
pub mod service;
pub mod status;
pub mod store;

pub use events::{ReferralEvent, ReferralEventKind};
pub use inbox::ReferralInboxEntry;
pub use model::{Logistics, Milestones, NewReferral, Referral};
pub use service::{LogisticsUpdate, ReferralService};
pub use status::{ReferralStatus, ReferralTrack};
pub use store::{InMemoryReferralStore, ReferralStore};
