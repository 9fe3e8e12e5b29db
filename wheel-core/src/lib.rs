//! Game rules for a timed prize wheel: weighted sectors, winner resolution,
//! per-owner spin sessions and the lookups late joiners use to find them.

pub mod registry;
pub mod resolver;
pub mod rotation;
pub mod session;
pub mod store;

pub use registry::{parse_weight, Participant, ParticipantRegistry, RegistryError, Sector};
pub use resolver::{pointer_relative_angle, resolve, sector_at};
pub use rotation::{FixedRotation, RngRotation, RotationSource, MAX_ROTATION, MIN_ROTATION};
pub use session::{GameError, GameSession, OwnerId, SpinPhase, SpinPlan, ANONYMOUS_OWNER};
pub use store::{
    confirm_chain, status_chain, Eligibility, Lookup, SessionSource, SessionStore,
};
