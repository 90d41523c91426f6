//! Pure dialogue logic for the travel booking agent.
//!
//! Nothing in this crate performs I/O: it normalizes and mines user text for
//! slot values, models the per-user conversation context and renders offers
//! and reservation codes. The service crate drives it turn by turn.

pub mod booking;
pub mod context;
pub mod extract;
pub mod intent;
pub mod normalize;
pub mod offer;
pub mod places;

pub use booking::{reservation_code, BookingKind};
pub use context::{DialogState, SlotData, UserContext, MAX_OFFERS};
pub use extract::{extract, DatePair, ExtractedFacts, NationalId, PaymentMethod};
pub use intent::{Entity, Intent, IntentPrediction};
pub use normalize::normalize;
pub use offer::{format_price, FlightOffer, HotelOffer, Price, PriceStyle};
