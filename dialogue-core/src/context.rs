//! Per-user conversation context.
//!
//! A `UserContext` carries the dialogue state, the slots accumulated over
//! previous turns and the offer menus from the last search. Slots only ever
//! move forward: a turn that extracts nothing for a slot leaves it alone.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::extract::{ExtractedFacts, NationalId, PaymentMethod};
use crate::intent::{Intent, IntentPrediction};
use crate::offer::{FlightOffer, HotelOffer};

/// Upper bound on the offers kept as a selectable menu.
pub const MAX_OFFERS: usize = 5;

/// Where the conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DialogState {
    #[default]
    Idle,
    WaitingFlightSelection,
    WaitingPayment,
    WaitingHotelDetails,
    WaitingHotelPayment,
    WaitingCancellationInfo,
}

impl DialogState {
    /// States that are collecting name, national ID and payment method.
    pub fn collects_payment(&self) -> bool {
        matches!(self, DialogState::WaitingPayment | DialogState::WaitingHotelPayment)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DialogState::Idle => "IDLE",
            DialogState::WaitingFlightSelection => "WAITING_FLIGHT_SELECTION",
            DialogState::WaitingPayment => "WAITING_PAYMENT",
            DialogState::WaitingHotelDetails => "WAITING_HOTEL_DETAILS",
            DialogState::WaitingHotelPayment => "WAITING_HOTEL_PAYMENT",
            DialogState::WaitingCancellationInfo => "WAITING_CANCELLATION_INFO",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "IDLE" => Some(DialogState::Idle),
            "WAITING_FLIGHT_SELECTION" => Some(DialogState::WaitingFlightSelection),
            "WAITING_PAYMENT" => Some(DialogState::WaitingPayment),
            "WAITING_HOTEL_DETAILS" => Some(DialogState::WaitingHotelDetails),
            "WAITING_HOTEL_PAYMENT" => Some(DialogState::WaitingHotelPayment),
            "WAITING_CANCELLATION_INFO" => Some(DialogState::WaitingCancellationInfo),
            _ => None,
        }
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DialogState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Anything that is not a known label comes back as `Idle`.
impl<'de> Deserialize<'de> for DialogState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .and_then(DialogState::from_label)
            .unwrap_or_else(|| {
                tracing::warn!(state = %raw, "⚠️  Unknown dialogue state, falling back to IDLE");
                DialogState::Idle
            }))
    }
}

fn lenient_intent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Intent>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(Intent::from_label))
}

/// Slots gathered across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotData {
    pub destination: Option<String>,
    pub origin: Option<String>,
    pub outbound_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub passengers: Option<u32>,
    pub full_name: Option<String>,
    pub national_id: Option<NationalId>,
    pub payment_method: Option<PaymentMethod>,
    pub selected_flight: Option<FlightOffer>,
    pub selected_flight_index: Option<usize>,
    pub selected_hotel: Option<HotelOffer>,
    pub selected_hotel_index: Option<usize>,
    pub reservation_code: Option<String>,
}

fn put_text(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(value.to_string());
    }
}

fn put<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
    if let Some(value) = value {
        *slot = Some(value.clone());
    }
}

impl SlotData {
    /// Apply the facts of one utterance. Only present, non-empty values
    /// replace what is already stored. The payer name is left out: see
    /// [`UserContext::merge`].
    pub fn merge(&mut self, facts: &ExtractedFacts) {
        put_text(&mut self.destination, facts.place.as_deref());

        if let Some(dates) = facts.dates {
            self.outbound_date = Some(dates.first);
            self.check_in = Some(dates.first);
            if let Some(second) = dates.second {
                self.return_date = Some(second);
                self.check_out = Some(second);
            }
        }

        put(&mut self.passengers, facts.passengers.filter(|n| *n > 0).as_ref());
        put(&mut self.national_id, facts.national_id.as_ref());
        put(&mut self.payment_method, facts.payment_method.as_ref());
        put_text(&mut self.reservation_code, facts.reservation_code.as_deref());
    }

    /// Classifier entities: `Cidade` then `Destino` for the destination,
    /// `Origem` for the origin.
    pub fn merge_entities(&mut self, prediction: &IntentPrediction) {
        put_text(&mut self.destination, prediction.entity("Cidade"));
        put_text(&mut self.destination, prediction.entity("Destino"));
        put_text(&mut self.origin, prediction.entity("Origem"));
    }

    pub fn merge_name(&mut self, facts: &ExtractedFacts) {
        put_text(&mut self.full_name, facts.full_name.as_deref());
    }

    pub fn has_payment_details(&self) -> bool {
        self.full_name.is_some() && self.national_id.is_some() && self.payment_method.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub state: DialogState,
    #[serde(default)]
    pub data: SlotData,
    #[serde(default, deserialize_with = "lenient_intent")]
    pub last_intent: Option<Intent>,
    #[serde(default)]
    pub flight_offers: Vec<FlightOffer>,
    #[serde(default)]
    pub hotel_offers: Vec<HotelOffer>,
}

impl UserContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to `Idle` with nothing remembered.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Merge one turn's facts. A guessed name only counts while payment
    /// details are being collected; anywhere else it is usually a greeting
    /// or a request ("Tudo Bem", "Me Ajuda").
    pub fn merge(&mut self, facts: &ExtractedFacts) {
        self.data.merge(facts);
        if self.state.collects_payment() {
            self.data.merge_name(facts);
        }
    }

    pub fn set_flight_offers(&mut self, mut offers: Vec<FlightOffer>) {
        offers.truncate(MAX_OFFERS);
        self.flight_offers = offers;
    }

    pub fn set_hotel_offers(&mut self, mut offers: Vec<HotelOffer>) {
        offers.truncate(MAX_OFFERS);
        self.hotel_offers = offers;
    }

    /// The flight at 1-based `index`, if the menu has one there.
    pub fn flight_at(&self, index: usize) -> Option<&FlightOffer> {
        index.checked_sub(1).and_then(|i| self.flight_offers.get(i))
    }

    pub fn hotel_at(&self, index: usize) -> Option<&HotelOffer> {
        index.checked_sub(1).and_then(|i| self.hotel_offers.get(i))
    }
}
