/// Flight and hotel inventory
/// - place name → IATA code resolution
/// - flight offers from the Amadeus Self-Service API (OAuth2 client credentials)
/// - hotel offers from a simulated per-city inventory

use async_trait::async_trait;
use chrono::NaiveDate;
use dialogue_core::{normalize, FlightOffer, HotelOffer, Price};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::AmadeusSettings;
use crate::error::{check_status, CollaboratorError};

#[async_trait]
pub trait TravelSearch: Send + Sync {
    /// IATA city/airport code for a place name, if known
    fn resolve_code(&self, place: &str) -> Option<String>;

    async fn search_flights(
        &self,
        origin_code: &str,
        destination_code: &str,
        departure: NaiveDate,
        adults: u32,
    ) -> Result<Vec<FlightOffer>, CollaboratorError>;

    async fn search_hotels(
        &self,
        city_code: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        rooms: u32,
    ) -> Result<Vec<HotelOffer>, CollaboratorError>;
}

const CITY_CODES: &[(&str, &str)] = &[
    ("lisboa", "LIS"), ("lisbon", "LIS"),
    ("madrid", "MAD"), ("madri", "MAD"),
    ("paris", "CDG"), ("pariz", "CDG"),
    ("londres", "LHR"), ("london", "LHR"),
    ("roma", "FCO"), ("rome", "FCO"), ("italia", "FCO"),
    ("barcelona", "BCN"), ("barca", "BCN"),
    ("berlim", "BER"), ("berlin", "BER"),
    ("amsterda", "AMS"), ("amsterdam", "AMS"),
    ("dublin", "DUB"), ("dublim", "DUB"), ("irlanda", "DUB"), ("ireland", "DUB"),
    ("praga", "PRG"), ("prague", "PRG"),
    ("viena", "VIE"), ("vienna", "VIE"),
    ("zurique", "ZRH"), ("zurich", "ZRH"),
    ("budapeste", "BUD"), ("varsovia", "WAW"), ("atenas", "ATH"), ("istambul", "IST"),
    ("milano", "MXP"), ("milao", "MXP"), ("milan", "MXP"),
    ("veneza", "VCE"), ("venice", "VCE"),
    ("florenca", "FLR"), ("florence", "FLR"), ("napoles", "NAP"),
    ("sao paulo", "GRU"), ("rio de janeiro", "GIG"), ("rio", "GIG"),
    ("brasilia", "BSB"), ("salvador", "SSA"), ("fortaleza", "FOR"), ("recife", "REC"),
    ("manaus", "MAO"), ("curitiba", "CWB"), ("porto alegre", "POA"), ("belo horizonte", "CNF"),
    ("miami", "MIA"), ("nova york", "JFK"), ("nova iorque", "JFK"), ("new york", "JFK"),
    ("los angeles", "LAX"), ("chicago", "ORD"), ("toronto", "YYZ"),
    ("cidade do mexico", "MEX"), ("mexico", "MEX"), ("cancun", "CUN"),
    ("buenos aires", "EZE"), ("lima", "LIM"), ("santiago", "SCL"), ("chile", "SCL"),
    ("bogota", "BOG"),
    ("toquio", "NRT"), ("tokyo", "NRT"), ("seul", "ICN"), ("pequim", "PEK"), ("xangai", "PVG"),
    ("singapura", "SIN"), ("dubai", "DXB"), ("sidney", "SYD"), ("sydney", "SYD"), ("melbourne", "MEL"),
];

lazy_static! {
    static ref CITY_CODE_INDEX: HashMap<&'static str, &'static str> = CITY_CODES.iter().copied().collect();

    /// Nightly EUR rates per city; cities not listed get a generic set.
    static ref SIMULATED_HOTELS: HashMap<&'static str, Vec<(&'static str, u32)>> = {
        let mut m = HashMap::new();
        m.insert("LIS", vec![
            ("Hotel Avenida Palace", 120), ("Memmo Alfama Hotel", 95), ("Lisboa Carmo Hotel", 85),
            ("Hotel do Chiado", 110), ("Browns Downtown Hotel", 75),
        ]);
        m.insert("CDG", vec![
            ("Hotel Eiffel Trocadéro", 150), ("Le Marais Boutique Hotel", 130), ("Montmartre Hotel", 95),
            ("Latin Quarter Hotel", 110), ("Champs Elysées Plaza", 180),
        ]);
        m.insert("FCO", vec![
            ("Hotel Artemide", 140), ("Hotel Forum", 130), ("Hotel Centrale", 95),
            ("NH Collection Palazzo Cinquecento", 150), ("Hotel Quirinale", 120),
        ]);
        m.insert("SCL", vec![
            ("Hotel Plaza San Francisco", 100), ("The Singular Santiago", 140), ("W Santiago", 160),
            ("Hotel Cumbres Lastarria", 90), ("NH Collection Plaza Santiago", 110),
        ]);
        m.insert("DUB", vec![
            ("The Merrion Hotel", 180), ("Trinity City Hotel", 120), ("The Marker Hotel", 150),
            ("Clayton Hotel Burlington Road", 95), ("The Morrison Hotel", 110),
        ]);
        m.insert("GIG", vec![
            ("Copacabana Palace", 250), ("Hotel Fasano Rio de Janeiro", 280), ("Belmond Copacabana Palace", 300),
            ("Porto Bay Rio Internacional", 150), ("Hotel Atlantico Copacabana", 120),
        ]);
        m
    };
}

/// Table lookup on the normalized name; otherwise a bare three-letter
/// word is taken as a code already.
pub fn resolve_city_code(place: &str) -> Option<String> {
    let normalized = normalize(place);
    if normalized.is_empty() {
        return None;
    }
    if let Some(code) = CITY_CODE_INDEX.get(normalized.as_str()) {
        return Some(code.to_string());
    }
    if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(normalized.to_uppercase());
    }
    None
}

/// Simulated hotel inventory for `city_code`
pub fn simulated_hotels(city_code: &str) -> Vec<HotelOffer> {
    let to_offer = |name: String, nightly: u32| HotelOffer {
        name,
        price: Price::new(nightly.to_string(), "EUR"),
    };

    match SIMULATED_HOTELS.get(city_code) {
        Some(hotels) => hotels
            .iter()
            .map(|(name, nightly)| to_offer(name.to_string(), *nightly))
            .collect(),
        None => vec![
            to_offer(format!("Grand Hotel {}", city_code), 100),
            to_offer(format!("{} Plaza Hotel", city_code), 120),
            to_offer(format!("Central {} Hotel", city_code), 85),
            to_offer(format!("{} Boutique Hotel", city_code), 95),
            to_offer(format!("Downtown {} Hotel", city_code), 75),
        ],
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    1799
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct FlightOffersResponse {
    #[serde(default)]
    data: Vec<AmadeusFlightOffer>,
}

#[derive(Debug, Deserialize)]
struct AmadeusFlightOffer {
    price: AmadeusPrice,
    #[serde(default)]
    itineraries: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct AmadeusPrice {
    total: String,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    #[serde(default)]
    duration: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    #[serde(default)]
    carrier_code: String,
    departure: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    #[serde(default)]
    at: String,
}

impl From<AmadeusFlightOffer> for FlightOffer {
    fn from(offer: AmadeusFlightOffer) -> Self {
        let first_itinerary = offer.itineraries.into_iter().next();
        let duration = first_itinerary.as_ref().map(|i| i.duration.clone()).unwrap_or_default();
        let first_segment = first_itinerary.and_then(|i| i.segments.into_iter().next());

        FlightOffer {
            carrier: first_segment
                .as_ref()
                .map(|s| s.carrier_code.clone())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "??".to_string()),
            departure_at: first_segment.map(|s| s.departure.at).unwrap_or_default(),
            duration,
            price: Price::new(offer.price.total, offer.price.currency),
        }
    }
}

/// Amadeus-backed search. Flights need credentials; hotels are simulated
/// and always available.
pub struct AmadeusClient {
    client: reqwest::Client,
    settings: Option<AmadeusSettings>,
    token: Mutex<Option<CachedToken>>,
}

impl AmadeusClient {
    pub fn new(client: reqwest::Client, settings: Option<AmadeusSettings>) -> Self {
        Self {
            client,
            settings,
            token: Mutex::new(None),
        }
    }

    fn settings(&self) -> Result<&AmadeusSettings, CollaboratorError> {
        self.settings
            .as_ref()
            .ok_or(CollaboratorError::NotConfigured("Amadeus credentials"))
    }

    /// Bearer token, refreshed a minute before it expires
    async fn access_token(&self) -> Result<String, CollaboratorError> {
        let settings = self.settings()?;
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        tracing::info!("→ Requesting Amadeus access token");
        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", settings.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = check_status("Amadeus auth", response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode {
                service: "Amadeus auth",
                message: e.to_string(),
            })?;

        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        tracing::info!("✓ Amadeus token valid for {:?}", lifetime);
        Ok(token.access_token)
    }
}

#[async_trait]
impl TravelSearch for AmadeusClient {
    fn resolve_code(&self, place: &str) -> Option<String> {
        resolve_city_code(place)
    }

    async fn search_flights(
        &self,
        origin_code: &str,
        destination_code: &str,
        departure: NaiveDate,
        adults: u32,
    ) -> Result<Vec<FlightOffer>, CollaboratorError> {
        let settings = self.settings()?;
        let token = self.access_token().await?;
        let departure = departure.format("%Y-%m-%d").to_string();
        let adults = adults.max(1).to_string();

        tracing::info!(
            "→ Searching flights {} → {} on {} for {} adult(s)",
            origin_code, destination_code, departure, adults
        );
        let response = self
            .client
            .get(format!("{}/v2/shopping/flight-offers", settings.base_url))
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", origin_code),
                ("destinationLocationCode", destination_code),
                ("departureDate", departure.as_str()),
                ("adults", adults.as_str()),
            ])
            .send()
            .await?;

        let body: FlightOffersResponse = check_status("Amadeus flight offers", response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode {
                service: "Amadeus flight offers",
                message: e.to_string(),
            })?;

        let offers: Vec<FlightOffer> = body.data.into_iter().map(FlightOffer::from).collect();
        tracing::info!("✓ {} flight offer(s) found", offers.len());
        Ok(offers)
    }

    async fn search_hotels(
        &self,
        city_code: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        rooms: u32,
    ) -> Result<Vec<HotelOffer>, CollaboratorError> {
        tracing::info!(
            "→ Simulated hotel inventory for {} ({} → {}, {} room(s))",
            city_code, check_in, check_out, rooms
        );
        Ok(simulated_hotels(city_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_city_code() {
        assert_eq!(resolve_city_code("Lisboa").as_deref(), Some("LIS"));
        assert_eq!(resolve_city_code("São Paulo").as_deref(), Some("GRU"));
        assert_eq!(resolve_city_code("Rio de Janeiro").as_deref(), Some("GIG"));
        assert_eq!(resolve_city_code("Rio").as_deref(), Some("GIG"));
        assert_eq!(resolve_city_code("Cidade do Mexico").as_deref(), Some("MEX"));
        assert_eq!(resolve_city_code("opo").as_deref(), Some("OPO"));
        assert_eq!(resolve_city_code("Atlântida"), None);
        assert_eq!(resolve_city_code(""), None);
    }

    #[test]
    fn test_simulated_hotels() {
        let lisbon = simulated_hotels("LIS");
        assert_eq!(lisbon.len(), 5);
        assert_eq!(lisbon[0].name, "Hotel Avenida Palace");
        assert_eq!(lisbon[0].price, Price::new("120", "EUR"));

        let generic = simulated_hotels("OPO");
        assert_eq!(generic[0].name, "Grand Hotel OPO");
    }

    #[test]
    fn test_flight_offer_mapping() {
        let body: FlightOffersResponse = serde_json::from_value(serde_json::json!({
            "data": [{
                "price": {"total": "612.40", "currency": "EUR"},
                "itineraries": [{
                    "duration": "PT11H35M",
                    "segments": [{"carrierCode": "TP", "departure": {"iataCode": "GRU", "at": "2025-07-15T22:10:00"}}]
                }]
            }, {
                "price": {"total": "700.00"}
            }]
        }))
        .unwrap();
        let offers: Vec<FlightOffer> = body.data.into_iter().map(FlightOffer::from).collect();
        assert_eq!(offers[0].carrier, "TP");
        assert_eq!(offers[0].departure_time(), "22:10");
        assert_eq!(offers[0].duration_label(), "11h35m");
        assert_eq!(offers[1].carrier, "??");
        assert_eq!(offers[1].price.currency, "EUR");
    }

    #[tokio::test]
    async fn test_flights_need_credentials() {
        let client = AmadeusClient::new(reqwest::Client::new(), None);
        let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let result = client.search_flights("GRU", "LIS", date, 1).await;
        assert!(matches!(result, Err(CollaboratorError::NotConfigured(_))));

        let hotels = client.search_hotels("CDG", date, date, 1).await.unwrap();
        assert_eq!(hotels.len(), 5);
    }
}
