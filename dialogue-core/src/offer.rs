use serde::{Deserialize, Serialize};

/// The only non-local currency the inventory quotes in.
pub const FOREIGN_CURRENCY: &str = "EUR";

/// Fixed EUR → BRL rate used for display approximations.
pub const EUR_TO_BRL: f64 = 6.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Decimal string as quoted by the inventory, e.g. `"245.80"`.
    pub total: String,
    pub currency: String,
}

impl Price {
    pub fn new(total: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            total: total.into(),
            currency: currency.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub carrier: String,
    /// Local departure timestamp, `YYYY-MM-DDTHH:MM:SS`.
    pub departure_at: String,
    /// ISO-8601 duration, e.g. `PT11H35M`.
    pub duration: String,
    pub price: Price,
}

impl FlightOffer {
    pub fn departure_time(&self) -> &str {
        self.departure_at.get(11..16).unwrap_or("??:??")
    }

    /// `PT11H35M` → `11h35m`.
    pub fn duration_label(&self) -> String {
        self.duration
            .trim_start_matches("PT")
            .replace('H', "h")
            .replace('M', "m")
            .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffer {
    pub name: String,
    pub price: Price,
}

/// Where a price is being shown; each spot has its own wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStyle {
    /// Flight menu line: `€245.80 ≈ R$ 1.475`
    Listing,
    /// Hotel menu line, reais not grouped: `€250.00 ≈ R$ 1500/noite`
    Nightly,
    /// Selection acknowledgement: `€245.80 (R$ 1.475)`
    Selection,
    /// Flight booking summary: `R$ 1.475`
    Confirmation,
    /// Hotel booking summary, reais not grouped: `R$ 1500`
    StayTotal,
}

/// Render a price for display. EUR amounts get a BRL approximation; any
/// other currency, or a total that is not a number, is shown verbatim.
pub fn format_price(price: &Price, style: PriceStyle) -> String {
    let converted = if price.currency == FOREIGN_CURRENCY {
        price.total.trim().parse::<f64>().ok().map(|eur| eur * EUR_TO_BRL)
    } else {
        None
    };

    match converted {
        Some(brl) => {
            let whole = brl.round() as i64;
            let reais = group_thousands(whole);
            match style {
                PriceStyle::Listing => format!("€{} ≈ R$ {}", price.total, reais),
                PriceStyle::Nightly => format!("€{} ≈ R$ {}/noite", price.total, whole),
                PriceStyle::Selection => format!("€{} (R$ {})", price.total, reais),
                PriceStyle::Confirmation => format!("R$ {}", reais),
                PriceStyle::StayTotal => format!("R$ {}", whole),
            }
        }
        None => match style {
            PriceStyle::Nightly => format!("{} {}/noite", price.currency, price.total),
            _ => format!("{} {}", price.currency, price.total),
        },
    }
}

/// `1475` → `1.475`, `-1200000` → `-1.200.000`.
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eur_listing_and_confirmation() {
        let price = Price::new("245.80", "EUR");
        assert_eq!(format_price(&price, PriceStyle::Listing), "€245.80 ≈ R$ 1.475");
        assert_eq!(format_price(&price, PriceStyle::Selection), "€245.80 (R$ 1.475)");
        assert_eq!(format_price(&price, PriceStyle::Confirmation), "R$ 1.475");
    }

    #[test]
    fn test_nightly_hotel_price() {
        let price = Price::new("120.00", "EUR");
        assert_eq!(format_price(&price, PriceStyle::Nightly), "€120.00 ≈ R$ 720/noite");
        let usd = Price::new("99.00", "USD");
        assert_eq!(format_price(&usd, PriceStyle::Nightly), "USD 99.00/noite");
    }

    #[test]
    fn test_hotel_prices_not_grouped() {
        let price = Price::new("250.00", "EUR");
        assert_eq!(format_price(&price, PriceStyle::Nightly), "€250.00 ≈ R$ 1500/noite");
        assert_eq!(format_price(&price, PriceStyle::StayTotal), "R$ 1500");
        assert_eq!(format_price(&price, PriceStyle::Confirmation), "R$ 1.500");
    }

    #[test]
    fn test_other_currency_verbatim() {
        let price = Price::new("1500.00", "BRL");
        assert_eq!(format_price(&price, PriceStyle::Listing), "BRL 1500.00");
        assert_eq!(format_price(&price, PriceStyle::Confirmation), "BRL 1500.00");
    }

    #[test]
    fn test_unparseable_total_not_converted() {
        let price = Price::new("N/A", "EUR");
        assert_eq!(format_price(&price, PriceStyle::Listing), "EUR N/A");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1.000");
        assert_eq!(group_thousands(1234567), "1.234.567");
        assert_eq!(group_thousands(-1200000), "-1.200.000");
    }

    #[test]
    fn test_flight_display_fields() {
        let offer = FlightOffer {
            carrier: "TP".into(),
            departure_at: "2025-07-15T22:10:00".into(),
            duration: "PT11H35M".into(),
            price: Price::new("612.40", "EUR"),
        };
        assert_eq!(offer.departure_time(), "22:10");
        assert_eq!(offer.duration_label(), "11h35m");

        let short = FlightOffer { departure_at: "2025".into(), ..offer };
        assert_eq!(short.departure_time(), "??:??");
    }
}
