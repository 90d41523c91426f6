use serde::{Deserialize, Serialize};

/// Coarse user goal as labelled by the intent classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "ComprarVoos")]
    BuyFlight,
    #[serde(rename = "ConsultarVoos")]
    SearchFlight,
    #[serde(rename = "CancelarVoos")]
    CancelFlight,
    #[serde(rename = "ReservarHotel")]
    BookHotel,
    #[serde(rename = "ConsultarHotel")]
    SearchHotel,
    #[serde(rename = "CancelarHotel")]
    CancelHotel,
}

impl Intent {
    /// Map a classifier label onto a known intent; anything else is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ComprarVoos" => Some(Intent::BuyFlight),
            "ConsultarVoos" => Some(Intent::SearchFlight),
            "CancelarVoos" => Some(Intent::CancelFlight),
            "ReservarHotel" => Some(Intent::BookHotel),
            "ConsultarHotel" => Some(Intent::SearchHotel),
            "CancelarHotel" => Some(Intent::CancelHotel),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Intent::BuyFlight => "ComprarVoos",
            Intent::SearchFlight => "ConsultarVoos",
            Intent::CancelFlight => "CancelarVoos",
            Intent::BookHotel => "ReservarHotel",
            Intent::SearchHotel => "ConsultarHotel",
            Intent::CancelHotel => "CancelarHotel",
        }
    }

    pub fn is_flight(&self) -> bool {
        matches!(self, Intent::BuyFlight | Intent::SearchFlight | Intent::CancelFlight)
    }

    pub fn is_hotel(&self) -> bool {
        matches!(self, Intent::BookHotel | Intent::SearchHotel | Intent::CancelHotel)
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Intent::CancelFlight | Intent::CancelHotel)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A labelled span the classifier found in the utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub category: String,
    pub text: String,
}

/// Classifier output: the top intent (if recognized) plus its entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub top_intent: Option<Intent>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl IntentPrediction {
    pub fn new(top_intent: Option<Intent>) -> Self {
        Self {
            top_intent,
            entities: Vec::new(),
        }
    }

    /// Text of the last non-empty entity in `category`, matching how later
    /// entities of the same category shadow earlier ones.
    pub fn entity(&self, category: &str) -> Option<&str> {
        self.entities
            .iter()
            .rev()
            .find(|e| e.category == category && !e.text.trim().is_empty())
            .map(|e| e.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip_and_families() {
        for label in ["ComprarVoos", "ConsultarVoos", "CancelarVoos"] {
            let intent = Intent::from_label(label).unwrap();
            assert!(intent.is_flight());
            assert_eq!(intent.label(), label);
        }
        assert!(Intent::from_label("ReservarHotel").unwrap().is_hotel());
        assert_eq!(Intent::from_label("None"), None);
    }

    #[test]
    fn test_entity_lookup_prefers_last() {
        let prediction = IntentPrediction {
            top_intent: Some(Intent::SearchFlight),
            entities: vec![
                Entity { category: "Destino".into(), text: "Paris".into() },
                Entity { category: "Destino".into(), text: "Roma".into() },
                Entity { category: "Origem".into(), text: "  ".into() },
            ],
        };
        assert_eq!(prediction.entity("Destino"), Some("Roma"));
        assert_eq!(prediction.entity("Origem"), None);
    }
}
