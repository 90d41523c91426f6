//! Slot extraction from free-form utterances.
//!
//! Each matcher is independent and pure: it looks at the raw or normalized
//! text and either yields a value or nothing. `extract` runs the whole
//! battery and never fails; a field it could not fill is simply `None`.
//! The results are hints, not truths. The state machine re-prompts for
//! anything missing or implausible.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize;
use crate::places::{find_place, is_place_alias, NAME_BLOCKLIST};

/// Largest index a selection may carry before the offer list is consulted.
pub const MAX_SELECTION: usize = 10;

/// Words that never form part of a person's name.
const NON_NAME_WORDS: &[&str] = &[
    "voo", "voos", "para", "hotel", "hoteis", "quero", "preciso", "pessoas", "pessoa",
    "adulto", "adultos", "passagem", "passagens", "comprar", "compra", "reservar", "reserva",
    "consultar", "cancelar", "cancelamento", "viajar", "viagem", "ola", "oi", "bom", "boa",
    "dia", "tarde", "noite", "meu", "minha", "nome", "sou", "eu", "cpf", "pix", "boleto",
    "credito", "debito", "cartao", "dinheiro", "pagamento", "pagar", "forma", "de", "da",
    "do", "das", "dos", "em", "no", "na", "com", "por", "ate", "um", "uma", "opcao",
    "numero", "check", "in", "out", "ida", "volta", "obrigado", "obrigada", "sim", "nao",
];

lazy_static! {
    static ref DATE_DMY_SLASH: Regex = Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap();
    static ref DATE_DMY_DASH: Regex = Regex::new(r"\b(\d{1,2})-(\d{1,2})-(\d{4})\b").unwrap();
    static ref DATE_YMD: Regex = Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap();

    static ref COUNT_WITH_NOUN: Regex = Regex::new(
        r"(\d+)\s*(?:pessoas?|adultos?|passageiros?|people|persons?|passengers?|adults?)\b"
    ).unwrap();
    // The trailing group keeps "para 15/06/2025" from reading as fifteen people.
    static ref COUNT_AFTER_PREPOSITION: Regex =
        Regex::new(r"\b(?:para|for|sao)\s+(\d+)(?:$|[^\d/\-.]|\.(?:$|\D))").unwrap();

    static ref SELECTION_LABELED: Regex =
        Regex::new(r"\b(?:voo|opcao|numero|hotel)\s*(\d+)").unwrap();
    static ref FIRST_INTEGER: Regex = Regex::new(r"(\d+)").unwrap();

    static ref NATIONAL_ID_PUNCTUATED: Regex =
        Regex::new(r"\b(\d{3}\.?\d{3}\.?\d{3}-?\d{2})\b").unwrap();
    static ref NATIONAL_ID_BARE: Regex = Regex::new(r"\b(\d{11})\b").unwrap();

    static ref CAPITALIZED_RUN: Regex = Regex::new(
        r"\b([A-ZÀÁÂÃÉÊÍÓÔÕÚÇ][a-zàáâãéêíóôõúç]+(?:\s+[A-ZÀÁÂÃÉÊÍÓÔÕÚÇ][a-zàáâãéêíóôõúç]+)+)\b"
    ).unwrap();
    static ref ALPHA_WORD: Regex = Regex::new(r"\b[A-Za-zÀ-ÿ]{2,}\b").unwrap();

    static ref RESERVATION: Regex = Regex::new(r"(?i)\b((?:voo|htl)\d{12})\b").unwrap();
}

/// Payment methods the user may claim. Nothing is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Pix,
    Boleto,
    Cash,
}

/// Keyword table scanned in order against normalized text.
const PAYMENT_KEYWORDS: &[(&str, PaymentMethod)] = &[
    ("credito", PaymentMethod::CreditCard),
    ("credit", PaymentMethod::CreditCard),
    ("debito", PaymentMethod::DebitCard),
    ("debit", PaymentMethod::DebitCard),
    ("pix", PaymentMethod::Pix),
    ("boleto", PaymentMethod::Boleto),
    ("dinheiro", PaymentMethod::Cash),
    ("cash", PaymentMethod::Cash),
];

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Cartão de Crédito",
            PaymentMethod::DebitCard => "Cartão de Débito",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Boleto => "Boleto",
            PaymentMethod::Cash => "Dinheiro",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Brazilian CPF in canonical `XXX.XXX.XXX-XX` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// Accepts any punctuation as long as exactly eleven digits remain.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 11 {
            return None;
        }
        Some(Self(format!(
            "{}.{}.{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..]
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn last_four_digits(&self) -> String {
        let digits: Vec<char> = self.0.chars().filter(|c| c.is_ascii_digit()).collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }
}

impl std::fmt::Display for NationalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dates found in one utterance: outbound/check-in and, optionally,
/// return/check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePair {
    pub first: NaiveDate,
    pub second: Option<NaiveDate>,
}

/// Everything the matchers pulled out of a single utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub place: Option<String>,
    pub dates: Option<DatePair>,
    pub passengers: Option<u32>,
    pub selection: Option<usize>,
    pub national_id: Option<NationalId>,
    pub full_name: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    /// A previously issued reservation code, e.g. `VOO890907030905`.
    pub reservation_code: Option<String>,
}

/// Run every matcher over `raw`.
pub fn extract(raw: &str) -> ExtractedFacts {
    let normalized = normalize(raw);

    let facts = ExtractedFacts {
        place: find_place(&normalized).map(str::to_string),
        dates: extract_dates(raw),
        passengers: extract_passengers(&normalized),
        selection: extract_selection(&normalized),
        national_id: extract_national_id(raw),
        full_name: extract_full_name(raw),
        payment_method: extract_payment_method(&normalized),
        reservation_code: extract_reservation_code(raw),
    };

    tracing::debug!(?facts, "extracted slot facts");
    facts
}

/// Every literal date in `raw`, in reading order.
pub fn extract_all_dates(raw: &str) -> Vec<NaiveDate> {
    let mut found: Vec<(usize, usize, NaiveDate)> = Vec::new();

    for (pattern, year_first) in [
        (&*DATE_DMY_SLASH, false),
        (&*DATE_DMY_DASH, false),
        (&*DATE_YMD, true),
    ] {
        for caps in pattern.captures_iter(raw) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let (a, b, c) = (&caps[1], &caps[2], &caps[3]);
            let (year, month, day) = if year_first { (a, b, c) } else { (c, b, a) };
            if let Some(date) = build_date(year, month, day) {
                found.push((whole.start(), whole.end(), date));
            }
        }
    }

    found.sort_by_key(|(start, _, _)| *start);

    let mut dates = Vec::with_capacity(found.len());
    let mut last_end = 0;
    for (start, end, date) in found {
        if start < last_end {
            continue;
        }
        last_end = end;
        dates.push(date);
    }
    dates
}

fn build_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn extract_dates(raw: &str) -> Option<DatePair> {
    let dates = extract_all_dates(raw);
    let first = *dates.first()?;
    Some(DatePair {
        first,
        second: dates.get(1).copied(),
    })
}

fn extract_passengers(normalized: &str) -> Option<u32> {
    [&*COUNT_WITH_NOUN, &*COUNT_AFTER_PREPOSITION]
        .iter()
        .find_map(|pattern| pattern.captures(normalized))
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|count| *count > 0)
}

/// A menu index in `1..=MAX_SELECTION`. A labelled number ("voo 3") wins
/// over the first bare number in the text.
pub fn extract_selection(normalized: &str) -> Option<usize> {
    let in_range = |digits: &str| {
        digits
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=MAX_SELECTION).contains(n))
    };

    SELECTION_LABELED
        .captures(normalized)
        .and_then(|caps| in_range(&caps[1]))
        .or_else(|| {
            FIRST_INTEGER
                .captures(normalized)
                .and_then(|caps| in_range(&caps[1]))
        })
}

fn extract_national_id(raw: &str) -> Option<NationalId> {
    [&*NATIONAL_ID_PUNCTUATED, &*NATIONAL_ID_BARE]
        .iter()
        .flat_map(|pattern| pattern.captures_iter(raw))
        .find_map(|caps| NationalId::parse(&caps[1]))
}

fn is_non_name_word(word: &str) -> bool {
    let word = normalize(word);
    NON_NAME_WORDS.contains(&word.as_str())
}

/// Best-effort payer name: a run of capitalized words first, then any two
/// adjacent words that are neither places nor conversational filler.
pub fn extract_full_name(raw: &str) -> Option<String> {
    capitalized_name(raw).or_else(|| fallback_name(raw))
}

fn capitalized_name(raw: &str) -> Option<String> {
    CAPITALIZED_RUN.find_iter(raw).find_map(|m| {
        let words: Vec<&str> = m.as_str().split_whitespace().collect();
        let start = words.iter().position(|w| !is_non_name_word(w))?;
        let end = words.iter().rposition(|w| !is_non_name_word(w))?;
        let words = &words[start..=end];
        if words.len() < 2 {
            return None;
        }

        let candidate = words.join(" ");
        let lowered = candidate.to_lowercase();
        if is_place_alias(&candidate) || NAME_BLOCKLIST.iter().any(|place| lowered.contains(place)) {
            return None;
        }
        Some(candidate)
    })
}

fn fallback_name(raw: &str) -> Option<String> {
    let words: Vec<&str> = ALPHA_WORD.find_iter(raw).map(|m| m.as_str()).collect();
    words.windows(2).find_map(|pair| {
        let candidate = pair.join(" ");
        let rejected = is_place_alias(&candidate)
            || pair.iter().any(|w| is_non_name_word(w) || is_place_alias(w));
        if rejected {
            None
        } else {
            Some(title_case(&candidate))
        }
    })
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn extract_payment_method(normalized: &str) -> Option<PaymentMethod> {
    PAYMENT_KEYWORDS
        .iter()
        .find(|(keyword, _)| normalized.contains(keyword))
        .map(|(_, method)| *method)
}

fn extract_reservation_code(raw: &str) -> Option<String> {
    RESERVATION
        .captures(raw)
        .map(|caps| caps[1].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_place_and_search_phrase() {
        let facts = extract("quero voo para Lisboa");
        assert_eq!(facts.place.as_deref(), Some("Lisboa"));
        assert_eq!(facts.full_name, None);
        assert_eq!(facts.dates, None);
    }

    #[test]
    fn test_two_dates_in_reading_order() {
        let facts = extract("hotel de 2025-07-20 até 10/07/2025");
        let pair = facts.dates.unwrap();
        assert_eq!(pair.first, date(2025, 7, 20));
        assert_eq!(pair.second, Some(date(2025, 7, 10)));
    }

    #[test]
    fn test_single_date_only_sets_first() {
        let facts = extract("ida em 5-8-2025");
        assert_eq!(
            facts.dates,
            Some(DatePair { first: date(2025, 8, 5), second: None })
        );
    }

    #[test]
    fn test_impossible_calendar_date_dropped() {
        assert!(extract_all_dates("31/02/2025").is_empty());
    }

    #[test]
    fn test_passenger_count_patterns() {
        assert_eq!(extract("somos 3 pessoas").passengers, Some(3));
        assert_eq!(extract("2 adultos para Paris").passengers, Some(2));
        assert_eq!(extract("hotel para 4").passengers, Some(4));
        assert_eq!(extract("São 2").passengers, Some(2));
        assert_eq!(extract("para 15/06/2025").passengers, None);
        assert_eq!(extract("0 pessoas").passengers, None);
    }

    #[test]
    fn test_selection_bounds() {
        assert_eq!(extract_selection("2"), Some(2));
        assert_eq!(extract_selection("quero o voo 10"), Some(10));
        assert_eq!(extract_selection("0"), None);
        assert_eq!(extract_selection("11"), None);
        assert_eq!(extract_selection("nenhum"), None);
    }

    #[test]
    fn test_labeled_selection_beats_bare_number() {
        assert_eq!(extract_selection("somos 2 pessoas, opcao 4"), Some(4));
    }

    #[test]
    fn test_national_id_normalization() {
        let formatted = NationalId::parse("123.456.789-09").unwrap();
        assert_eq!(formatted.as_str(), "123.456.789-09");
        assert_eq!(NationalId::parse(formatted.as_str()), Some(formatted.clone()));
        assert_eq!(NationalId::parse("12345678909"), Some(formatted.clone()));
        assert_eq!(NationalId::parse("123 456 789 09"), Some(formatted.clone()));
        assert_eq!(NationalId::parse("1234567890"), None);
        assert_eq!(formatted.last_four_digits(), "8909");

        let facts = extract("meu cpf é 12345678909");
        assert_eq!(facts.national_id, Some(formatted));
    }

    #[test]
    fn test_capitalized_name() {
        let facts = extract("Maria Silva, 123.456.789-09, pix");
        assert_eq!(facts.full_name.as_deref(), Some("Maria Silva"));
        assert_eq!(facts.payment_method, Some(PaymentMethod::Pix));
    }

    #[test]
    fn test_capitalized_place_is_not_a_name() {
        assert_eq!(extract("Nova York").full_name, None);
        assert_eq!(extract("São Paulo").full_name, None);
        assert_eq!(extract("Rio De Janeiro").full_name, None);
    }

    #[test]
    fn test_greeting_trimmed_from_capitalized_run() {
        assert_eq!(extract_full_name("Olá Ana Costa").as_deref(), Some("Ana Costa"));
    }

    #[test]
    fn test_fallback_name_is_title_cased() {
        assert_eq!(
            extract_full_name("meu nome é joão souza").as_deref(),
            Some("João Souza")
        );
        assert_eq!(extract_full_name("preciso de hotel"), None);
    }

    #[test]
    fn test_payment_keyword_order() {
        assert_eq!(
            extract("cartão de crédito").payment_method,
            Some(PaymentMethod::CreditCard)
        );
        assert_eq!(extract("no débito").payment_method, Some(PaymentMethod::DebitCard));
        assert_eq!(extract("pago em dinheiro").payment_method, Some(PaymentMethod::Cash));
        assert_eq!(extract("boleto").payment_method, Some(PaymentMethod::Boleto));
    }

    #[test]
    fn test_reservation_code() {
        let facts = extract("quero cancelar a reserva voo890907030905");
        assert_eq!(facts.reservation_code.as_deref(), Some("VOO890907030905"));
        assert_eq!(extract("reserva HTL1234").reservation_code, None);
    }

    #[test]
    fn test_nothing_matched() {
        assert_eq!(extract(""), ExtractedFacts::default());
    }
}
