use lazy_static::lazy_static;

use crate::normalize::normalize;

/// Known place spellings mapped to the canonical place name.
///
/// Order matters: lookups stop at the first alias contained in the text.
pub const PLACE_ALIASES: &[(&str, &str)] = &[
    ("zurique", "Zurique"),
    ("zurich", "Zurique"),
    ("lisboa", "Lisboa"),
    ("lisbon", "Lisboa"),
    ("paris", "Paris"),
    ("pariz", "Paris"),
    ("dublin", "Dublin"),
    ("dublim", "Dublin"),
    ("londres", "Londres"),
    ("london", "Londres"),
    ("roma", "Roma"),
    ("rome", "Roma"),
    ("madrid", "Madrid"),
    ("madri", "Madrid"),
    ("barcelona", "Barcelona"),
    ("barça", "Barcelona"),
    ("berlim", "Berlim"),
    ("berlin", "Berlim"),
    ("amsterdam", "Amsterdam"),
    ("amsterda", "Amsterdam"),
    ("praga", "Praga"),
    ("prague", "Praga"),
    ("viena", "Viena"),
    ("vienna", "Viena"),
    ("nova york", "Nova York"),
    ("new york", "Nova York"),
    ("ny", "Nova York"),
    ("miami", "Miami"),
    ("tokyo", "Tokyo"),
    ("toquio", "Tokyo"),
    ("dubai", "Dubai"),
    ("dubay", "Dubai"),
    ("sao paulo", "São Paulo"),
    ("são paulo", "São Paulo"),
    ("sampa", "São Paulo"),
    ("rio", "Rio de Janeiro"),
    ("rio de janeiro", "Rio de Janeiro"),
    ("rj", "Rio de Janeiro"),
    ("italia", "Roma"),
    ("italy", "Roma"),
    ("irlanda", "Dublin"),
    ("ireland", "Dublin"),
    ("milano", "Milano"),
    ("milan", "Milano"),
    ("veneza", "Veneza"),
    ("venice", "Veneza"),
    ("florenca", "Florenca"),
    ("florence", "Florenca"),
    ("janeiro", "Rio de Janeiro"),
    ("chile", "Santiago"),
    ("santiago", "Santiago"),
    ("buenos aires", "Buenos Aires"),
    ("buenosaires", "Buenos Aires"),
    ("lima", "Lima"),
    ("bogota", "Bogota"),
    ("bogotá", "Bogota"),
    ("mexico", "Cidade do Mexico"),
    ("méxico", "Cidade do Mexico"),
    ("cancun", "Cancun"),
    ("brasilia", "Brasília"),
    ("brasília", "Brasília"),
    ("salvador", "Salvador"),
    ("fortaleza", "Fortaleza"),
    ("recife", "Recife"),
    ("manaus", "Manaus"),
];

/// Well-known place fragments that disqualify a capitalized run as a name.
pub const NAME_BLOCKLIST: &[&str] = &["paris", "roma", "lisboa", "dublin", "londres", "janeiro"];

lazy_static! {
    static ref NORMALIZED_ALIASES: Vec<(String, &'static str)> = PLACE_ALIASES
        .iter()
        .map(|(alias, canonical)| (normalize(alias), *canonical))
        .collect();
}

/// First canonical place whose alias occurs anywhere in `normalized_text`.
pub fn find_place(normalized_text: &str) -> Option<&'static str> {
    NORMALIZED_ALIASES
        .iter()
        .find(|(alias, _)| normalized_text.contains(alias.as_str()))
        .map(|(_, canonical)| *canonical)
}

/// Whether `text` is exactly one of the known aliases, ignoring case and accents.
pub fn is_place_alias(text: &str) -> bool {
    let needle = normalize(text);
    NORMALIZED_ALIASES.iter().any(|(alias, _)| *alias == needle)
}
