//! Hand-curated place → coordinate table.
//!
//! Consulted before any computed resolution and never mutated at runtime.
//! Entries use the exact place strings the report template produces; country
//! names double as targets for the country-level fallback tier.

use std::collections::HashMap;

use crate::models::Coordinates;

/// Curated entries for places the external geocoder gets wrong or cannot
/// parse, plus country centroids for the fallback tier.
const CURATED: &[(&str, f64, f64)] = &[
    ("페루, 리마, Plaza San Martín", -12.0505, -77.0339),
    ("페루, 리마", -12.0464, -77.0428),
    ("페루, 리마, Comas", -11.9333, -77.0500),
    ("페루, 리마 & Callao", -12.0464, -77.0428),
    ("볼리비아, 라파스", -16.4897, -68.1193),
    ("미국, 콜로라도, Aurora", 39.7294, -104.8319),
    ("아르헨티나", -38.4161, -63.6167),
    ("벨리즈", 17.1899, -88.4976),
    ("볼리비아", -16.2902, -63.5887),
    ("브라질", -14.2350, -51.9253),
    ("칠레", -35.6751, -71.5430),
    ("콜롬비아", 4.5709, -74.2973),
    ("코스타리카", 9.7489, -83.7534),
    ("쿠바", 21.5218, -77.7812),
    ("도미니카 공화국", 18.7357, -70.1627),
    ("에콰도르", -1.8312, -78.1834),
    ("엘살바도르", 13.7942, -88.8965),
    ("과테말라", 15.7835, -90.2308),
    ("온두라스", 15.2000, -86.2419),
    ("멕시코", 23.6345, -102.5528),
    ("니카라과", 12.8654, -85.2072),
    ("파나마", 8.5380, -80.7821),
    ("파라과이", -23.4425, -58.4438),
    ("페루", -9.1900, -75.0152),
    ("우루과이", -32.5228, -55.7658),
    ("베네수엘라", 6.4238, -66.5897),
    ("아이티", 18.9712, -72.2852),
    ("자메이카", 18.1096, -77.2975),
    ("푸에르토리코", 18.2208, -66.5901),
    ("트리니다드 토바고", 10.6918, -61.2225),
    ("가이아나", 4.8604, -58.9302),
    ("수리남", 3.9193, -56.0278),
    ("프랑스령 기아나", 3.9339, -53.1258),
];

/// Build the override table: curated entries plus any `[overrides]` config
/// entries. Config entries win on key collision so deployments can correct
/// the curated data without a rebuild.
pub fn override_table(extra: &HashMap<String, [f64; 2]>) -> HashMap<String, Coordinates> {
    let mut table: HashMap<String, Coordinates> = CURATED
        .iter()
        .map(|(place, lat, lon)| (place.to_string(), Coordinates::new(*lat, *lon)))
        .collect();
    for (place, coords) in extra {
        table.insert(place.clone(), Coordinates::new(coords[0], coords[1]));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_entries_present() {
        let table = override_table(&HashMap::new());
        let lima = table["페루, 리마"];
        assert_eq!(lima.latitude, -12.0464);
        assert_eq!(lima.longitude, -77.0428);
        assert!(table.contains_key("과테말라"));
    }

    #[test]
    fn config_entries_override_curated() {
        let extra = HashMap::from([("페루".to_string(), [-9.0, -75.0])]);
        let table = override_table(&extra);
        assert_eq!(table["페루"].latitude, -9.0);
        // Untouched curated entry survives the merge.
        assert_eq!(table["칠레"].latitude, -35.6751);
    }
}
