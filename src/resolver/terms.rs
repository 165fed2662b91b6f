//! Search-term extraction from crawled location strings.

use crate::models::LocationQuery;

/// Administrative-unit markers scanned for in street addresses.
///
/// Lowercased; candidates are lowercased before the contains test.
/// "thủ đức" is a recurring place name in the crawl that never carries a
/// unit word of its own.
const UNIT_MARKERS: &[&str] = &["quận", "huyện", "phường", "xã", "thị trấn", "thủ đức"];

/// Pick the district token out of an informal location string.
///
/// Splits on `/` or `,`. With several segments the last one is taken,
/// since crawled entries are ordered "Province/District"; a single segment
/// is used as-is.
pub(crate) fn district_token(location: &str) -> Option<String> {
    location
        .split(['/', ','])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Pick the first address segment naming an administrative unit.
pub(crate) fn address_unit_segment(address: &str) -> Option<String> {
    address
        .split(',')
        .map(str::trim)
        .find(|segment| {
            let lowered = segment.to_lowercase();
            UNIT_MARKERS.iter().any(|marker| lowered.contains(marker))
        })
        .map(str::to_string)
}

/// Case variants probed for one term: as given, lowercased, uppercased.
///
/// Crawled data capitalizes inconsistently, so every variant is OR-ed into
/// the directory query. Duplicates collapse (an already-lowercase term
/// yields two variants, not three).
pub(crate) fn case_variants(term: &str) -> Vec<String> {
    let mut variants = vec![term.to_string()];
    for candidate in [term.to_lowercase(), term.to_uppercase()] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Ordered search terms for a query.
///
/// The district token comes first since it is the more specific hint;
/// the raw province hint follows. The address is only consulted when
/// `location` yields no token.
pub(crate) fn search_terms(query: &LocationQuery) -> Vec<String> {
    let mut terms = Vec::new();

    let token = query
        .location
        .as_deref()
        .and_then(district_token)
        .or_else(|| query.address.as_deref().and_then(address_unit_segment));
    if let Some(token) = token {
        terms.push(token);
    }

    if let Some(province) = query.province.as_deref() {
        let province = province.trim();
        if !province.is_empty() {
            terms.push(province.to_string());
        }
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_segment_wins() {
        assert_eq!(
            district_token("Sài Gòn/Bình Tân"),
            Some("Bình Tân".to_string())
        );
        assert_eq!(
            district_token("Hà Nội, Đống Đa"),
            Some("Đống Đa".to_string())
        );
    }

    #[test]
    fn test_single_segment_used_as_is() {
        assert_eq!(district_token("Quận 1"), Some("Quận 1".to_string()));
    }

    #[test]
    fn test_blank_location_yields_no_token() {
        assert_eq!(district_token(""), None);
        assert_eq!(district_token("  /  "), None);
    }

    #[test]
    fn test_address_marker_segment() {
        assert_eq!(
            address_unit_segment("12 Nguyễn Huệ, Quận 1, TP.HCM"),
            Some("Quận 1".to_string())
        );
        // first matching segment wins
        assert_eq!(
            address_unit_segment("Phường 4, Quận 8"),
            Some("Phường 4".to_string())
        );
        assert_eq!(address_unit_segment("12 Nguyễn Huệ"), None);
    }

    #[test]
    fn test_address_marker_ignores_case() {
        assert_eq!(
            address_unit_segment("5 Lê Lợi, QUẬN 3"),
            Some("QUẬN 3".to_string())
        );
    }

    #[test]
    fn test_case_variants_dedup() {
        assert_eq!(
            case_variants("Bình Tân"),
            vec!["Bình Tân", "bình tân", "BÌNH TÂN"]
        );
        assert_eq!(case_variants("quận 1"), vec!["quận 1", "QUẬN 1"]);
    }

    #[test]
    fn test_term_order_token_then_province() {
        let query = LocationQuery {
            location: Some("Sài Gòn/Bình Tân".to_string()),
            province: Some("Hồ Chí Minh".to_string()),
            address: None,
        };
        assert_eq!(search_terms(&query), vec!["Bình Tân", "Hồ Chí Minh"]);
    }

    #[test]
    fn test_empty_location_falls_back_to_address() {
        let query = LocationQuery {
            location: Some("".to_string()),
            province: None,
            address: Some("12 Nguyễn Huệ, Quận 1, TP.HCM".to_string()),
        };
        assert_eq!(search_terms(&query), vec!["Quận 1"]);
    }

    #[test]
    fn test_address_ignored_when_location_has_token() {
        let query = LocationQuery {
            location: Some("Quận 7".to_string()),
            province: None,
            address: Some("3 Trần Hưng Đạo, Quận 5".to_string()),
        };
        assert_eq!(search_terms(&query), vec!["Quận 7"]);
    }
}
