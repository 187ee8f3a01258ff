/// How address components are glued together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressStyle {
    /// `Name, 12 Street, City` as used by most Latin-script addresses.
    Western,
    /// Components concatenated from large to small without separators, as in Chinese
    /// and Japanese addresses.
    Compact,
}

/// Structured address components as returned by a geocoding service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    /// Point of interest or building name.
    pub poi: Option<String>,
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

fn clean(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Joins the non-empty parts, skipping any part equal to the one before it
/// (e.g. a city that is also its own province).
pub fn join_distinct<'a>(parts: impl IntoIterator<Item = &'a str>, separator: &str) -> Option<String> {
    let mut kept: Vec<&str> = Vec::new();
    for part in parts.into_iter().map(str::trim).filter(|part| !part.is_empty()) {
        if kept.last().is_some_and(|last| last.eq_ignore_ascii_case(part)) {
            continue;
        }
        kept.push(part);
    }
    (!kept.is_empty()).then(|| kept.join(separator))
}

impl AddressParts {
    /// Builds the most specific label available.
    ///
    /// When a landmark or street is known the label is that plus its nearest locality.
    /// Otherwise a coarser `district, city, region` label is returned.
    pub fn assemble(&self, style: AddressStyle) -> Option<String> {
        let poi = clean(&self.poi);
        let house_number = clean(&self.house_number);
        let street = clean(&self.street);
        let neighborhood = clean(&self.neighborhood);
        let district = clean(&self.district);
        let city = clean(&self.city);
        let region = clean(&self.region);

        if poi.is_some() || street.is_some() {
            return Some(match style {
                AddressStyle::Western => {
                    let street_line = street.map(|street| match house_number {
                        Some(number) => format!("{number} {street}"),
                        None => street.to_string(),
                    });
                    let locality = neighborhood.or(district).or(city);
                    join_distinct(
                        [poi, street_line.as_deref(), locality, city].into_iter().flatten(),
                        ", ",
                    )?
                }
                AddressStyle::Compact => {
                    let line = join_distinct(
                        [city, district, street, house_number].into_iter().flatten(),
                        "",
                    );
                    match (line, poi) {
                        (Some(line), Some(poi)) => format!("{line} {poi}"),
                        (Some(line), None) => line,
                        (None, Some(poi)) => poi.to_string(),
                        (None, None) => return None,
                    }
                }
            });
        }

        match style {
            AddressStyle::Western => join_distinct(
                [neighborhood, district, city, region].into_iter().flatten(),
                ", ",
            ),
            AddressStyle::Compact => join_distinct(
                [region, city, district, neighborhood].into_iter().flatten(),
                "",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_landmark_with_street() {
        let parts = AddressParts {
            poi: some("Rijksmuseum"),
            house_number: some("1"),
            street: some("Museumstraat"),
            neighborhood: some("Museumkwartier"),
            district: some("Zuid"),
            city: some("Amsterdam"),
            region: some("North Holland"),
        };
        assert_eq!(
            parts.assemble(AddressStyle::Western).as_deref(),
            Some("Rijksmuseum, 1 Museumstraat, Museumkwartier, Amsterdam")
        );
    }

    #[test]
    fn test_street_without_neighborhood_uses_district() {
        let parts = AddressParts {
            street: some("Market Street"),
            district: some("SoMa"),
            city: some("San Francisco"),
            ..Default::default()
        };
        assert_eq!(
            parts.assemble(AddressStyle::Western).as_deref(),
            Some("Market Street, SoMa, San Francisco")
        );
    }

    #[test]
    fn test_coarse_fallback_without_street() {
        let parts = AddressParts {
            district: some("Zuid"),
            city: some("Amsterdam"),
            region: some("North Holland"),
            ..Default::default()
        };
        assert_eq!(
            parts.assemble(AddressStyle::Western).as_deref(),
            Some("Zuid, Amsterdam, North Holland")
        );
    }

    #[test]
    fn test_compact_style() {
        let parts = AddressParts {
            poi: some("故宫博物院"),
            street: some("景山前街"),
            house_number: some("4号"),
            district: some("东城区"),
            city: some("北京市"),
            region: some("北京市"),
            ..Default::default()
        };
        assert_eq!(
            parts.assemble(AddressStyle::Compact).as_deref(),
            Some("北京市东城区景山前街4号 故宫博物院")
        );

        let coarse = AddressParts {
            district: some("东城区"),
            city: some("北京市"),
            region: some("北京市"),
            ..Default::default()
        };
        assert_eq!(coarse.assemble(AddressStyle::Compact).as_deref(), Some("北京市东城区"));
    }

    #[test]
    fn test_blank_parts_yield_nothing() {
        let parts = AddressParts {
            street: some("  "),
            city: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(parts.assemble(AddressStyle::Western), None);
        assert_eq!(AddressParts::default().assemble(AddressStyle::Compact), None);
    }

    #[test]
    fn test_join_distinct_skips_repeats() {
        assert_eq!(
            join_distinct(["Singapore", "singapore", "", "SG"], ", ").as_deref(),
            Some("Singapore, SG")
        );
        assert_eq!(join_distinct([" "], ", "), None);
    }
}
