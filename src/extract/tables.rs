//! Fixed lookup tables for the catalog source
//!
//! The source publishes in Russian; month names, category tags and resort
//! names below are matched case-insensitively against lowercased page text.

use crate::extract::TourCategory;

/// Duration assumed when the title does not state one
pub const DEFAULT_DURATION_DAYS: u32 = 7;

/// Placeholder location for pages where none could be found
pub const UNKNOWN_LOCATION: &str = "Не указано";

/// Month names: genitive (as used in dates), nominative and abbreviations
const MONTHS: &[(&str, u32)] = &[
    ("января", 1),
    ("январь", 1),
    ("янв", 1),
    ("февраля", 2),
    ("февраль", 2),
    ("фев", 2),
    ("марта", 3),
    ("март", 3),
    ("мар", 3),
    ("апреля", 4),
    ("апрель", 4),
    ("апр", 4),
    ("мая", 5),
    ("май", 5),
    ("июня", 6),
    ("июнь", 6),
    ("июн", 6),
    ("июля", 7),
    ("июль", 7),
    ("июл", 7),
    ("августа", 8),
    ("август", 8),
    ("авг", 8),
    ("сентября", 9),
    ("сентябрь", 9),
    ("сент", 9),
    ("сен", 9),
    ("октября", 10),
    ("октябрь", 10),
    ("окт", 10),
    ("ноября", 11),
    ("ноябрь", 11),
    ("ноя", 11),
    ("декабря", 12),
    ("декабрь", 12),
    ("дек", 12),
];

/// Tag text shown on item pages, mapped to a category
const CATEGORY_TAGS: &[(&str, TourCategory)] = &[
    ("групповой тур", TourCategory::Group),
    ("групповые туры", TourCategory::Group),
    ("индивидуальный тур", TourCategory::Individual),
    ("индивидуальные туры", TourCategory::Individual),
    ("тур выходного дня", TourCategory::Weekend),
    ("туры выходного дня", TourCategory::Weekend),
    ("выходного дня", TourCategory::Weekend),
    ("школьные туры", TourCategory::School),
    ("для школьников", TourCategory::School),
    ("корпоративные туры", TourCategory::Corporate),
    ("корпоративный тур", TourCategory::Corporate),
    ("экскурсия", TourCategory::Excursion),
    ("экскурсии", TourCategory::Excursion),
];

/// Destinations recognized in free text when no lodging marker is present
pub const KNOWN_LOCATIONS: &[&str] = &[
    "Кисловодск",
    "Пятигорск",
    "Ессентуки",
    "Железноводск",
    "Минеральные Воды",
    "Домбай",
    "Архыз",
    "Теберда",
    "Приэльбрусье",
    "Эльбрус",
    "Нальчик",
    "Владикавказ",
    "Грозный",
    "Махачкала",
    "Дербент",
    "Сочи",
    "Красная Поляна",
];

/// Resolves a month name to its number (1-12)
///
/// Accepts any casing and an abbreviation dot.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    MONTHS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, number)| *number)
}

/// Resolves a tag label to a category
pub fn category_for_tag(tag: &str) -> Option<TourCategory> {
    let tag = tag.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    CATEGORY_TAGS
        .iter()
        .find(|(label, _)| *label == tag)
        .map(|(_, category)| *category)
}

/// Lists the known destinations mentioned in `text`, in table order
pub fn known_locations_in(text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    KNOWN_LOCATIONS
        .iter()
        .filter(|name| haystack.contains(&name.to_lowercase()))
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("марта"), Some(3));
        assert_eq!(month_number("Июня"), Some(6));
        assert_eq!(month_number("сент."), Some(9));
        assert_eq!(month_number("дек"), Some(12));
        assert_eq!(month_number("мартобря"), None);
        assert_eq!(month_number(""), None);
    }

    #[test]
    fn test_category_for_tag() {
        assert_eq!(
            category_for_tag("  Туры   выходного дня "),
            Some(TourCategory::Weekend)
        );
        assert_eq!(category_for_tag("Экскурсии"), Some(TourCategory::Excursion));
        assert_eq!(category_for_tag("Круизы"), None);
    }

    #[test]
    fn test_known_locations_in() {
        let found = known_locations_in("Отдых в Кисловодске и поездка на ЭЛЬБРУС");
        assert_eq!(found, vec!["Кисловодск", "Эльбрус"]);
        assert!(known_locations_in("Морской круиз").is_empty());
    }
}
