//! Item page extractor
//!
//! Turns the HTML of one catalog item into a [`CatalogItem`]. Only the title
//! is mandatory; every other field has a fallback chain that ends in a
//! default, because the source markup is not under our control and one
//! missing field must not cost the whole item.

use crate::extract::tables::{
    category_for_tag, known_locations_in, DEFAULT_DURATION_DAYS, UNKNOWN_LOCATION,
};
use crate::extract::{CatalogItem, DateRangeParser, ScheduleRange, TourCategory};
use crate::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Heading text that introduces the departure list, lowercased
const SCHEDULE_LABEL: &str = "ближайшие даты";

/// Longer texts are content, not a heading
const SCHEDULE_LABEL_MAX_CHARS: usize = 40;

/// How many ancestors of a label are searched for a following list
const LIST_SEARCH_DEPTH: usize = 4;

/// Extractor for catalog item pages
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    dates: DateRangeParser,
    default_currency: String,
    duration: Regex,
    lodging_inline: Regex,
    lodging_split: Regex,
}

impl ItemExtractor {
    /// Creates an extractor
    ///
    /// `default_currency` is used when the page carries no price currency.
    pub fn new(dates: DateRangeParser, default_currency: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            dates,
            default_currency: default_currency.to_string(),
            duration: Regex::new(r"(?i)\b(\d{1,3})\s*(?:дней|дня|день|дн)")?,
            // "Проживание: Кисловодск, Пятигорск"
            lodging_inline: Regex::new(r"(?i)Проживание:\s*([^<]+)")?,
            // "<b>Проживание:</b> <span>Кисловодск</span>"
            lodging_split: Regex::new(
                r"(?i)Проживание:?\s*</[a-z0-9]+>\s*(?:<[^>]+>\s*)*([^<]+)",
            )?,
        })
    }

    /// The date parser used for schedule entries
    pub fn date_parser(&self) -> &DateRangeParser {
        &self.dates
    }

    /// Extracts an item from its page
    ///
    /// Fails only when the page has no title or the URL has no slug.
    pub fn extract(&self, html: &str, url: &str) -> Result<CatalogItem, ExtractError> {
        let slug = slug_from_url(url).ok_or_else(|| ExtractError::MissingSlug {
            url: url.to_string(),
        })?;

        let document = Html::parse_document(html);

        let name = extract_title(&document).ok_or_else(|| ExtractError::MissingTitle {
            url: url.to_string(),
        })?;

        let item = CatalogItem {
            slug,
            source_url: url.to_string(),
            price: extract_price(&document).unwrap_or(0),
            currency: extract_currency(&document)
                .unwrap_or_else(|| self.default_currency.clone()),
            category: extract_category(&document).unwrap_or_default(),
            duration_days: self.duration_from_title(&name),
            locations: self.extract_locations(html, &document),
            schedules: self.extract_schedules(&document),
            description: extract_description(&document),
            name,
        };

        tracing::debug!(
            "Extracted '{}' ({} schedules, {} locations) from {}",
            item.name,
            item.schedules.len(),
            item.locations.len(),
            url
        );

        Ok(item)
    }

    /// Reads "<n> дней" from the title, falling back to the default duration
    fn duration_from_title(&self, title: &str) -> u32 {
        self.duration
            .captures(title)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_DURATION_DAYS)
    }

    /// Locations, trying each source in turn until one yields something
    fn extract_locations(&self, html: &str, document: &Html) -> Vec<String> {
        let inline = collect_locations(&self.lodging_inline, html);
        if !inline.is_empty() {
            return inline;
        }

        let split = collect_locations(&self.lodging_split, html);
        if !split.is_empty() {
            return split;
        }

        let from_description = meta_content(document, r#"meta[name="description"]"#)
            .map(|text| known_locations_in(&text))
            .unwrap_or_default();
        if !from_description.is_empty() {
            return from_description;
        }

        vec![UNKNOWN_LOCATION.to_string()]
    }

    /// Parses the departure list that follows a "Ближайшие даты" heading
    ///
    /// Every element labelled that way is tried in document order, and the
    /// first list that yields at least one range wins. A nav link or tab with
    /// the same text may sit in front of an unrelated list.
    fn extract_schedules(&self, document: &Html) -> Vec<ScheduleRange> {
        let (Ok(any), Ok(lists), Ok(li)) = (
            Selector::parse("body *"),
            Selector::parse("ul, ol"),
            Selector::parse("li"),
        ) else {
            return Vec::new();
        };

        document
            .select(&any)
            .filter(|element| is_schedule_label(element, &lists))
            .filter_map(|label| list_after(label, &lists))
            .map(|list| self.parse_schedule_list(list, &li))
            .find(|schedules| !schedules.is_empty())
            .unwrap_or_default()
    }

    /// Entries in an unknown format are skipped; duplicates are dropped.
    fn parse_schedule_list(&self, list: ElementRef<'_>, li: &Selector) -> Vec<ScheduleRange> {
        let mut schedules = Vec::new();
        for entry in list.select(li) {
            let text = clean_text(&entry.text().collect::<Vec<_>>().join(" "));
            if let Some(range) = self.dates.parse(&text) {
                if !schedules.contains(&range) {
                    schedules.push(range);
                }
            }
        }
        schedules
    }
}

fn is_schedule_label(element: &ElementRef<'_>, lists: &Selector) -> bool {
    let text = clean_text(&element.text().collect::<Vec<_>>().join(" ")).to_lowercase();
    text.starts_with(SCHEDULE_LABEL)
        && text.chars().count() <= SCHEDULE_LABEL_MAX_CHARS
        && element.select(lists).next().is_none()
}

/// First `ul`/`ol` after `label`, found among its following siblings or
/// those of its nearest ancestors
fn list_after<'a>(label: ElementRef<'a>, lists: &Selector) -> Option<ElementRef<'a>> {
    let mut node = *label;
    for _ in 0..LIST_SEARCH_DEPTH {
        for sibling in node.next_siblings().filter_map(ElementRef::wrap) {
            if matches!(sibling.value().name(), "ul" | "ol") {
                return Some(sibling);
            }
            if let Some(nested) = sibling.select(lists).next() {
                return Some(nested);
            }
        }
        node = node.parent()?;
    }
    None
}

/// Derives the item slug: the last non-empty path segment of its URL
///
/// A trailing `.html`/`.htm`/`.php` extension is dropped.
pub fn slug_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;

    let slug = [".html", ".htm", ".php"]
        .iter()
        .find_map(|ext| segment.strip_suffix(ext))
        .unwrap_or(segment);

    (!slug.is_empty()).then(|| slug.to_string())
}

fn extract_title(document: &Html) -> Option<String> {
    select_text(document, "h1").or_else(|| meta_content(document, r#"meta[property="og:title"]"#))
}

fn extract_price(document: &Html) -> Option<i64> {
    let selector = Selector::parse("[data-price]").ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("data-price"))
        .find_map(parse_price)
        .or_else(|| {
            meta_content(document, r#"meta[itemprop="price"]"#).and_then(|raw| parse_price(&raw))
        })
}

/// Reads an integer price, ignoring thousands separators and any fraction
fn parse_price(raw: &str) -> Option<i64> {
    let whole = raw.split(['.', ',']).next()?;
    let digits: String = whole.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn extract_currency(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[itemprop="priceCurrency"]"#)
        .map(|code| code.trim().to_uppercase())
        .filter(|code| code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()))
}

fn extract_category(document: &Html) -> Option<TourCategory> {
    let selector = Selector::parse(".tour-tags a, .tour-tag").ok()?;
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .find_map(|tag| category_for_tag(&tag))
}

fn extract_description(document: &Html) -> Option<String> {
    select_text(document, r#"[itemprop="description"]"#)
        .or_else(|| select_text(document, ".tour-description"))
}

/// Splits every capture of `pattern` into location names
fn collect_locations(pattern: &Regex, html: &str) -> Vec<String> {
    let mut locations: Vec<String> = Vec::new();

    for caps in pattern.captures_iter(html) {
        let Some(raw) = caps.get(1) else { continue };
        let text = decode_text(raw.as_str());

        for name in text.split([',', ';', '/']) {
            let name = clean_text(name.trim().trim_end_matches('.'));
            if !name.is_empty() && !locations.contains(&name) {
                locations.push(name);
            }
        }
    }

    locations
}

/// Text of the first element matching `css`, whitespace-collapsed
fn select_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .find(|text| !text.is_empty())
}

/// `content` attribute of the first matching meta tag
fn meta_content(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|text| !text.is_empty())
}

/// Decodes HTML entities in a raw markup snippet
fn decode_text(raw: &str) -> String {
    Html::parse_fragment(raw)
        .root_element()
        .text()
        .collect::<String>()
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const URL: &str = "https://tours.example.ru/tours/kislovodsk-7-days/";

    fn extractor() -> ItemExtractor {
        ItemExtractor::new(DateRangeParser::with_reference_year(2026).unwrap(), "RUB").unwrap()
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    const FULL_PAGE: &str = r#"
        <html><head>
          <meta name="description" content="Тур по Кавминводам">
          <meta itemprop="priceCurrency" content="rub">
        </head><body>
          <h1>  Кисловодск и Домбай: 8 дней  </h1>
          <div class="tour-tags"><a href="/t/1">Новинка</a><a href="/t/2">Туры выходного дня</a></div>
          <div class="price" data-price="45 000">45 000 ₽</div>
          <p>Проживание: Кисловодск, Домбай; Кисловодск</p>
          <div itemprop="description">Горы,   нарзан
             и канатные дороги.</div>
          <h3>Ближайшие даты</h3>
          <ul class="dates">
            <li>16-22 марта 2026</li>
            <li>26 мая&nbsp;&mdash; 1 июня 2026</li>
            <li>скоро</li>
            <li>16-22 марта 2026</li>
          </ul>
        </body></html>"#;

    #[test]
    fn test_extract_full_page() {
        let item = extractor().extract(FULL_PAGE, URL).unwrap();

        assert_eq!(item.slug, "kislovodsk-7-days");
        assert_eq!(item.name, "Кисловодск и Домбай: 8 дней");
        assert_eq!(item.price, 45000);
        assert_eq!(item.currency, "RUB");
        assert_eq!(item.category, TourCategory::Weekend);
        assert_eq!(item.duration_days, 8);
        assert_eq!(item.locations, vec!["Кисловодск", "Домбай"]);
        assert_eq!(
            item.schedules,
            vec![
                ScheduleRange::new(day(3, 16), day(3, 22)).unwrap(),
                ScheduleRange::new(day(5, 26), day(6, 1)).unwrap(),
            ]
        );
        assert_eq!(
            item.description.as_deref(),
            Some("Горы, нарзан и канатные дороги.")
        );
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let html = "<html><body><p>Проживание: Сочи</p></body></html>";
        let err = extractor().extract(html, URL).unwrap_err();
        assert!(matches!(err, ExtractError::MissingTitle { .. }));
    }

    #[test]
    fn test_og_title_fallback() {
        let html = r#"<html><head><meta property="og:title" content="Тур в Архыз"></head></html>"#;
        let item = extractor().extract(html, URL).unwrap();
        assert_eq!(item.name, "Тур в Архыз");
    }

    #[test]
    fn test_defaults_for_sparse_page() {
        let html = "<html><body><h1>Горный тур</h1></body></html>";
        let item = extractor().extract(html, URL).unwrap();

        assert_eq!(item.price, 0);
        assert_eq!(item.currency, "RUB");
        assert_eq!(item.category, TourCategory::Group);
        assert_eq!(item.duration_days, DEFAULT_DURATION_DAYS);
        assert_eq!(item.locations, vec![UNKNOWN_LOCATION]);
        assert!(item.schedules.is_empty());
        assert_eq!(item.description, None);
    }

    #[test]
    fn test_split_markup_lodging() {
        let html = r#"<html><body><h1>Тур</h1>
            <dl><dt>Проживание:</dt> <dd><span>Архыз</span></dd></dl>
            </body></html>"#;
        let item = extractor().extract(html, URL).unwrap();
        assert_eq!(item.locations, vec!["Архыз"]);
    }

    #[test]
    fn test_locations_from_meta_description() {
        let html = r#"<html><head>
            <meta name="description" content="Экскурсии в Пятигорске и Железноводске">
            </head><body><h1>Тур</h1></body></html>"#;
        let item = extractor().extract(html, URL).unwrap();
        assert_eq!(item.locations, vec!["Пятигорск", "Железноводск"]);
    }

    #[test]
    fn test_price_from_meta() {
        let html = r#"<html><head><meta itemprop="price" content="38500.00"></head>
            <body><h1>Тур</h1></body></html>"#;
        let item = extractor().extract(html, URL).unwrap();
        assert_eq!(item.price, 38500);
    }

    #[test]
    fn test_schedule_list_outside_section_is_ignored() {
        let html = r#"<html><body><h1>Тур</h1>
            <ul><li>1-7 мая 2026</li></ul>
            </body></html>"#;
        let item = extractor().extract(html, URL).unwrap();
        assert!(item.schedules.is_empty());
    }

    #[test]
    fn test_schedule_section_after_nav_link() {
        let html = r##"<html><body><h1>Тур</h1>
            <nav><a href="#program">Программа</a> <a href="#dates">Ближайшие даты</a></nav>
            <ol class="program">
              <li>День 1: заезд в Кисловодск</li>
              <li>День 2: Домбай</li>
            </ol>
            <h3 id="dates">Ближайшие даты</h3>
            <ul><li>16-22 марта 2026</li><li>5 апреля 2026</li></ul>
            </body></html>"##;
        let item = extractor().extract(html, URL).unwrap();
        assert_eq!(
            item.schedules,
            vec![
                ScheduleRange::new(day(3, 16), day(3, 22)).unwrap(),
                ScheduleRange::single(day(4, 5)),
            ]
        );
    }

    #[test]
    fn test_schedule_list_inside_sibling_wrapper() {
        let html = r#"<html><body><h1>Тур</h1>
            <div class="tab-title"><span>Ближайшие даты:</span></div>
            <div class="tab-body"><ul><li>с 28 мая по 3 июня 2026</li></ul></div>
            </body></html>"#;
        let item = extractor().extract(html, URL).unwrap();
        assert_eq!(
            item.schedules,
            vec![ScheduleRange::new(day(5, 28), day(6, 3)).unwrap()]
        );
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(slug_from_url(URL).as_deref(), Some("kislovodsk-7-days"));
        assert_eq!(
            slug_from_url("https://tours.example.ru/tours/elbrus.html?x=1").as_deref(),
            Some("elbrus")
        );
        assert_eq!(slug_from_url("https://tours.example.ru/"), None);
        assert_eq!(slug_from_url("not a url"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("45 000"), Some(45000));
        assert_eq!(parse_price("12 500,00"), Some(12500));
        assert_eq!(parse_price("по запросу"), None);
    }
}
