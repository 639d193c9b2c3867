// A loaded HTML page and the few queries scenarios need
// Lookups here never fail: "not found" is an empty result or false

use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;

static SCRIPT_STYLE: OnceLock<Regex> = OnceLock::new();
static TAG: OnceLock<Regex> = OnceLock::new();
static WHITESPACE: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
static ANCHOR: OnceLock<Regex> = OnceLock::new();
static CONTROL: OnceLock<Regex> = OnceLock::new();
static FORM: OnceLock<Regex> = OnceLock::new();
static FIELD: OnceLock<Regex> = OnceLock::new();
static ENTITY: OnceLock<Regex> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("static pattern compiles"))
}

#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn new(url: Url, status: u16, body: impl Into<String>) -> Self {
        Self {
            url,
            status,
            body: body.into(),
        }
    }

    /// Visible text: scripts and tags removed, entities decoded, whitespace collapsed
    pub fn text(&self) -> String {
        strip_tags(&self.body)
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }

    /// A `<button>` or submit `<input>` carrying every class in `classes`
    pub fn has_button(&self, classes: &str) -> bool {
        let wanted: Vec<&str> = classes.split_whitespace().collect();
        let control = pattern(&CONTROL, r"(?is)<(button|input)\b([^>]*)>");

        control.captures_iter(&self.body).any(|caps| {
            let attrs = &caps[2];
            if caps[1].eq_ignore_ascii_case("input")
                && !attribute(attrs, "type").is_some_and(|t| t.eq_ignore_ascii_case("submit"))
            {
                return false;
            }
            let class = attribute(attrs, "class").unwrap_or_default();
            let present: Vec<&str> = class.split_whitespace().collect();
            wanted.iter().all(|w| present.contains(w))
        })
    }

    /// Whether a form control named `name` exists
    pub fn has_field(&self, name: &str) -> bool {
        pattern(&FIELD, r"(?is)<(?:input|textarea|select)\b([^>]*)>")
            .captures_iter(&self.body)
            .any(|caps| attribute(&caps[1], "name").as_deref() == Some(name))
    }

    /// Hrefs of links whose text contains `text`, in document order
    pub fn links(&self, text: &str) -> Vec<String> {
        let anchor = pattern(&ANCHOR, r"(?is)<a\b([^>]*)>(.*?)</a>");

        anchor
            .captures_iter(&self.body)
            .filter(|caps| strip_tags(&caps[2]).contains(text))
            .filter_map(|caps| attribute(&caps[1], "href"))
            .collect()
    }

    /// Action of the first form; `None` when there is no form
    pub fn form_action(&self) -> Option<String> {
        self.first_form_attrs()
            .map(|attrs| attribute(&attrs, "action").unwrap_or_default())
    }

    /// Method of the first form, lowercase, HTML default "get"
    pub fn form_method(&self) -> String {
        self.first_form_attrs()
            .and_then(|attrs| attribute(&attrs, "method"))
            .map(|m| m.to_ascii_lowercase())
            .unwrap_or_else(|| "get".to_string())
    }

    fn first_form_attrs(&self) -> Option<String> {
        pattern(&FORM, r"(?is)<form\b([^>]*)>")
            .captures(&self.body)
            .map(|caps| caps[1].to_string())
    }
}

/// Value of attribute `name` in a tag's attribute string
fn attribute(attrs: &str, name: &str) -> Option<String> {
    let re = pattern(
        &ATTRIBUTE,
        r#"(?i)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
    );

    re.captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or(caps.get(3)).or(caps.get(4)))
        .map(|m| decode_entities(m.as_str()))
}

fn strip_tags(html: &str) -> String {
    let without_scripts = pattern(&SCRIPT_STYLE, r"(?is)<script\b.*?</script>|<style\b.*?</style>")
        .replace_all(html, " ");
    let without_tags = pattern(&TAG, r"(?s)<[^>]*>").replace_all(&without_scripts, " ");
    let decoded = decode_entities(&without_tags);
    pattern(&WHITESPACE, r"\s+")
        .replace_all(&decoded, " ")
        .trim()
        .to_string()
}

/// Decode the common named entities and numeric references in one pass.
/// Unknown or invalid references are kept as written.
fn decode_entities(text: &str) -> String {
    let entity = pattern(
        &ENTITY,
        r"&(?:#[xX]([0-9a-fA-F]{1,6})|#([0-9]{1,7})|(lt|gt|quot|apos|nbsp|amp));",
    );

    entity
        .replace_all(text, |caps: &regex::Captures| {
            let decoded = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match &caps[3] {
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => Some('&'),
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
