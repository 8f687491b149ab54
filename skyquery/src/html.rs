//! Minimal HTML extraction for the handful of page structures we read.
//!
//! These are tag-level regex scans, good enough for server generated pages
//! such as the MAST tile list, the BSWT `<pre>` listing and the ETC results
//! table. They do not handle nested tables.

use once_cell::sync::Lazy;
use regex::Regex;

static INPUT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("valid input tag regex"));
static ANCHOR_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("valid anchor regex"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});
static PRE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre>").expect("valid pre regex"));
static TABLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b([^>]*)>(.*?)</table>").expect("valid table regex"));
static ROW_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("valid row regex"));
static CELL_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]>").expect("valid cell regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Replace the common named and numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, end + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Attributes of a single tag body, names lower-cased, values decoded.
pub fn attributes(tag_body: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag_body)
        .map(|cap| {
            let name = cap[1].to_ascii_lowercase();
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// Text content with tags removed and entities decoded.
pub fn text_content(fragment: &str) -> String {
    decode_entities(&ANY_TAG.replace_all(fragment, ""))
}

/// All `<input type="hidden">` fields as (name, value), in page order.
pub fn hidden_inputs(html: &str) -> Vec<(String, String)> {
    INPUT_TAG
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = attributes(&cap[1]);
            let is_hidden = attribute(&attrs, "type")
                .map(|t| t.eq_ignore_ascii_case("hidden"))
                .unwrap_or(false);
            if !is_hidden {
                return None;
            }
            let name = attribute(&attrs, "name")?.to_string();
            let value = attribute(&attrs, "value").unwrap_or("").to_string();
            Some((name, value))
        })
        .collect()
}

/// `href` of the anchor with the given `id`.
pub fn href_by_id(html: &str, id: &str) -> Option<String> {
    ANCHOR_TAG.captures_iter(html).find_map(|cap| {
        let attrs = attributes(&cap[1]);
        if attribute(&attrs, "id") == Some(id) {
            attribute(&attrs, "href").map(str::to_string)
        } else {
            None
        }
    })
}

/// Every anchor `href` in page order.
pub fn hrefs(html: &str) -> Vec<String> {
    ANCHOR_TAG
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = attributes(&cap[1]);
            attribute(&attrs, "href").map(str::to_string)
        })
        .collect()
}

/// Text of the first `<pre>` block.
pub fn first_pre(html: &str) -> Option<String> {
    PRE_BLOCK.captures(html).map(|cap| text_content(&cap[1]))
}

/// Cell texts of each row of the table with the given `id`.
pub fn table_rows_by_id(html: &str, id: &str) -> Option<Vec<Vec<String>>> {
    let body = TABLE_BLOCK.captures_iter(html).find_map(|cap| {
        let attrs = attributes(&cap[1]);
        if attribute(&attrs, "id") == Some(id) {
            cap.get(2).map(|m| m.as_str().to_string())
        } else {
            None
        }
    })?;

    let rows = ROW_BLOCK
        .captures_iter(&body)
        .map(|row| {
            CELL_BLOCK
                .captures_iter(&row[1])
                .map(|cell| text_content(&cell[1]).trim().to_string())
                .collect::<Vec<String>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();
    Some(rows)
}
