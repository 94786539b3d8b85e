use crate::engine::EngineError;
use std::fmt::Write;
use std::ops::Range;

///
/// Page
///
/// One resolved page window over a filtered collection.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page {
    pub number: usize,
    pub total: usize,
    pub range: Range<usize>,
}

/// Read the page number from the query. Absent or empty means page 1;
/// zero or anything non-numeric is rejected.
pub fn page_number(query: &[(String, String)], param: &str) -> Result<usize, EngineError> {
    let raw = query
        .iter()
        .find(|(key, _)| key == param)
        .map_or("", |(_, value)| value.as_str());

    if raw.is_empty() {
        return Ok(1);
    }
    match raw.parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number),
        _ => Err(EngineError::new(400, format!("Invalid page '{raw}'"))),
    }
}

/// Compute the page window. An empty collection still has one page.
pub fn paginate(count: usize, per_page: usize, number: usize) -> Result<Page, EngineError> {
    let total = count.div_ceil(per_page).max(1);
    if number > total {
        return Err(EngineError::new(
            404,
            format!("Page '{number}' is out of range"),
        ));
    }

    let start = (number - 1) * per_page;
    let end = (start + per_page).min(count);

    Ok(Page {
        number,
        total,
        range: start..end,
    })
}

/// RFC 5988 `Link` header for a page window, or `None` when everything
/// fits on one page.
pub fn link_header(
    path: &str,
    query: &[(String, String)],
    param: &str,
    page: &Page,
) -> Option<String> {
    if page.total <= 1 {
        return None;
    }

    let mut relations = Vec::with_capacity(4);
    if page.number > 1 {
        relations.push((page.number - 1, "prev"));
    }
    if page.number < page.total {
        relations.push((page.number + 1, "next"));
    }
    relations.push((1, "first"));
    relations.push((page.total, "last"));

    let links: Vec<String> = relations
        .into_iter()
        .map(|(number, rel)| {
            format!("<{}>; rel=\"{rel}\"", page_url(path, query, param, number))
        })
        .collect();

    Some(links.join(", "))
}

/// The request URL with the page parameter swapped for `number`, every
/// other query pair preserved.
fn page_url(path: &str, query: &[(String, String)], param: &str, number: usize) -> String {
    let mut url = String::from(path);
    url.push('?');

    for (key, value) in query {
        if key == param {
            continue;
        }
        let _ = write!(url, "{}={}&", percent_encode(key), percent_encode(value));
    }
    let _ = write!(url, "{}={number}", percent_encode(param));

    url
}

/// Percent-encode everything outside the URL-unreserved set.
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
