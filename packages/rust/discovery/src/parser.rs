//! GitHub trending page parser.
//!
//! The page lists one repository per `<article class="Box-row">`:
//! - `h2 a[href="/owner/name"]`: identifier
//! - `p`: description
//! - `[itemprop="programmingLanguage"]`: language
//! - `a[href$="/stargazers"]`, `a[href$="/forks"]`: totals
//! - `span.float-sm-right`: "1,234 stars today"

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use trendbrief_shared::{CandidateRecord, Result, TrendBriefError};

use crate::parse_count;

// ---------------------------------------------------------------------------
// Selectors (compiled once)
// ---------------------------------------------------------------------------

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.Box-row").expect("row selector"));

static NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2 a[href]").expect("name selector"));

static DESC_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("description selector"));

static LANG_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop="programmingLanguage"]"#).expect("language selector")
});

static STARS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href$="/stargazers"]"#).expect("stars selector"));

static FORKS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href$="/forks"]"#).expect("forks selector"));

static TODAY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.float-sm-right").expect("stars-today selector"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a trending page into candidates, in page order.
///
/// Rows without a usable `owner/name` link are skipped. A page with no rows at
/// all is an error, since it usually means the markup changed.
pub fn parse_trending_page(html: &str) -> Result<Vec<CandidateRecord>> {
    let doc = Html::parse_document(html);
    let mut records = Vec::new();
    let mut rows = 0usize;

    for row in doc.select(&ROW_SEL) {
        rows += 1;
        if let Some(record) = parse_row(row) {
            records.push(record);
        }
    }

    if rows == 0 {
        return Err(TrendBriefError::parse(
            "trending page contained no repository rows",
        ));
    }

    Ok(records)
}

fn parse_row(row: ElementRef<'_>) -> Option<CandidateRecord> {
    let href = row.select(&NAME_SEL).next()?.value().attr("href")?;
    let name = href.trim().trim_matches('/');
    let mut record = CandidateRecord::new(name);
    record.owner_and_repo()?;

    if let Some(desc) = row.select(&DESC_SEL).next().map(text_of).filter(|d| !d.is_empty()) {
        record.description = desc;
    }
    if let Some(lang) = row.select(&LANG_SEL).next().map(text_of).filter(|l| !l.is_empty()) {
        record.language = lang;
    }

    record.stars = row
        .select(&STARS_SEL)
        .next()
        .and_then(|el| parse_count(&text_of(el)))
        .unwrap_or(0);
    record.forks = row
        .select(&FORKS_SEL)
        .next()
        .and_then(|el| parse_count(&text_of(el)))
        .unwrap_or(0);
    record.stars_today = row.select(&TODAY_SEL).next().and_then(|el| {
        let text = text_of(el);
        text.split_whitespace().next().and_then(parse_count)
    });

    Some(record)
}

/// Collapse an element's text to single-spaced, trimmed form.
fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRENDING_HTML: &str = r#"
<html><body><main>
<article class="Box-row">
  <h2 class="h3 lh-condensed">
    <a href="/astral-sh/uv" class="Link">
      <span class="text-normal">astral-sh /</span> uv
    </a>
  </h2>
  <p class="col-9 color-fg-muted my-1 pr-4">
    An extremely fast Python package and project manager, written in Rust.
  </p>
  <div class="f6 color-fg-muted mt-2">
    <span class="d-inline-block ml-0 mr-3">
      <span itemprop="programmingLanguage">Rust</span>
    </span>
    <a class="Link Link--muted d-inline-block mr-3" href="/astral-sh/uv/stargazers">
      <svg></svg> 61,234
    </a>
    <a class="Link Link--muted d-inline-block mr-3" href="/astral-sh/uv/forks">
      <svg></svg> 1,789
    </a>
    <span class="d-inline-block float-sm-right">
      <svg></svg> 412 stars today
    </span>
  </div>
</article>
<article class="Box-row">
  <h2><a href="/someone/dotfiles">someone / dotfiles</a></h2>
  <div>
    <a href="/someone/dotfiles/stargazers">88</a>
  </div>
</article>
<article class="Box-row">
  <h2><a href="/sponsors">broken</a></h2>
</article>
</main></body></html>
"#;

    #[test]
    fn parses_full_row() {
        let records = parse_trending_page(TRENDING_HTML).expect("parse");
        assert_eq!(records.len(), 2);

        let uv = &records[0];
        assert_eq!(uv.name, "astral-sh/uv");
        assert_eq!(uv.author, "astral-sh");
        assert_eq!(uv.language, "Rust");
        assert_eq!(uv.stars, 61_234);
        assert_eq!(uv.forks, 1_789);
        assert_eq!(uv.stars_today, Some(412));
        assert!(uv.description.starts_with("An extremely fast Python"));
        assert_eq!(uv.url, "https://github.com/astral-sh/uv");
    }

    #[test]
    fn sparse_row_keeps_defaults() {
        let records = parse_trending_page(TRENDING_HTML).expect("parse");
        let dotfiles = &records[1];
        assert_eq!(dotfiles.name, "someone/dotfiles");
        assert_eq!(dotfiles.description, trendbrief_shared::DEFAULT_DESCRIPTION);
        assert!(!dotfiles.has_language());
        assert_eq!(dotfiles.stars, 88);
        assert_eq!(dotfiles.forks, 0);
        assert_eq!(dotfiles.stars_today, None);
    }

    #[test]
    fn page_without_rows_is_an_error() {
        let err = parse_trending_page("<html><body>rate limited</body></html>").unwrap_err();
        assert!(err.to_string().contains("no repository rows"));
    }
}
