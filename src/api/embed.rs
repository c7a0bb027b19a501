//! Purpose: Build widget links and iframe embed markup around an encoded payload.
//! Exports: `EmbedLink`, `build_embed`, `widget_url`, `iframe_snippet`.
//! Role: Producer-side helper for pages and LMS authors that embed widgets.
//! Invariants: Links always carry the payload in `data_b64`, never in legacy `data`.
//! Invariants: Reading the link back with `WidgetParams` yields the exact token.

use serde::Serialize;
use url::Url;

use crate::api::params::DATA_B64_PARAM;
use crate::core::Codec;
use crate::core::error::{Error, ErrorKind};

const IFRAME_HEIGHT: u32 = 600;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmbedLink {
    pub token: String,
    pub url: Url,
    pub iframe: String,
}

pub fn build_embed<T>(codec: &Codec, origin: &str, widget: &str, payload: &T) -> Result<EmbedLink, Error>
where
    T: Serialize + ?Sized,
{
    let token = codec.encode(payload)?;
    let url = widget_url(origin, widget, &token)?;
    let iframe = iframe_snippet(&url, widget);
    Ok(EmbedLink { token, url, iframe })
}

/// `{origin}/widgets/{widget}?data_b64={token}`; any path or query on `origin` is replaced.
pub fn widget_url(origin: &str, widget: &str, token: &str) -> Result<Url, Error> {
    if widget.is_empty() || widget.contains(['/', '?', '#']) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("widget type must be a single path segment")
            .with_hint("Use an id such as `flashcards`."));
    }
    let mut url = Url::parse(origin).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid origin")
            .with_hint("Pass an absolute origin such as https://widgets.example.")
            .with_source(err)
    })?;
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage).with_message("origin cannot carry a path"));
    }
    url.set_path(&format!("/widgets/{widget}"));
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair(DATA_B64_PARAM, token);
    Ok(url)
}

pub fn iframe_snippet(url: &Url, widget: &str) -> String {
    format!(
        "<iframe\n  src=\"{}\"\n  width=\"100%\"\n  height=\"{IFRAME_HEIGHT}\"\n  frameborder=\"0\"\n  title=\"{} widget\"\n></iframe>",
        escape_attr(url.as_str()),
        escape_attr(widget)
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}
