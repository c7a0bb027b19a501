//! Purpose: Pull widget inputs out of a page URL the way a browser would see them.
//! Exports: `WidgetParams`, `DataParam`, `DATA_B64_PARAM`, `DATA_PARAM`, `CONFIG_PARAM`, `DEBUG_PARAM`.
//! Role: Adapter between raw URLs and the codec's raw-input strings.
//! Invariants: Query values are form-decoded (`+` becomes space), matching `URLSearchParams`.
//! Invariants: `data_b64` always wins over `data` when both are present.

use url::Url;

use crate::core::error::{Error, ErrorKind};

pub const DATA_B64_PARAM: &str = "data_b64";
pub const DATA_PARAM: &str = "data";
pub const CONFIG_PARAM: &str = "config";
pub const DEBUG_PARAM: &str = "debug";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WidgetParams {
    pub data_b64: Option<String>,
    pub data: Option<String>,
    pub config: Option<String>,
    pub debug: bool,
}

/// Where the widget's payload comes from, once the URL has been read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataParam<'a> {
    Token { param: &'static str, raw: &'a str },
    Remote(Url),
    Absent,
}

impl WidgetParams {
    /// Parse a full URL (`https://host/widgets/flashcards?data_b64=...`).
    pub fn from_url(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid widget url")
                .with_hint("Pass an absolute URL such as https://host/widgets/flashcards?data_b64=...")
                .with_source(err)
        })?;
        Ok(Self::from_query(url.query().unwrap_or("")))
    }

    /// Parse a query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            // First occurrence wins, like URLSearchParams.get().
            match &*key {
                DATA_B64_PARAM if params.data_b64.is_none() => {
                    params.data_b64 = Some(value.into_owned())
                }
                DATA_PARAM if params.data.is_none() => params.data = Some(value.into_owned()),
                CONFIG_PARAM if params.config.is_none() => {
                    params.config = Some(value.into_owned())
                }
                DEBUG_PARAM => params.debug = value == "1",
                _ => {}
            }
        }
        params
    }

    /// Preferred raw token and the parameter it came from. Empty values count as absent.
    pub fn raw_data(&self) -> Option<(&'static str, &str)> {
        non_empty(&self.data_b64)
            .map(|raw| (DATA_B64_PARAM, raw))
            .or_else(|| non_empty(&self.data).map(|raw| (DATA_PARAM, raw)))
    }

    pub fn data_param(&self) -> DataParam<'_> {
        match self.raw_data() {
            Some((DATA_PARAM, raw)) if is_remote_ref(raw) => match Url::parse(raw) {
                Ok(url) => DataParam::Remote(url),
                Err(_) => DataParam::Token {
                    param: DATA_PARAM,
                    raw,
                },
            },
            Some((param, raw)) => DataParam::Token { param, raw },
            None => DataParam::Absent,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|raw| !raw.is_empty())
}

fn is_remote_ref(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}
