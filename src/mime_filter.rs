use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    dispatch::DispatchFilter,
    error::{Result, TagError},
};

/// The mime types foreground dispatch should match, replaced as a whole
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeFilterRegistry {
    filters: BTreeSet<String>,
}

impl MimeFilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every filter, returns whether the set changed
    ///
    /// One bad entry rejects the whole call and leaves the current set in place
    pub fn set<I, S>(&mut self, mime_types: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filters = mime_types
            .into_iter()
            .map(|mime_type| normalize_mime_type(mime_type.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;

        if filters == self.filters {
            return Ok(false);
        }

        debug!("mime filters now {filters:?}");
        self.filters = filters;
        Ok(true)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.filters.iter().cloned().collect()
    }

    /// Filters to hand the platform, any ndef tag when nothing is registered
    pub fn dispatch_filters(&self) -> Vec<DispatchFilter> {
        if self.filters.is_empty() {
            return vec![DispatchFilter::AnyNdef];
        }

        self.filters
            .iter()
            .map(|mime_type| DispatchFilter::MimeType { mime_type: mime_type.clone() })
            .collect()
    }
}

/// Lower cases and drops parameters, `Text/Plain; charset=utf-8` becomes `text/plain`
pub fn normalize_mime_type(raw: &str) -> Result<String> {
    let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

    match essence.split_once('/') {
        Some((type_, subtype))
            if is_token(type_) && is_token(subtype) && !(type_ == "*" && subtype != "*") =>
        {
            Ok(essence)
        }
        _ => Err(TagError::InvalidInput(format!("not a mime type: {raw:?}"))),
    }
}

fn is_token(part: &str) -> bool {
    !part.is_empty()
        && part
            .bytes()
            .all(|byte| byte.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&byte))
}
