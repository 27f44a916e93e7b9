//! Group header records into global (wildcard) and local (single page)
//! headers, merging global records that share a web path.

use crate::extract::HeaderRecord;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitHeaders {
    pub global_headers: Vec<HeaderRecord>,
    pub local_headers: Vec<HeaderRecord>,
}

impl SplitHeaders {
    /// Fold one record in. Must be called in input order.
    pub fn push(&mut self, header: HeaderRecord) {
        if !header.is_global {
            self.local_headers.push(header);
            return;
        }

        match self
            .global_headers
            .iter_mut()
            .find(|existing| existing.web_path == header.web_path)
        {
            Some(existing) => existing.csp = existing.csp.concat(&header.csp),
            None => self.global_headers.push(header),
        }
    }

    /// Globals first, then locals, each in first-seen order.
    pub fn into_ordered(self) -> Vec<HeaderRecord> {
        let mut all = self.global_headers;
        all.extend(self.local_headers);
        all
    }
}

pub fn split_to_global_and_local<I>(headers: I) -> SplitHeaders
where
    I: IntoIterator<Item = HeaderRecord>,
{
    headers
        .into_iter()
        .fold(SplitHeaders::default(), |mut split, header| {
            split.push(header);
            split
        })
}
