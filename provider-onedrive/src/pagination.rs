//! Lazy children listing
//!
//! [`ChildPager`] walks one folder page by page, fetching the next page only
//! once the buffered one is drained. [`ContentListing`] turns pagers into
//! [`FileAttributes`] and, when recursive, keeps a stack of them so folders
//! are expanded depth-first: a folder is yielded, then its descendants, then
//! its remaining siblings.

use std::collections::VecDeque;

use bridge_traits::http::HttpMethod;
use bridge_traits::storage::FileAttributes;
use futures::stream::{self, Stream};
use tracing::{debug, instrument};

use crate::endpoint::{self, Action};
use crate::error::Result;
use crate::metadata::MetadataNormalizer;
use crate::transport::{api_error, decode, Transport};
use crate::types::{ChildrenPage, DriveItem};

/// Page-by-page iterator over one folder's children
///
/// Not restartable: once drained, build a new pager to list again.
pub struct ChildPager {
    transport: Transport,
    next: Option<String>,
    buffer: VecDeque<DriveItem>,
    pages_fetched: usize,
}

impl ChildPager {
    pub(crate) fn new(transport: Transport, locator: String) -> Self {
        Self {
            transport,
            next: Some(locator),
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next child, fetching another page when the buffer runs dry.
    ///
    /// A 404 on the first page ends the sequence without error.
    pub async fn next_item(&mut self) -> Result<Option<DriveItem>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            let Some(locator) = self.next.take() else {
                return Ok(None);
            };

            self.transport.ensure_active()?;
            let response = self
                .transport
                .send(self.transport.request(HttpMethod::Get, locator))
                .await?;

            if response.status == 404 && self.pages_fetched == 0 {
                debug!("Folder vanished before listing; treating as empty");
                return Ok(None);
            }
            if !response.is_success() {
                return Err(api_error(&response));
            }

            let page: ChildrenPage = decode(&response)?;
            self.pages_fetched += 1;
            debug!(
                page = self.pages_fetched,
                items = page.value.len(),
                more = page.next_link.is_some(),
                "Fetched children page"
            );

            self.buffer.extend(page.value);
            self.next = page.next_link;
        }
    }
}

struct Frame {
    directory: String,
    pager: ChildPager,
}

/// Normalised, optionally recursive folder listing
pub struct ContentListing {
    transport: Transport,
    normalizer: MetadataNormalizer,
    recursive: bool,
    stack: Vec<Frame>,
}

impl ContentListing {
    pub(crate) fn new(
        transport: Transport,
        normalizer: MetadataNormalizer,
        directory: &str,
        recursive: bool,
    ) -> Result<Self> {
        let mut listing = Self {
            transport,
            normalizer,
            recursive,
            stack: Vec::new(),
        };
        listing.push(directory)?;
        Ok(listing)
    }

    fn push(&mut self, directory: &str) -> Result<()> {
        let locator = endpoint::build(directory, Action::Named("children"), &[])?;
        self.stack.push(Frame {
            directory: directory.to_string(),
            pager: ChildPager::new(self.transport.clone(), locator),
        });
        Ok(())
    }

    /// Pending folders, including the one currently being read
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[instrument(skip(self), fields(depth = self.stack.len()))]
    pub async fn next(&mut self) -> Result<Option<FileAttributes>> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };

            let Some(item) = frame.pager.next_item().await? else {
                self.stack.pop();
                continue;
            };

            let path = format!(
                "{}/{}",
                frame.directory.trim_end_matches(['/', '\\']),
                item.name
            );
            let attributes = self.normalizer.normalize(&item, &path)?;

            if self.recursive && attributes.is_dir() {
                self.push(&attributes.path)?;
            }

            return Ok(Some(attributes));
        }
    }

    /// Drain the listing into a vector.
    pub async fn collect_all(mut self) -> Result<Vec<FileAttributes>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Adapt the listing into a `Stream`; pages are still fetched on demand.
    pub fn into_stream(self) -> impl Stream<Item = Result<FileAttributes>> + Send {
        stream::try_unfold(self, |mut listing| async move {
            Ok(listing.next().await?.map(|entry| (entry, listing)))
        })
    }
}
